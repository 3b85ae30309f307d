#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]

//! Scores a cadnano design for 7-mers that risk scaffold misfolding.
mod cli;

use log::info;
use scafcheck::design::Project;
use scafcheck::error::Error;
use scafcheck::{Result, ScoreReport, Scorer};
use structopt::StructOpt;

fn main() -> Result<()> {
    let opt = cli::ScafCheck::from_args();
    opt.set_logging();

    rayon::ThreadPoolBuilder::new()
        .num_threads(opt.threads)
        .build_global()
        .map_err(|_| Error::ThreadError)?;

    let project = Project::load(&opt.design, &opt.sequence)?;
    let scaffold = project.scaffold()?;
    let staples = project.staples()?;
    info!(
        "Scoring scaffold of {} bases against {} staples",
        scaffold.len(),
        staples.len()
    );

    let scorer = Scorer::new(&scaffold, &staples);
    let report = scorer.report();
    print_results(&report, opt.json)?;

    if opt.sites {
        for site in scorer.sites() {
            println!("{}", site);
        }
    }

    Ok(())
}

fn print_results(report: &ScoreReport, json: bool) -> Result<()> {
    for (key, value) in report.iter() {
        info!("Score {} {}", key.description(), value);
    }
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
