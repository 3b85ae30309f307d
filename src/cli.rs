use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "scafcheck",
    about = "Counts 7-mers of a cadnano design that could bind outside their designed location"
)]
pub(crate) struct ScafCheck {
    #[structopt(short, long, help = "cadnano design file", parse(from_os_str))]
    pub design: PathBuf,
    #[structopt(
        short,
        long,
        help = "Scaffold sequence file, plain text or FASTA (can be gzipped)",
        parse(from_os_str)
    )]
    pub sequence: PathBuf,
    #[structopt(
        short,
        long,
        help = "Number of threads used for indexing staples",
        default_value = "1"
    )]
    pub threads: usize,
    #[structopt(long, help = "Print the score report as JSON")]
    pub json: bool,
    #[structopt(
        long,
        help = "Also print every implicated 7-mer with its category and locations"
    )]
    pub sites: bool,
    #[structopt(
        short,
        long,
        parse(from_occurrences),
        help = "Determines verbosity of the processing, can be specified multiple times -vvv"
    )]
    pub verbosity: u8,
}

impl ScafCheck {
    pub fn set_logging(&self) {
        let level = match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    }
}
