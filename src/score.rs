use crate::sequence::{canonical, Orientation, Sequence};
use crate::{Result, KMER_SIZE};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Strand a kmer occurrence was taken from
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum StrandId {
    Scaffold,
    Staple(usize),
}

impl fmt::Display for StrandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrandId::Scaffold => write!(f, "scaffold"),
            StrandId::Staple(i) => write!(f, "staple_{}", i),
        }
    }
}

/// Location of a kmer on a strand. The orientation tells if the strand reads the canonical key
/// or its reverse complement at `offset`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Occurrence {
    pub strand: StrandId,
    pub offset: usize,
    pub orientation: Orientation,
}

/// Occurrences of every canonical kmer across the scaffold and staples
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct KmerIndex {
    k: usize,
    occurrences: HashMap<Vec<u8>, Vec<Occurrence>>,
}

impl KmerIndex {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            occurrences: HashMap::new(),
        }
    }

    /// Indexes the scaffold and all staples. Staples are split across the rayon pool into
    /// partial indices which are merged by canonical key, so the result does not depend on the
    /// number of threads.
    pub fn build(scaffold: &Sequence, staples: &[Sequence], k: usize) -> Self {
        let mut index = staples
            .par_iter()
            .enumerate()
            .fold(
                || KmerIndex::new(k),
                |mut index, (i, staple)| {
                    index.add_strand(StrandId::Staple(i), staple);
                    index
                },
            )
            .reduce(|| KmerIndex::new(k), KmerIndex::merge);

        index.add_strand(StrandId::Scaffold, scaffold);
        index
            .occurrences
            .values_mut()
            .for_each(|occurrences| occurrences.sort_unstable());

        debug!(
            "Indexed {} distinct canonical {}-mers from the scaffold and {} staples",
            index.len(),
            k,
            staples.len()
        );
        index
    }

    pub fn add_strand(&mut self, strand: StrandId, seq: &Sequence) {
        for (offset, kmer) in seq.kmers(self.k) {
            let (key, orientation) = canonical(kmer);
            self.occurrences.entry(key).or_default().push(Occurrence {
                strand,
                offset,
                orientation,
            });
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        for (key, occurrences) in other.occurrences {
            self.occurrences
                .entry(key)
                .or_default()
                .extend(occurrences);
        }
        self
    }

    pub fn get(&self, kmer: &[u8]) -> Option<&[Occurrence]> {
        self.occurrences.get(&canonical(kmer).0).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}

/// A repeat inside the scaffold is the same kmer value read in one orientation at two or more
/// scaffold offsets. Meeting only its own reverse complement once does not qualify.
fn is_scaffold_repeat(occurrences: &[Occurrence]) -> bool {
    [Orientation::FWD, Orientation::REV].iter().any(|orientation| {
        occurrences
            .iter()
            .filter(|occ| occ.strand == StrandId::Scaffold && occ.orientation == *orientation)
            .count()
            > 1
    })
}

/// A staple cross repeat is a canonical kmer present, in any orientation, on at least two
/// different staple indices.
fn is_staple_cross_repeat(occurrences: &[Occurrence]) -> bool {
    occurrences
        .iter()
        .filter_map(|occ| match occ.strand {
            StrandId::Staple(i) => Some(i),
            StrandId::Scaffold => None,
        })
        .collect::<HashSet<usize>>()
        .len()
        > 1
}

/// Category a risky kmer was found in
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RepeatKind {
    Scaffold,
    Staple,
    Both,
}

impl fmt::Display for RepeatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            RepeatKind::Scaffold => "scaffold",
            RepeatKind::Staple => "staple",
            RepeatKind::Both => "both",
        };
        write!(f, "{}", kind)
    }
}

/// A canonical kmer implicated in at least one score category
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RepeatSite<'a> {
    pub kmer: &'a [u8],
    pub kind: RepeatKind,
    pub occurrences: &'a [Occurrence],
}

impl fmt::Display for RepeatSite<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locations = self
            .occurrences
            .iter()
            .map(|occ| {
                let strand = match occ.orientation {
                    Orientation::FWD => '+',
                    Orientation::REV => '-',
                };
                format!("{}:{}{}", occ.strand, occ.offset, strand)
            })
            .collect::<Vec<String>>()
            .join(",");
        write!(
            f,
            "{}\t{}\t{}",
            String::from_utf8_lossy(self.kmer),
            self.kind,
            locations
        )
    }
}

/// Names of the score counters in their presentation order
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScoreKey {
    Scaffold,
    Staple,
    Both,
}

impl ScoreKey {
    /// All keys in fixed report order
    pub const ALL: [ScoreKey; 3] = [ScoreKey::Scaffold, ScoreKey::Staple, ScoreKey::Both];

    pub fn key(self) -> &'static str {
        match self {
            ScoreKey::Scaffold => "7_scaffold",
            ScoreKey::Staple => "7_staple",
            ScoreKey::Both => "7_both",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ScoreKey::Scaffold => "7mer Scaffold-Staple",
            ScoreKey::Staple => "7mer Staple-Scaffold",
            ScoreKey::Both => "7mer Scaffold-Staple and Staple-Scaffold",
        }
    }
}

/// Number of distinct canonical kmers found in each category
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct ScoreReport {
    #[serde(rename = "7_scaffold")]
    scaffold: usize,
    #[serde(rename = "7_staple")]
    staple: usize,
    #[serde(rename = "7_both")]
    both: usize,
}

impl ScoreReport {
    pub fn get(&self, key: ScoreKey) -> usize {
        match key {
            ScoreKey::Scaffold => self.scaffold,
            ScoreKey::Staple => self.staple,
            ScoreKey::Both => self.both,
        }
    }

    /// Counters in fixed `7_scaffold`, `7_staple`, `7_both` order
    pub fn iter(&self) -> impl Iterator<Item = (ScoreKey, usize)> + '_ {
        ScoreKey::ALL.iter().map(move |key| (*key, self.get(*key)))
    }
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            writeln!(f, "Score {}: {}", key.key(), value)?;
        }
        Ok(())
    }
}

/// Classifies every indexed kmer of a design
#[derive(Debug)]
pub struct Scorer {
    index: KmerIndex,
}

impl Scorer {
    pub fn new(scaffold: &Sequence, staples: &[Sequence]) -> Self {
        Self {
            index: KmerIndex::build(scaffold, staples, KMER_SIZE),
        }
    }

    pub fn index(&self) -> &KmerIndex {
        &self.index
    }

    /// Returns all implicated kmers sorted by canonical key
    pub fn sites(&self) -> Vec<RepeatSite<'_>> {
        let mut sites = self
            .index
            .occurrences
            .iter()
            .filter_map(|(kmer, occurrences)| {
                let kind = match (
                    is_scaffold_repeat(occurrences),
                    is_staple_cross_repeat(occurrences),
                ) {
                    (true, true) => RepeatKind::Both,
                    (true, false) => RepeatKind::Scaffold,
                    (false, true) => RepeatKind::Staple,
                    (false, false) => return None,
                };
                Some(RepeatSite {
                    kmer: kmer.as_slice(),
                    kind,
                    occurrences: occurrences.as_slice(),
                })
            })
            .collect::<Vec<RepeatSite<'_>>>();
        sites.sort_by(|a, b| a.kmer.cmp(b.kmer));
        sites
    }

    pub fn report(&self) -> ScoreReport {
        self.sites()
            .iter()
            .fold(ScoreReport::default(), |mut report, site| {
                match site.kind {
                    RepeatKind::Scaffold => report.scaffold += 1,
                    RepeatKind::Staple => report.staple += 1,
                    RepeatKind::Both => {
                        report.scaffold += 1;
                        report.staple += 1;
                        report.both += 1;
                    }
                }
                report
            })
    }
}

/// Scores the scaffold against the staples
pub fn score(scaffold: &Sequence, staples: &[Sequence]) -> ScoreReport {
    let report = Scorer::new(scaffold, staples).report();
    info!(
        "Scored scaffold of {} bases against {} staples",
        scaffold.len(),
        staples.len()
    );
    report
}

/// Validates raw scaffold and staple strings before scoring them. A single invalid base in any
/// strand rejects the whole run.
pub fn score_check<S: AsRef<[u8]>>(scaffold: &str, staples: &[S]) -> Result<ScoreReport> {
    let scaffold = Sequence::new("scaffold", scaffold)?;
    let staples = staples
        .iter()
        .enumerate()
        .map(|(i, staple)| Sequence::new(format!("staple_{}", i), staple))
        .collect::<Result<Vec<Sequence>>>()?;
    Ok(score(&scaffold, &staples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn seq(s: &str) -> Sequence {
        Sequence::new("test", s).unwrap()
    }

    fn staples(staples: &[&str]) -> Vec<Sequence> {
        staples.iter().map(|s| seq(s)).collect()
    }

    const SCAFFOLD: &str = "TTCCCTTCCTTTCTCGCCACGTTCGCCGGCTTTCCCCGTCAAGCTCTAAATCGGGGGCTCCCTTTAGGGTTCCGATTTAGTGCTTTACGGCACCTCGACCCCAAAAAACTTGATTTGGGTGATGGTTCACGTAGTGGGCCATCGCCCTGATAGACGGTTTTTCGCCCTTTGACGTTGGAGTCCACGTTCTTTAATAGTGGACTCTTGTTCCAAACTGGAACAACACTCAACCCTATCTCGGGCTATTCTTTTGATTTATAAGGGATTTTGCCGATTTCGGAACCACCATCAAACAGGATTTTCGCCTGCTGGGGCAAACCAGCGTGGACCGCTTGCTGCAACTCTCTCAGGGCCAGGCGGTGAAGGGCAATCAGCTGTTGCCCGTCTCACTGGTGAAAAGAAAAACCACCCTGGCGCCCAATACGCAAACCGCCTCTCCCCGCGCGTTGGCCGATTCATTAATGCAGCTGGCACGACAGGTTTCCCGACTGGAAAGCGGGCAGTGAGCGCAACGCAATTAATGTGAGTTAGCTCACTCATTAGGCACCCCAGGCTTTACACTTTATGCTTCCGGCTCGTATGTTGTGTGGAATTGTGAGCGGATAACAATTTCACACAGGAAACAGCTATGACCATGATTACGAATTCGAGCTCGGTACCCGGGGATCCTCTAGAGTCGACCTGCAGGCATGCAAGCTTGGCACTGGCCGTCGTTTTAC";

    #[test]
    fn complementary_staples() {
        let report = score(
            &seq("AAAAAAATTTTTTT"),
            &staples(&["AAAAAAA", "TTTTTTT"]),
        );
        assert_eq!(report.get(ScoreKey::Scaffold), 0);
        assert_eq!(report.get(ScoreKey::Staple), 1);
        assert_eq!(report.get(ScoreKey::Both), 0);
    }

    #[test]
    fn overlapping_scaffold_repeats() {
        let report = score(&seq("AAAAAAAAAAAAA"), &[]);
        assert_eq!(report.get(ScoreKey::Scaffold), 1);
        assert_eq!(report.get(ScoreKey::Staple), 0);
        assert_eq!(report.get(ScoreKey::Both), 0);
    }

    #[test]
    fn empty_staples() {
        let report = score(&seq(SCAFFOLD), &[]);
        assert_eq!(report.get(ScoreKey::Staple), 0);
        assert_eq!(report.get(ScoreKey::Both), 0);
        assert_eq!(
            report.get(ScoreKey::Scaffold),
            score(&seq(SCAFFOLD), &staples(&["ACGTACGTACGT"])).get(ScoreKey::Scaffold)
        );
    }

    #[test]
    fn deterministic() {
        let staples = staples(&[
            "GTAAAACGACGGCCAGTGCCAAGCTTGCATG",
            "CCTGCAGGTCGACTCTAGAGGATCCCC",
            "GGGTACCGAGCTCGAATTCGTAATCATGG",
            "CATGCAAGCTTGGCACTGGCC",
        ]);
        let first = score(&seq(SCAFFOLD), &staples);
        let second = score(&seq(SCAFFOLD), &staples);
        assert_eq!(first, second);
        assert_eq!(
            Scorer::new(&seq(SCAFFOLD), &staples).index(),
            Scorer::new(&seq(SCAFFOLD), &staples).index()
        );
    }

    #[test]
    fn thread_count_independent() {
        let staples = (0..64)
            .map(|i| {
                let start = (i * 11) % (SCAFFOLD.len() - 40);
                seq(&SCAFFOLD[start..start + 32])
            })
            .collect::<Vec<Sequence>>();
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| score(&seq(SCAFFOLD), &staples));
        let multi = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
            .install(|| score(&seq(SCAFFOLD), &staples));
        assert_eq!(single, multi);
        assert!(single.get(ScoreKey::Staple) > 0);
    }

    #[test]
    fn reverse_complemented_staple() {
        let scaffold = seq(SCAFFOLD);
        let mut staples = staples(&[
            "GTAAAACGACGGCCAGTGCCAAGCTTGCATG",
            "CCTGCAGGTCGACTCTAGAGGATCCCC",
            "CATGCAAGCTTGGCACTGGCC",
        ]);
        let before = Scorer::new(&scaffold, &staples);
        let before_sites = before
            .sites()
            .iter()
            .map(|site| (site.kmer.to_vec(), site.kind))
            .collect::<Vec<_>>();

        staples[0] = staples[0].reverse_complement();
        let after = Scorer::new(&scaffold, &staples);
        let after_sites = after
            .sites()
            .iter()
            .map(|site| (site.kmer.to_vec(), site.kind))
            .collect::<Vec<_>>();

        assert_eq!(before.report(), after.report());
        assert_eq!(before_sites, after_sites);
    }

    #[test]
    fn short_sequences() {
        let report = score(&seq("ACGTAC"), &staples(&["ACG", "T", "ACGTAC"]));
        assert_eq!(report, ScoreReport::default());
    }

    #[test]
    fn doubled_scaffold_not_decreasing() {
        let single = score(&seq(SCAFFOLD), &[]).get(ScoreKey::Scaffold);
        let doubled = score(&seq(&SCAFFOLD.repeat(2)), &[]).get(ScoreKey::Scaffold);
        assert!(doubled >= single);
        assert!(doubled > 0);
    }

    #[test]
    fn duplicate_staples_are_distinct() {
        let report = score(&seq("ACGTACGTAC"), &staples(&["GATTACAGG", "GATTACAGG"]));
        assert_eq!(report.get(ScoreKey::Staple), 3);
        let report = score(&seq("ACGTACGTAC"), &staples(&["GATTACAGG"]));
        assert_eq!(report.get(ScoreKey::Staple), 0);
    }

    #[test]
    fn both_categories() {
        // GATTACA repeated in the scaffold and shared by two staples in opposite orientations
        let report = score(
            &seq("GATTACACCCGATTACA"),
            &staples(&["GATTACAGG", "CCTGTAATC"]),
        );
        assert_eq!(report.get(ScoreKey::Scaffold), 1);
        assert_eq!(report.get(ScoreKey::Staple), 3);
        assert_eq!(report.get(ScoreKey::Both), 1);
    }

    #[test]
    fn invalid_base_rejects_run() {
        assert!(matches!(
            score_check("ACGTXACGTACGT", &["ACGTACG"]),
            Err(Error::InvalidBase { .. })
        ));
        assert!(matches!(
            score_check("ACGTACGTACGT", &["ACGTACG", "ACG-"]),
            Err(Error::InvalidBase { .. })
        ));
    }

    #[test]
    fn ambiguous_and_lowercase() {
        let upper = score_check("AAAAAAATTTTTTT", &["AAAAAAA", "TTTTTTT"]).unwrap();
        let lower = score_check("aaaaaaattttttt", &["aaaaaaa", "tNtttnt"]).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn report_order_and_format() {
        let report = score(&seq("AAAAAAAAAAAAA"), &staples(&["AAAAAAA", "TTTTTTT"]));
        let keys = report.iter().map(|(key, _)| key.key()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["7_scaffold", "7_staple", "7_both"]);
        assert_eq!(
            report.to_string(),
            "Score 7_scaffold: 1\nScore 7_staple: 1\nScore 7_both: 1\n"
        );
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"7_scaffold":1,"7_staple":1,"7_both":1}"#
        );
    }

    #[test]
    fn site_listing() {
        let scorer = Scorer::new(&seq("AAAAAAAAAAAAA"), &staples(&["AAAAAAA", "TTTTTTT"]));
        let sites = scorer.sites();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].kmer, b"AAAAAAA");
        assert_eq!(sites[0].kind, RepeatKind::Both);
        assert_eq!(sites[0].occurrences.len(), 9);
        assert_eq!(
            scorer.index().get(b"TTTTTTT").map(|occ| occ.len()),
            Some(9)
        );
        assert!(sites[0].to_string().starts_with("AAAAAAA\tboth\tscaffold:0+"));
    }
}
