use crate::{error::Error, Result};
use bio::alphabets::dna;
use std::fmt;

/// Base substituted for ambiguous `N` positions, e.g. staple bases without a scaffold partner
pub const AMBIGUOUS_SUBSTITUTE: u8 = b'T';

/// Whether an occurrence reads as its canonical key or as the reverse complement of it
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Orientation {
    FWD,
    REV,
}

/// Validated strand sequence over `A`, `C`, `G` and `T`, read 5' to 3'
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Sequence {
    name: String,
    seq: Vec<u8>,
}

impl Sequence {
    /// Upper-cases the input and replaces `N` with [`AMBIGUOUS_SUBSTITUTE`]. Any other character
    /// outside the nucleotide alphabet rejects the whole sequence.
    pub fn new<N: Into<String>, T: AsRef<[u8]>>(name: N, raw: T) -> Result<Self> {
        let name = name.into();
        let raw = raw.as_ref();
        if raw.is_empty() {
            return Err(Error::EmptySequence(name));
        }

        let seq = raw
            .iter()
            .enumerate()
            .map(|(position, nuc)| match nuc.to_ascii_uppercase() {
                nuc @ b'A' | nuc @ b'C' | nuc @ b'G' | nuc @ b'T' => Ok(nuc),
                b'N' => Ok(AMBIGUOUS_SUBSTITUTE),
                _ => Err(Error::InvalidBase {
                    strand: name.clone(),
                    position,
                    base: *nuc as char,
                }),
            })
            .collect::<Result<Vec<u8>>>()?;

        Ok(Self { name, seq })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.seq
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Returns the `(offset, kmer)` windows of the sequence, none if it is shorter than `k`
    pub fn kmers(&self, k: usize) -> impl Iterator<Item = (usize, &[u8])> + '_ {
        let windows = if k == 0 || self.seq.len() < k {
            self.seq[..0].windows(1)
        } else {
            self.seq.windows(k)
        };
        windows.enumerate()
    }

    /// The opposite, antiparallel strand
    pub fn reverse_complement(&self) -> Self {
        Self {
            name: format!("{}_rc", self.name),
            seq: dna::revcomp(&self.seq),
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.seq))
    }
}

/// Returns the lexicographically smaller of the kmer and its reverse complement together with
/// the orientation in which the kmer reads it.
pub fn canonical(kmer: &[u8]) -> (Vec<u8>, Orientation) {
    let revcomp = dna::revcomp(kmer);
    if kmer <= &revcomp[..] {
        (kmer.to_vec(), Orientation::FWD)
    } else {
        (revcomp, Orientation::REV)
    }
}
