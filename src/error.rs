use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors of which majority are related to I/O issues or malformed designs and sequences
pub enum Error {
    #[error("Could not read input file")]
    /// Could not read from a design or sequence file
    Io(#[from] std::io::Error),
    #[error("Could not convert bytes as they are invalid UTF-8")]
    /// Data is not in UTF-8 format
    NotUTF8(#[from] std::string::FromUtf8Error),
    #[error("Could not open sequence file")]
    /// Compressed or plain reader could not be created
    Niffler(#[from] niffler::Error),
    #[error("Could not parse cadnano design: {0}")]
    /// Design JSON is malformed
    Json(#[from] serde_json::Error),
    #[error("Could not spawn threads")]
    /// Create thread pools erorr
    ThreadError,
    #[error("MissingInput: file {0} does not exist")]
    /// Design or sequence file is absent
    MissingInput(PathBuf),
    #[error("Design must contain exactly one scaffold strand but found {0}")]
    /// Zero or multiple scaffold strands
    ScaffoldCardinality(usize),
    #[error("Only A, G, C, T and N nucleotides are allowed but got `{base}` at position {position} of {strand}")]
    /// Incorect nucleotide supplied
    InvalidBase {
        /// Name of the offending strand
        strand: String,
        /// 0-based position within the strand
        position: usize,
        /// Character that was rejected
        base: char,
    },
    #[error("Sequence {0} is empty")]
    /// Strand without any bases
    EmptySequence(String),
    #[error("Scaffold sequence has {available} bases but the scaffold strand needs {needed}")]
    /// Sequence file does not cover the scaffold path
    ScaffoldSequenceTooShort {
        /// Bases on the traced scaffold
        needed: usize,
        /// Bases in the sequence file
        available: usize,
    },
    #[error("Strand link at helix {helix} index {index} points to an empty or already visited position")]
    /// Inconsistent strand connectivity in the design
    BrokenStrand {
        /// Helix number of the link target
        helix: i64,
        /// Base index of the link target
        index: i64,
    },
    #[error("Strand link points to unknown helix {0}")]
    /// Link to a helix that is not part of the design
    UnknownHelix(i64),
}
