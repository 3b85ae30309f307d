#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]

//! Crate for checking DNA-origami designs for unintended secondary binding sites.
//! Short 7-mers repeated inside the scaffold, or shared between different staples as exact
//! complements, can hybridize away from their designed location and cause misfolding.
//!
//! The [`design`] module turns a cadnano design and a scaffold sequence into one scaffold and a
//! list of staple [`Sequence`]s, which [`score`] counts into a [`ScoreReport`].

pub mod design;
pub mod error;
pub mod score;
pub mod sequence;

pub use crate::score::{score, score_check, ScoreKey, ScoreReport, Scorer};
pub use crate::sequence::Sequence;

/// Length of the kmers that are checked for complementarity
pub const KMER_SIZE: usize = 7;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, crate::error::Error>;
