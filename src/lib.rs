//! Fill crossword grids with words from a dictionary by treating every slot as a variable in a
//! constraint satisfaction problem.
//!
//! The pipeline is: build a [`Crossword`] from a structure and a word list, give each slot the
//! full vocabulary as its domain, drop words of the wrong length (node consistency), prune words
//! without support in crossing slots (AC-3), then run backtracking search with the MRV/degree and
//! least-constraining-value heuristics.

pub mod arc_consistency;
pub mod crossword;
pub mod domains;
pub mod error;
pub mod render;
pub mod search;

pub use crate::crossword::{Crossword, Direction, Overlap, Variable};
pub use crate::domains::Domains;
pub use crate::error::PuzzleError;
pub use crate::render::{letter_grid, render_grid};
pub use crate::search::{
    find_fill, Assignment, FillFailure, FillSuccess, Solver, SolverOptions, Statistics,
};

/// The expected maximum number of slots appearing in a grid.
pub const MAX_SLOT_COUNT: usize = 256;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// An identifier for a given slot, based on its index in the crossword's `variables` field.
pub type VariableId = usize;

/// An identifier for a given word, based on its index in the crossword's `words` field.
pub type WordId = usize;

/// An identifier for a given letter, based on its index in the crossword's `glyphs` field.
pub type GlyphId = usize;
