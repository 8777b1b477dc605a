use std::path::PathBuf;

use thiserror::Error;

use crate::crossword::Variable;

/// Reasons a structure or word list can't be turned into a [`Crossword`](crate::Crossword).
#[derive(Error, Debug)]
pub enum PuzzleError {
    #[error("Failed to read {path}, more details: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("The structure does not contain any rows.")]
    EmptyStructure,
    #[error("Row {row} of the structure has {found} cells, expected {expected}.")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Slots {first} and {second} cross more than once.")]
    DoubleCrossing { first: Variable, second: Variable },
}

impl PuzzleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
