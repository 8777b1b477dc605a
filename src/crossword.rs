use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Debug, Display, Formatter};
use std::fs;
use std::path::Path;

use smallvec::SmallVec;

use crate::error::PuzzleError;
use crate::{GlyphId, VariableId, WordId, MAX_SLOT_LENGTH};

/// The character marking a fillable cell in a structure file. Anything else is a block.
pub const FILLABLE_CELL: char = '_';

/// Zero-indexed (row, column) coords for a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Across,
    Down,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Across => write!(f, "across"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A word slot in the grid. Two variables are equal when they start in the same cell, have the
/// same length and face the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub row: usize,
    pub col: usize,
    pub length: usize,
    pub direction: Direction,
}

impl Variable {
    pub fn new(row: usize, col: usize, length: usize, direction: Direction) -> Variable {
        Variable { row, col, length, direction }
    }

    /// Generate the coords for each cell of this slot, in word order.
    pub fn cells(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.length).map(move |cell_idx| match self.direction {
            Direction::Across => (self.row, self.col + cell_idx),
            Direction::Down => (self.row + cell_idx, self.col),
        })
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {} {}", self.row, self.col, self.direction, self.length)
    }
}

/// A shared cell between two slots: character `first` of the first slot's word must equal
/// character `second` of the second slot's word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Overlap {
    pub first: usize,
    pub second: usize,
}

impl Overlap {
    /// The same crossing, seen from the other slot.
    pub fn reversed(self) -> Overlap {
        Overlap { first: self.second, second: self.first }
    }
}

/// A word from the vocabulary, along with the glyph ids of its characters.
#[derive(Debug)]
pub struct Word {
    pub string: String,
    pub glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]>,
}

/// The immutable description of a puzzle: which cells are fillable, which slots they form, which
/// words may be used and where the slots cross.
pub struct Crossword {
    height: usize,
    width: usize,
    structure: Vec<Vec<bool>>,
    variables: Vec<Variable>,
    glyphs: Vec<char>,
    words: Vec<Word>,
    overlaps: HashMap<(VariableId, VariableId), Overlap>,
    neighbors: Vec<SmallVec<[VariableId; MAX_SLOT_LENGTH]>>,
}

impl Debug for Crossword {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crossword")
            .field("height", &self.height)
            .field("width", &self.width)
            .field("variables", &self.variables)
            .field("glyphs", &self.glyphs)
            .field("words", &(["(", &self.words.len().to_string(), " entries)"].join("")))
            .finish()
    }
}

impl Crossword {
    /// Build a crossword from a grid of fillable cells and a vocabulary. Duplicate and empty
    /// words are dropped; the remaining words are numbered in sorted order.
    pub fn new<I, S>(structure: Vec<Vec<bool>>, words: I) -> Result<Crossword, PuzzleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let height = structure.len();
        let width = structure.first().map(Vec::len).ok_or(PuzzleError::EmptyStructure)?;

        for (row, line) in structure.iter().enumerate() {
            if line.len() != width {
                return Err(PuzzleError::RaggedRow { row, expected: width, found: line.len() });
            }
        }

        let variables = derive_variables(&structure);

        let vocabulary: BTreeSet<String> = words
            .into_iter()
            .map(Into::into)
            .filter(|word| !word.is_empty())
            .collect();

        let glyphs: Vec<char> = vocabulary
            .iter()
            .flat_map(|word| word.chars())
            .collect::<BTreeSet<char>>()
            .into_iter()
            .collect();

        let glyph_ids_by_char: HashMap<char, GlyphId> =
            glyphs.iter().enumerate().map(|(id, &glyph)| (glyph, id)).collect();

        let words: Vec<Word> = vocabulary
            .into_iter()
            .map(|string| {
                let glyphs = string.chars().map(|c| glyph_ids_by_char[&c]).collect();
                Word { string, glyphs }
            })
            .collect();

        // Map each cell to the slots passing through it, then turn every cell shared by two slots
        // into a pair of overlaps.
        let mut entries_by_cell: HashMap<GridCoord, SmallVec<[(VariableId, usize); 2]>> =
            HashMap::new();
        for (variable_id, variable) in variables.iter().enumerate() {
            for (cell_idx, loc) in variable.cells().enumerate() {
                entries_by_cell.entry(loc).or_default().push((variable_id, cell_idx));
            }
        }

        let mut overlaps: HashMap<(VariableId, VariableId), Overlap> = HashMap::new();
        for entries in entries_by_cell.values() {
            for &(x, i) in entries {
                for &(y, j) in entries {
                    if x == y {
                        continue;
                    }
                    let overlap = Overlap { first: i, second: j };
                    if overlaps.insert((x, y), overlap).is_some() {
                        return Err(PuzzleError::DoubleCrossing {
                            first: variables[x],
                            second: variables[y],
                        });
                    }
                }
            }
        }

        let mut neighbors: Vec<SmallVec<[VariableId; MAX_SLOT_LENGTH]>> =
            variables.iter().map(|_| SmallVec::new()).collect();
        for &(x, y) in overlaps.keys() {
            neighbors[x].push(y);
        }
        for variable_neighbors in &mut neighbors {
            variable_neighbors.sort_unstable();
        }

        Ok(Crossword {
            height,
            width,
            structure,
            variables,
            glyphs,
            words,
            overlaps,
            neighbors,
        })
    }

    /// Build a crossword from the text of a structure file and a word-list file.
    pub fn from_strings(structure: &str, words: &str) -> Result<Crossword, PuzzleError> {
        Crossword::new(parse_structure(structure)?, parse_word_list(words))
    }

    /// Read and parse a structure file and a word-list file.
    pub fn from_files(
        structure_path: impl AsRef<Path>,
        words_path: impl AsRef<Path>,
    ) -> Result<Crossword, PuzzleError> {
        let structure_path = structure_path.as_ref();
        let words_path = words_path.as_ref();

        let structure = fs::read_to_string(structure_path)
            .map_err(|source| PuzzleError::io(structure_path, source))?;
        let words =
            fs::read_to_string(words_path).map_err(|source| PuzzleError::io(words_path, source))?;

        Crossword::from_strings(&structure, &words)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_fillable(&self, row: usize, col: usize) -> bool {
        self.structure
            .get(row)
            .and_then(|line| line.get(col))
            .copied()
            .unwrap_or(false)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, variable_id: VariableId) -> &Variable {
        &self.variables[variable_id]
    }

    /// Look up the id of a slot by its position, length and direction.
    pub fn variable_id(&self, variable: &Variable) -> Option<VariableId> {
        self.variables.iter().position(|candidate| candidate == variable)
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn word(&self, word_id: WordId) -> &str {
        &self.words[word_id].string
    }

    pub fn word_glyphs(&self, word_id: WordId) -> &[GlyphId] {
        &self.words[word_id].glyphs
    }

    /// Length of a word in characters.
    pub fn word_length(&self, word_id: WordId) -> usize {
        self.words[word_id].glyphs.len()
    }

    /// Look up the id of a word in the vocabulary.
    pub fn word_id(&self, word: &str) -> Option<WordId> {
        self.words.binary_search_by(|candidate| candidate.string.as_str().cmp(word)).ok()
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn glyph(&self, glyph_id: GlyphId) -> char {
        self.glyphs[glyph_id]
    }

    /// The crossing between `x` and `y`, if they share a cell.
    pub fn overlap(&self, x: VariableId, y: VariableId) -> Option<Overlap> {
        self.overlaps.get(&(x, y)).copied()
    }

    /// Every slot that crosses `variable_id`, in id order.
    pub fn neighbors(&self, variable_id: VariableId) -> &[VariableId] {
        &self.neighbors[variable_id]
    }

    /// The number of slots crossing `variable_id`.
    pub fn degree(&self, variable_id: VariableId) -> usize {
        self.neighbors[variable_id].len()
    }
}

/// Parse a structure: one row per line, `_` for fillable cells and anything else for blocks.
/// Trailing blank lines are ignored.
pub fn parse_structure(contents: &str) -> Result<Vec<Vec<bool>>, PuzzleError> {
    let mut rows: Vec<Vec<bool>> = contents
        .lines()
        .map(|line| line.trim_end_matches('\r').chars().map(|c| c == FILLABLE_CELL).collect())
        .collect();

    while rows.last().is_some_and(Vec::is_empty) {
        let _ = rows.pop();
    }

    if rows.is_empty() {
        return Err(PuzzleError::EmptyStructure);
    }

    Ok(rows)
}

/// Parse a word list: one word per line, trimmed and upper-cased, blank lines skipped.
pub fn parse_word_list(contents: &str) -> Vec<String> {
    let words: BTreeSet<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_uppercase)
        .collect();

    words.into_iter().collect()
}

/// Find the start and length of every run of at least two fillable cells.
fn find_runs(cells: impl Iterator<Item = bool>) -> Vec<(usize, usize)> {
    let mut result: Vec<(usize, usize)> = vec![];
    let mut start: Option<usize> = None;
    let mut count = 0;

    for (idx, fillable) in cells.enumerate() {
        if fillable {
            if start.is_none() {
                start = Some(idx);
            }
            count += 1;
        } else {
            if let Some(start) = start.filter(|_| count > 1) {
                result.push((start, count));
            }
            start = None;
            count = 0;
        }
    }

    if let Some(start) = start.filter(|_| count > 1) {
        result.push((start, count));
    }

    result
}

/// Derive every slot from the grid: across slots row by row, then down slots column by column.
fn derive_variables(structure: &[Vec<bool>]) -> Vec<Variable> {
    let width = structure.first().map(Vec::len).unwrap_or(0);
    let mut variables: Vec<Variable> = vec![];

    for (row, line) in structure.iter().enumerate() {
        for (col, length) in find_runs(line.iter().copied()) {
            variables.push(Variable::new(row, col, length, Direction::Across));
        }
    }

    for col in 0..width {
        for (row, length) in find_runs(structure.iter().map(|line| line[col])) {
            variables.push(Variable::new(row, col, length, Direction::Down));
        }
    }

    variables
}
