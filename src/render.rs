use crate::crossword::Crossword;
use crate::search::Assignment;

/// Character drawn for blocked cells.
pub const BLOCK: char = '█';

/// Project an assignment onto the grid. Cells not covered by a filled slot are `None`.
pub fn letter_grid(crossword: &Crossword, assignment: &Assignment) -> Vec<Vec<Option<char>>> {
    let mut letters: Vec<Vec<Option<char>>> =
        (0..crossword.height()).map(|_| vec![None; crossword.width()]).collect();

    for (variable, word) in assignment.words(crossword) {
        for ((row, col), letter) in variable.cells().zip(word.chars()) {
            letters[row][col] = Some(letter);
        }
    }

    letters
}

/// Turn the given crossword and assignment into a rendered string, one line per row.
pub fn render_grid(crossword: &Crossword, assignment: &Assignment) -> String {
    let letters = letter_grid(crossword, assignment);

    letters
        .iter()
        .enumerate()
        .map(|(row, line)| {
            line.iter()
                .enumerate()
                .map(|(col, letter)| {
                    if crossword.is_fillable(row, col) {
                        letter.unwrap_or(' ')
                    } else {
                        BLOCK
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
