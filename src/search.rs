use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use bit_set::BitSet;
use instant::{Duration, Instant};
use log::{debug, info};
use smallvec::{smallvec, SmallVec};

use crate::arc_consistency::{ArcConsistency, ArcQueue};
use crate::crossword::{Crossword, Variable};
use crate::domains::{Checkpoint, Domains};
use crate::{VariableId, WordId, MAX_SLOT_COUNT, MAX_SLOT_LENGTH};

/// A partial mapping from slots to words, with at most one word per slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    words: Vec<Option<WordId>>,
    assigned: usize,
}

impl Assignment {
    /// An empty assignment for the slots of `crossword`.
    pub fn new(crossword: &Crossword) -> Assignment {
        Assignment {
            words: vec![None; crossword.variables().len()],
            assigned: 0,
        }
    }

    pub fn get(&self, variable_id: VariableId) -> Option<WordId> {
        self.words.get(variable_id).copied().flatten()
    }

    pub fn contains(&self, variable_id: VariableId) -> bool {
        self.get(variable_id).is_some()
    }

    /// Put `word_id` in a slot, returning the word it replaced.
    pub fn assign(&mut self, variable_id: VariableId, word_id: WordId) -> Option<WordId> {
        let previous = self.words[variable_id].replace(word_id);
        if previous.is_none() {
            self.assigned += 1;
        }
        previous
    }

    /// Clear a slot, returning the word it held.
    pub fn unassign(&mut self, variable_id: VariableId) -> Option<WordId> {
        let previous = self.words[variable_id].take();
        if previous.is_some() {
            self.assigned -= 1;
        }
        previous
    }

    /// Number of slots holding a word.
    pub fn len(&self) -> usize {
        self.assigned
    }

    pub fn is_empty(&self) -> bool {
        self.assigned == 0
    }

    /// Every filled slot and its word id, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, WordId)> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter_map(|(variable_id, word_id)| word_id.map(|word_id| (variable_id, word_id)))
    }

    /// Every filled slot and its word, resolved against `crossword`.
    pub fn words<'c>(
        &'c self,
        crossword: &'c Crossword,
    ) -> impl Iterator<Item = (&'c Variable, &'c str)> + 'c {
        self.iter()
            .map(move |(variable_id, word_id)| (crossword.variable(variable_id), crossword.word(word_id)))
    }

    pub fn to_map(&self, crossword: &Crossword) -> HashMap<Variable, String> {
        self.words(crossword)
            .map(|(variable, word)| (*variable, word.to_string()))
            .collect()
    }
}

/// Settings for a single solve.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolverOptions {
    /// Re-run AC-3 after every choice, undoing its pruning when the choice is abandoned.
    pub maintain_arc_consistency: bool,

    /// Give up after trying this many candidate words.
    pub state_limit: Option<u64>,
}

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Candidate words tried.
    pub states: u64,
    /// Slots whose candidates were all exhausted.
    pub backtracks: u64,
    /// Calls to `revise`.
    pub revisions: u64,
    pub duration: Duration,
}

/// A struct representing the results of a fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub statistics: Statistics,
    pub assignment: Assignment,
}

/// Why a fill operation ended without an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillFailure {
    /// No assignment satisfies every constraint.
    Unsatisfiable,
    /// The configured state limit was hit before the search finished.
    ExhaustedStateLimit,
}

impl Display for FillFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FillFailure::Unsatisfiable => write!(f, "no assignment satisfies the puzzle"),
            FillFailure::ExhaustedStateLimit => write!(f, "state limit reached before a fill was found"),
        }
    }
}

/// One level of the search: the slot being filled, its candidates in the order they'll be
/// tried, and the domain state to return to before trying the next one.
#[derive(Debug)]
struct Frame {
    variable_id: VariableId,
    candidates: Vec<WordId>,
    next: usize,
    checkpoint: Checkpoint,
}

/// Backtracking search over a single crossword. Owns the domains for the duration of the solve.
#[derive(Debug)]
pub struct Solver<'a> {
    crossword: &'a Crossword,
    domains: Domains,
    propagator: ArcConsistency,
    options: SolverOptions,
    statistics: Statistics,
}

impl<'a> Solver<'a> {
    pub fn new(crossword: &'a Crossword) -> Solver<'a> {
        Solver::with_options(crossword, SolverOptions::default())
    }

    pub fn with_options(crossword: &'a Crossword, options: SolverOptions) -> Solver<'a> {
        Solver {
            crossword,
            domains: Domains::new(crossword),
            propagator: ArcConsistency::new(),
            options,
            statistics: Statistics::default(),
        }
    }

    pub fn crossword(&self) -> &'a Crossword {
        self.crossword
    }

    pub fn domains(&self) -> &Domains {
        &self.domains
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Remove every candidate whose length doesn't match its slot.
    pub fn enforce_node_consistency(&mut self) {
        self.domains.enforce_node_consistency(self.crossword);
    }

    /// Run AC-3 over the current domains. See [`ArcConsistency::ac3`].
    pub fn ac3(&mut self, arcs: Option<ArcQueue>) -> bool {
        let result = self.propagator.ac3(self.crossword, &mut self.domains, arcs);
        self.statistics.revisions = self.propagator.revisions();
        result
    }

    /// Does every slot hold a word?
    pub fn assignment_complete(&self, assignment: &Assignment) -> bool {
        assignment.len() == self.crossword.variables().len()
    }

    /// Is the assignment free of repeated words, length mismatches and crossing conflicts?
    pub fn consistent(&self, assignment: &Assignment) -> bool {
        let crossword = self.crossword;

        let mut used = BitSet::with_capacity(crossword.word_count());
        for (_, word_id) in assignment.iter() {
            if !used.insert(word_id) {
                return false;
            }
        }

        for (variable_id, word_id) in assignment.iter() {
            if crossword.word_length(word_id) != crossword.variable(variable_id).length {
                return false;
            }
        }

        for (x, x_word) in assignment.iter() {
            for &y in crossword.neighbors(x) {
                let (Some(y_word), Some(overlap)) = (assignment.get(y), crossword.overlap(x, y))
                else {
                    continue;
                };

                if crossword.word_glyphs(x_word)[overlap.first]
                    != crossword.word_glyphs(y_word)[overlap.second]
                {
                    return false;
                }
            }
        }

        true
    }

    /// Pick the unfilled slot with the fewest remaining candidates, preferring the one crossing
    /// the most slots, then the lowest id. Returns `None` once every slot is filled.
    pub fn select_unassigned_variable(&self, assignment: &Assignment) -> Option<VariableId> {
        (0..self.crossword.variables().len())
            .filter(|&variable_id| !assignment.contains(variable_id))
            .min_by_key(|&variable_id| {
                (self.domains.len(variable_id), Reverse(self.crossword.degree(variable_id)))
            })
    }

    /// Order a slot's candidates by how many candidates each would rule out in the unfilled
    /// slots crossing it, fewest first. Ties keep word id (alphabetical) order.
    pub fn order_domain_values(
        &self,
        variable_id: VariableId,
        assignment: &Assignment,
    ) -> Vec<WordId> {
        let crossword = self.crossword;

        // For each unfilled neighbor: the cell index on our side, how many of its candidates
        // place each glyph at the crossing, and its candidate count.
        let neighbor_counts: SmallVec<[(usize, Vec<usize>, usize); MAX_SLOT_LENGTH]> = crossword
            .neighbors(variable_id)
            .iter()
            .filter(|&&neighbor| !assignment.contains(neighbor))
            .filter_map(|&neighbor| {
                let overlap = crossword.overlap(variable_id, neighbor)?;
                let mut glyph_counts = vec![0; crossword.glyph_count()];
                for word_id in self.domains.iter(neighbor) {
                    if let Some(&glyph) = crossword.word_glyphs(word_id).get(overlap.second) {
                        glyph_counts[glyph] += 1;
                    }
                }
                Some((overlap.first, glyph_counts, self.domains.len(neighbor)))
            })
            .collect();

        let mut candidates: Vec<WordId> = self.domains.iter(variable_id).collect();
        candidates.sort_by_cached_key(|&word_id| {
            let glyphs = crossword.word_glyphs(word_id);

            neighbor_counts
                .iter()
                .map(|(cell_idx, glyph_counts, total)| {
                    let compatible = glyphs.get(*cell_idx).map(|&glyph| glyph_counts[glyph]);
                    total - compatible.unwrap_or(0)
                })
                .sum::<usize>()
        });

        candidates
    }

    /// After filling `variable_id` with `word_id`, shrink its domain to that word, take the word
    /// away from every other unfilled slot, and propagate. Returns false if some slot runs out
    /// of candidates.
    fn propagate_choice(
        &mut self,
        variable_id: VariableId,
        word_id: WordId,
        assignment: &Assignment,
    ) -> bool {
        let crossword = self.crossword;

        let _ = self.domains.retain(variable_id, |candidate| candidate == word_id);
        let mut changed: SmallVec<[VariableId; MAX_SLOT_COUNT]> = smallvec![variable_id];

        for other in 0..crossword.variables().len() {
            if other == variable_id || assignment.contains(other) {
                continue;
            }
            if self.domains.remove(other, word_id) {
                if self.domains.is_empty(other) {
                    return false;
                }
                changed.push(other);
            }
        }

        let arcs: ArcQueue = changed
            .iter()
            .flat_map(|&x| crossword.neighbors(x).iter().map(move |&z| (z, x)))
            .collect();

        self.ac3(Some(arcs))
    }

    /// Extend `assignment` to a complete, consistent one by depth-first search, returning the
    /// first one found.
    ///
    /// Each level of the search is a [`Frame`] on an explicit stack, so the depth is bounded by
    /// the number of slots. Moving on from a candidate clears its slot and restores the domains
    /// to the frame's checkpoint.
    pub fn backtrack(&mut self, mut assignment: Assignment) -> Result<Assignment, FillFailure> {
        let mut stack: Vec<Frame> = Vec::with_capacity(self.crossword.variables().len());

        'slot_selection: while let Some(variable_id) = self.select_unassigned_variable(&assignment)
        {
            let candidates = self.order_domain_values(variable_id, &assignment);
            stack.push(Frame {
                variable_id,
                candidates,
                next: 0,
                checkpoint: self.domains.checkpoint(),
            });

            'option_selection: while let Some(frame) = stack.last_mut() {
                if assignment.unassign(frame.variable_id).is_some() {
                    self.domains.restore(frame.checkpoint);
                }

                let Some(&word_id) = frame.candidates.get(frame.next) else {
                    // Out of candidates; let the previous slot try its next word.
                    let _ = stack.pop();
                    self.statistics.backtracks += 1;
                    continue 'option_selection;
                };
                frame.next += 1;
                let variable_id = frame.variable_id;

                self.statistics.states += 1;
                if self.options.state_limit.is_some_and(|limit| self.statistics.states > limit) {
                    return Err(FillFailure::ExhaustedStateLimit);
                }

                let _ = assignment.assign(variable_id, word_id);
                if !self.consistent(&assignment) {
                    continue 'option_selection;
                }
                if self.options.maintain_arc_consistency
                    && !self.propagate_choice(variable_id, word_id, &assignment)
                {
                    continue 'option_selection;
                }

                continue 'slot_selection;
            }

            return Err(FillFailure::Unsatisfiable);
        }

        Ok(assignment)
    }

    /// Enforce node and arc consistency, then search. Stops early if either leaves a slot with
    /// no candidates.
    pub fn fill(&mut self) -> Result<Assignment, FillFailure> {
        let start = Instant::now();
        let result = self.fill_impl();
        self.statistics.duration = start.elapsed();

        match &result {
            Ok(_) => info!(
                "Found a fill in {:?} after {} states",
                self.statistics.duration, self.statistics.states
            ),
            Err(failure) => info!("No fill found: {}", failure),
        }

        result
    }

    fn fill_impl(&mut self) -> Result<Assignment, FillFailure> {
        self.enforce_node_consistency();

        let variable_count = self.crossword.variables().len();
        if let Some(empty) = (0..variable_count).find(|&id| self.domains.is_empty(id)) {
            debug!("No word fits {}", self.crossword.variable(empty));
            return Err(FillFailure::Unsatisfiable);
        }

        if !self.ac3(None) {
            debug!("Initial arc consistency emptied a domain");
            return Err(FillFailure::Unsatisfiable);
        }

        debug!(
            "After arc consistency: {} candidates across {} slots",
            (0..variable_count).map(|id| self.domains.len(id)).sum::<usize>(),
            variable_count
        );

        self.backtrack(Assignment::new(self.crossword))
    }

    /// Find an assignment for every slot, or `None` if there isn't one (or the state limit ran
    /// out first).
    pub fn solve(&mut self) -> Option<Assignment> {
        self.fill().ok()
    }
}

/// Search for a valid fill for the given crossword.
pub fn find_fill(
    crossword: &Crossword,
    options: SolverOptions,
) -> Result<FillSuccess, FillFailure> {
    let mut solver = Solver::with_options(crossword, options);
    let assignment = solver.fill()?;

    Ok(FillSuccess {
        statistics: solver.statistics,
        assignment,
    })
}
