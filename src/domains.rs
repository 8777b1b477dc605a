use bit_set::BitSet;
use log::debug;

use crate::crossword::Crossword;
use crate::{VariableId, WordId};

/// A position on the removal trail. Restoring to it puts back every word removed since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// The candidate words for each slot, as sets of word ids.
///
/// Removals made after the first call to [`Domains::checkpoint`] are recorded on a trail so they
/// can be undone; removals made before that (node consistency, the initial AC-3 pass) are
/// permanent.
#[derive(Debug, Clone)]
pub struct Domains {
    domains: Vec<BitSet>,
    trail: Vec<(VariableId, WordId)>,
    recording: bool,
}

impl Domains {
    /// Give every slot the whole vocabulary.
    pub fn new(crossword: &Crossword) -> Domains {
        let word_count = crossword.word_count();
        let full: BitSet = (0..word_count).collect();

        Domains {
            domains: crossword.variables().iter().map(|_| full.clone()).collect(),
            trail: vec![],
            recording: false,
        }
    }

    /// Remove every candidate whose length doesn't match its slot.
    pub fn enforce_node_consistency(&mut self, crossword: &Crossword) {
        for (variable_id, variable) in crossword.variables().iter().enumerate() {
            let wrong_length: Vec<WordId> = self.domains[variable_id]
                .iter()
                .filter(|&word_id| crossword.word_length(word_id) != variable.length)
                .collect();

            for word_id in wrong_length {
                let _ = self.remove(variable_id, word_id);
            }
        }

        debug!(
            "Node consistency left {} candidates across {} slots",
            self.domains.iter().map(BitSet::len).sum::<usize>(),
            self.domains.len()
        );
    }

    pub fn len(&self, variable_id: VariableId) -> usize {
        self.domains[variable_id].len()
    }

    pub fn is_empty(&self, variable_id: VariableId) -> bool {
        self.domains[variable_id].is_empty()
    }

    pub fn contains(&self, variable_id: VariableId, word_id: WordId) -> bool {
        self.domains[variable_id].contains(word_id)
    }

    /// The remaining candidates for a slot, in word id order.
    pub fn iter(&self, variable_id: VariableId) -> impl Iterator<Item = WordId> + '_ {
        self.domains[variable_id].iter()
    }

    /// Remove a candidate, returning whether it was present.
    pub fn remove(&mut self, variable_id: VariableId, word_id: WordId) -> bool {
        let removed = self.domains[variable_id].remove(word_id);
        if removed && self.recording {
            self.trail.push((variable_id, word_id));
        }
        removed
    }

    /// Keep only the candidates matching `keep`, returning how many were removed.
    pub fn retain<F>(&mut self, variable_id: VariableId, mut keep: F) -> usize
    where
        F: FnMut(WordId) -> bool,
    {
        let to_remove: Vec<WordId> =
            self.domains[variable_id].iter().filter(|&word_id| !keep(word_id)).collect();

        for &word_id in &to_remove {
            let _ = self.remove(variable_id, word_id);
        }

        to_remove.len()
    }

    /// Mark the current state so it can be restored later.
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.recording = true;
        Checkpoint(self.trail.len())
    }

    /// Put back every candidate removed since `checkpoint` was taken.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        while self.trail.len() > checkpoint.0 {
            if let Some((variable_id, word_id)) = self.trail.pop() {
                let _ = self.domains[variable_id].insert(word_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crossword() -> Crossword {
        Crossword::from_strings("___\n_##\n_##\n", "cat\ncar\nant\nox\nhorse\n").unwrap()
    }

    #[test]
    fn starts_with_full_vocabulary() {
        let crossword = crossword();
        let domains = Domains::new(&crossword);

        for variable_id in 0..crossword.variables().len() {
            assert_eq!(domains.len(variable_id), 5);
        }
    }

    #[test]
    fn node_consistency_keeps_only_matching_lengths() {
        let crossword = crossword();
        let mut domains = Domains::new(&crossword);

        domains.enforce_node_consistency(&crossword);

        for (variable_id, variable) in crossword.variables().iter().enumerate() {
            assert_eq!(domains.len(variable_id), 3);
            assert!(domains
                .iter(variable_id)
                .all(|word_id| crossword.word_length(word_id) == variable.length));
        }
    }

    #[test]
    fn node_consistency_is_idempotent() {
        let crossword = crossword();
        let mut once = Domains::new(&crossword);
        once.enforce_node_consistency(&crossword);

        let mut twice = once.clone();
        twice.enforce_node_consistency(&crossword);

        for variable_id in 0..crossword.variables().len() {
            assert_eq!(
                once.iter(variable_id).collect::<Vec<_>>(),
                twice.iter(variable_id).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn restore_undoes_removals_since_checkpoint() {
        let crossword = crossword();
        let mut domains = Domains::new(&crossword);
        domains.enforce_node_consistency(&crossword);
        let before: Vec<Vec<WordId>> =
            (0..2).map(|variable_id| domains.iter(variable_id).collect()).collect();

        let outer = domains.checkpoint();
        assert!(domains.remove(0, crossword.word_id("CAT").unwrap()));
        assert!(!domains.remove(0, crossword.word_id("CAT").unwrap()));

        let inner = domains.checkpoint();
        assert_eq!(domains.retain(1, |_| false), 3);
        assert!(domains.is_empty(1));

        domains.restore(inner);
        assert_eq!(domains.len(1), 3);
        assert_eq!(domains.len(0), 2);

        domains.restore(outer);
        let after: Vec<Vec<WordId>> =
            (0..2).map(|variable_id| domains.iter(variable_id).collect()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn removals_before_first_checkpoint_are_permanent() {
        let crossword = crossword();
        let mut domains = Domains::new(&crossword);
        domains.enforce_node_consistency(&crossword);

        let checkpoint = domains.checkpoint();
        domains.restore(checkpoint);

        assert_eq!(domains.len(0), 3);
    }
}
