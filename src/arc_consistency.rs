use std::collections::VecDeque;

use bit_set::BitSet;
use log::trace;

use crate::crossword::Crossword;
use crate::domains::Domains;
use crate::VariableId;

/// FIFO queue of arcs `(x, y)` still to be made consistent. Revising `(x, y)` prunes `x` against
/// `y`.
#[derive(Debug, Default)]
pub struct ArcQueue {
    queue: VecDeque<(VariableId, VariableId)>,
}

impl ArcQueue {
    pub fn new() -> ArcQueue {
        ArcQueue { queue: VecDeque::new() }
    }

    /// Every ordered pair of distinct slots, whether or not they cross.
    pub fn all_pairs(crossword: &Crossword) -> ArcQueue {
        let count = crossword.variables().len();

        (0..count)
            .flat_map(|x| (0..count).filter(move |&y| y != x).map(move |y| (x, y)))
            .collect()
    }

    pub fn push_back(&mut self, x: VariableId, y: VariableId) {
        self.queue.push_back((x, y));
    }

    pub fn pop_front(&mut self) -> Option<(VariableId, VariableId)> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl FromIterator<(VariableId, VariableId)> for ArcQueue {
    fn from_iter<I: IntoIterator<Item = (VariableId, VariableId)>>(iter: I) -> Self {
        ArcQueue { queue: VecDeque::from_iter(iter) }
    }
}

/// AC-3 over the crossing constraints. Keeps a running count of `revise` calls so the search can
/// report how much propagation it did.
#[derive(Debug, Default)]
pub struct ArcConsistency {
    revisions: u64,
}

impl ArcConsistency {
    pub fn new() -> ArcConsistency {
        ArcConsistency { revisions: 0 }
    }

    /// Number of `revise` calls made so far.
    pub fn revisions(&self) -> u64 {
        self.revisions
    }

    /// Make `x` arc consistent with `y` by removing every candidate of `x` whose letter at the
    /// crossing doesn't appear at the same crossing in any candidate of `y`. Returns whether
    /// anything was removed. Slots that don't cross are always consistent.
    ///
    /// Two slots holding the same word is not checked here; that's the search's job.
    pub fn revise(
        &mut self,
        crossword: &Crossword,
        domains: &mut Domains,
        x: VariableId,
        y: VariableId,
    ) -> bool {
        self.revisions += 1;

        let Some(overlap) = crossword.overlap(x, y) else {
            return false;
        };

        // Which glyphs does `y` still offer at the crossing cell?
        let supported: BitSet = domains
            .iter(y)
            .filter_map(|word_id| crossword.word_glyphs(word_id).get(overlap.second).copied())
            .collect();

        let removed = domains.retain(x, |word_id| {
            crossword
                .word_glyphs(word_id)
                .get(overlap.first)
                .is_some_and(|&glyph| supported.contains(glyph))
        });

        removed > 0
    }

    /// Run AC-3 until the queue empties. With no `arcs`, start from every ordered pair of
    /// distinct slots.
    ///
    /// Returns false as soon as any domain becomes empty, true otherwise.
    pub fn ac3(
        &mut self,
        crossword: &Crossword,
        domains: &mut Domains,
        arcs: Option<ArcQueue>,
    ) -> bool {
        let mut queue = arcs.unwrap_or_else(|| ArcQueue::all_pairs(crossword));
        trace!("Starting AC-3 with {} arcs", queue.len());

        while let Some((x, y)) = queue.pop_front() {
            if !self.revise(crossword, domains, x, y) {
                continue;
            }

            if domains.is_empty(x) {
                trace!("AC-3 emptied the domain of {}", crossword.variable(x));
                return false;
            }

            // Shrinking `x` may leave the other slots crossing it without support.
            for &z in crossword.neighbors(x) {
                if z != y {
                    queue.push_back(z, x);
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crossword::{Direction, Variable};
    use crate::WordId;

    fn words_of(crossword: &Crossword, domains: &Domains, variable_id: VariableId) -> Vec<String> {
        domains.iter(variable_id).map(|word_id| crossword.word(word_id).to_string()).collect()
    }

    fn node_consistent(crossword: &Crossword) -> Domains {
        let mut domains = Domains::new(crossword);
        domains.enforce_node_consistency(crossword);
        domains
    }

    #[test]
    fn revise_prunes_unsupported_words() {
        let crossword =
            Crossword::from_strings("___\n_##\n_##\n", "cat\ncar\nant\nbee\n").unwrap();
        let mut domains = node_consistent(&crossword);
        let across = crossword.variable_id(&Variable::new(0, 0, 3, Direction::Across)).unwrap();
        let down = crossword.variable_id(&Variable::new(0, 0, 3, Direction::Down)).unwrap();

        let _ = domains.retain(down, |word_id| crossword.word(word_id) == "CAR");

        let mut propagator = ArcConsistency::new();
        assert!(propagator.revise(&crossword, &mut domains, across, down));
        assert_eq!(words_of(&crossword, &domains, across), vec!["CAR", "CAT"]);
        assert!(!propagator.revise(&crossword, &mut domains, across, down));
        assert_eq!(propagator.revisions(), 2);
    }

    #[test]
    fn revise_ignores_slots_that_do_not_cross() {
        let crossword = Crossword::from_strings("___\n###\n___\n", "cat\ndog\n").unwrap();
        let mut domains = node_consistent(&crossword);
        let _ = domains.retain(1, |word_id| crossword.word(word_id) == "DOG");

        assert!(!ArcConsistency::new().revise(&crossword, &mut domains, 0, 1));
        assert_eq!(domains.len(0), 2);
    }

    #[test]
    fn ac3_reaches_arc_consistent_fixpoint() {
        let crossword = Crossword::from_strings(
            "
____
_#_#
____
"
            .trim_start(),
            "bead\nants\nboat\nlane\nboa\nart\nton\nnab\n",
        )
        .unwrap();
        let mut domains = node_consistent(&crossword);

        assert!(ArcConsistency::new().ac3(&crossword, &mut domains, None));

        let count = crossword.variables().len();
        for x in 0..count {
            assert!(!domains.is_empty(x));
            for y in 0..count {
                let Some(overlap) = crossword.overlap(x, y) else {
                    continue;
                };
                for a in domains.iter(x) {
                    assert!(
                        domains.iter(y).any(|b| {
                            crossword.word_glyphs(a)[overlap.first]
                                == crossword.word_glyphs(b)[overlap.second]
                        }),
                        "{} in {} has no support in {}",
                        crossword.word(a),
                        crossword.variable(x),
                        crossword.variable(y)
                    );
                }
            }
        }
    }

    #[test]
    fn ac3_detects_empty_domain() {
        let crossword = Crossword::from_strings("___\n_##\n_##\n", "cat\ndog\n").unwrap();
        let mut domains = node_consistent(&crossword);
        let across = crossword.variable_id(&Variable::new(0, 0, 3, Direction::Across)).unwrap();
        let down = crossword.variable_id(&Variable::new(0, 0, 3, Direction::Down)).unwrap();
        let _ = domains.retain(across, |word_id| crossword.word(word_id) == "CAT");
        let _ = domains.retain(down, |word_id| crossword.word(word_id) == "DOG");

        assert!(!ArcConsistency::new().ac3(&crossword, &mut domains, None));
    }

    #[test]
    fn ac3_only_processes_given_arcs() {
        let crossword =
            Crossword::from_strings("___\n_##\n_##\n", "cat\ncar\nant\n").unwrap();
        let mut domains = node_consistent(&crossword);
        let across = crossword.variable_id(&Variable::new(0, 0, 3, Direction::Across)).unwrap();
        let down = crossword.variable_id(&Variable::new(0, 0, 3, Direction::Down)).unwrap();
        let _ = domains.retain(down, |word_id| crossword.word(word_id) == "ANT");

        // Pruning `down` against `across` changes nothing, so `across` is never revisited.
        let arcs: ArcQueue = [(down, across)].into_iter().collect();
        assert!(ArcConsistency::new().ac3(&crossword, &mut domains, Some(arcs)));
        assert_eq!(domains.len(across), 3);

        let arcs: ArcQueue = [(across, down)].into_iter().collect();
        assert!(ArcConsistency::new().ac3(&crossword, &mut domains, Some(arcs)));
        assert_eq!(words_of(&crossword, &domains, across), vec!["ANT"]);
    }

    #[test]
    fn fixpoint_does_not_depend_on_arc_order() {
        let crossword = Crossword::from_strings(
            "
_____
_#_#_
_____
"
            .trim_start(),
            "abcde\nafghi\nxbyez\nahx\nchy\neiz\nbad\nbin\nthe\ncab\nebb\n",
        )
        .unwrap();

        let mut forward = node_consistent(&crossword);
        let forward_ok = ArcConsistency::new().ac3(&crossword, &mut forward, None);

        let mut backward = node_consistent(&crossword);
        let mut pairs: Vec<(VariableId, VariableId)> =
            ArcQueue::all_pairs(&crossword).queue.into_iter().collect();
        pairs.reverse();
        let backward_ok =
            ArcConsistency::new().ac3(&crossword, &mut backward, Some(pairs.into_iter().collect()));

        assert_eq!(forward_ok, backward_ok);
        for variable_id in 0..crossword.variables().len() {
            let forward_words: Vec<WordId> = forward.iter(variable_id).collect();
            let backward_words: Vec<WordId> = backward.iter(variable_id).collect();
            assert_eq!(forward_words, backward_words);
        }
    }
}
