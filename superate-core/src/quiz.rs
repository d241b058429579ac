//! Quiz question grouping and ordering.
//!
//! Reading-comprehension style questions share a passage. Questions that
//! share a passage carry the same `group_key` and sit next to each other in
//! the full question list; the quiz view shows one notice before the first
//! question of each such group.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A quiz question as far as grouping and ordering are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    /// Shared passage or context identifier, if any.
    #[serde(default)]
    pub group_key: Option<String>,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            group_key: None,
        }
    }

    pub fn with_group(mut self, key: impl Into<String>) -> Self {
        self.group_key = Some(key.into());
        self
    }
}

/// Contiguous questions sharing a context, as 1-based inclusive display positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupRange {
    pub start: usize,
    pub end: usize,
}

impl GroupRange {
    pub fn question_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, position: usize) -> bool {
        (self.start..=self.end).contains(&position)
    }

    /// Inline notice rendered before the first question of the range.
    pub fn notice(&self) -> String {
        format!(
            "Responde las preguntas {} a {} de acuerdo con la siguiente información",
            self.start, self.end
        )
    }
}

fn same_group(a: &Question, b: &Question) -> bool {
    a.group_key.is_some() && a.group_key == b.group_key
}

/// Runs of consecutive questions sharing a non-null key (length >= 2).
fn group_runs(questions: &[Question]) -> impl Iterator<Item = &[Question]> {
    questions
        .chunk_by(same_group)
        .filter(|run| run.len() >= 2)
}

/// Find the grouped ranges to announce in the display list.
///
/// `full` is scanned for runs so group boundaries survive filtering; each run
/// is then expressed in 1-based positions of `display`. A run with fewer than
/// two visible members produces nothing.
pub fn detect_group_ranges(display: &[Question], full: &[Question]) -> Vec<GroupRange> {
    let positions: HashMap<&str, usize> = display
        .iter()
        .enumerate()
        .map(|(index, q)| (q.id.as_str(), index + 1))
        .collect();

    let mut ranges: Vec<GroupRange> = group_runs(full)
        .filter_map(|run| {
            let mut visible = run
                .iter()
                .filter_map(|q| positions.get(q.id.as_str()).copied());
            let first = visible.next()?;
            let (start, end, count) = visible.fold((first, first, 1usize), |(lo, hi, n), p| {
                (lo.min(p), hi.max(p), n + 1)
            });
            (count >= 2).then_some(GroupRange { start, end })
        })
        .collect();

    ranges.sort_by_key(|r| r.start);
    ranges
}

/// The range whose notice belongs right before `position`, if any.
pub fn range_starting_at(ranges: &[GroupRange], position: usize) -> Option<&GroupRange> {
    ranges.iter().find(|r| r.start == position)
}

/// Fisher-Yates shuffle of a question list.
pub fn shuffle_questions<R: Rng + ?Sized>(questions: &mut [Question], rng: &mut R) {
    questions.shuffle(rng);
}

/// Shuffle question order while keeping each group together and in order.
///
/// Grouped runs move as one block; ungrouped questions move alone.
pub fn shuffle_preserving_groups<R: Rng + ?Sized>(
    questions: Vec<Question>,
    rng: &mut R,
) -> Vec<Question> {
    let mut blocks: Vec<Vec<Question>> = questions
        .chunk_by(same_group)
        .map(|block| block.to_vec())
        .collect();
    blocks.shuffle(rng);
    blocks.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn q(id: &str) -> Question {
        Question::new(id, format!("Pregunta {}", id))
    }

    fn qg(id: &str, key: &str) -> Question {
        q(id).with_group(key)
    }

    #[test]
    fn test_group_preserved_through_filter() {
        // Full indices 2,3,4 (1-based) share "G"; the filter keeps exactly those three.
        let full = vec![q("a"), qg("b", "G"), qg("c", "G"), qg("d", "G"), q("e")];
        let display = vec![full[1].clone(), full[2].clone(), full[3].clone()];

        let ranges = detect_group_ranges(&display, &full);
        assert_eq!(ranges, vec![GroupRange { start: 1, end: 3 }]);
    }

    #[test]
    fn test_single_question_group_is_ignored() {
        let full = vec![q("a"), qg("b", "G"), q("c")];
        assert!(detect_group_ranges(&full, &full).is_empty());
    }

    #[test]
    fn test_key_change_closes_range() {
        let full = vec![qg("a", "G"), qg("b", "G"), qg("c", "H"), qg("d", "H"), q("e")];
        let ranges = detect_group_ranges(&full, &full);
        assert_eq!(
            ranges,
            vec![GroupRange { start: 1, end: 2 }, GroupRange { start: 3, end: 4 }]
        );
    }

    #[test]
    fn test_null_key_splits_same_key() {
        let full = vec![qg("a", "G"), qg("b", "G"), q("c"), qg("d", "G"), qg("e", "G")];
        let ranges = detect_group_ranges(&full, &full);
        assert_eq!(
            ranges,
            vec![GroupRange { start: 1, end: 2 }, GroupRange { start: 4, end: 5 }]
        );
    }

    #[test]
    fn test_partially_filtered_group_uses_display_positions() {
        let full = vec![q("a"), q("b"), qg("c", "G"), qg("d", "G"), qg("e", "G"), q("f")];
        // "c" is filtered out; "d" and "e" land at display positions 2 and 3.
        let display = vec![full[0].clone(), full[3].clone(), full[4].clone(), full[5].clone()];
        assert_eq!(
            detect_group_ranges(&display, &full),
            vec![GroupRange { start: 2, end: 3 }]
        );
    }

    #[test]
    fn test_group_with_one_visible_member_is_ignored() {
        let full = vec![qg("a", "G"), qg("b", "G"), q("c")];
        let display = vec![full[1].clone(), full[2].clone()];
        assert!(detect_group_ranges(&display, &full).is_empty());
    }

    #[test]
    fn test_range_starting_at_and_notice() {
        let ranges = vec![GroupRange { start: 2, end: 4 }];
        let range = range_starting_at(&ranges, 2).unwrap();
        assert_eq!(range.question_count(), 3);
        assert!(range.contains(4));
        assert!(range.notice().contains("2 a 4"));
        assert!(range_starting_at(&ranges, 3).is_none());
    }

    #[test]
    fn test_shuffle_keeps_all_questions() {
        let mut questions: Vec<Question> = (0..20).map(|i| q(&i.to_string())).collect();
        let mut rng = StdRng::seed_from_u64(7);
        shuffle_questions(&mut questions, &mut rng);

        let mut ids: Vec<usize> = questions.iter().map(|q| q.id.parse().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_preserving_groups_keeps_runs_contiguous() {
        let questions = vec![
            q("a"),
            qg("b", "G"),
            qg("c", "G"),
            qg("d", "G"),
            q("e"),
            qg("f", "H"),
            qg("g", "H"),
        ];
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let shuffled = shuffle_preserving_groups(questions.clone(), &mut rng);
            assert_eq!(shuffled.len(), questions.len());

            let ids: String = shuffled.iter().map(|q| q.id.as_str()).collect();
            assert!(ids.contains("bcd"), "group G split in {ids}");
            assert!(ids.contains("fg"), "group H split in {ids}");
        }
    }

    fn question_list_strategy() -> impl Strategy<Value = Vec<Question>> {
        prop::collection::vec(prop::option::of(0u8..3), 0..40).prop_map(|keys| {
            keys.into_iter()
                .enumerate()
                .map(|(i, key)| Question {
                    id: format!("q{}", i),
                    text: String::new(),
                    group_key: key.map(|k| format!("g{}", k)),
                })
                .collect()
        })
    }

    proptest! {
        /// Property: ranges are ordered, non-overlapping, within bounds and span >= 2.
        #[test]
        fn prop_ranges_are_well_formed(
            full in question_list_strategy(),
            mask in prop::collection::vec(any::<bool>(), 40),
        ) {
            let display: Vec<Question> = full
                .iter()
                .zip(mask.iter())
                .filter(|(_, keep)| **keep)
                .map(|(q, _)| q.clone())
                .collect();

            let ranges = detect_group_ranges(&display, &full);
            for range in &ranges {
                prop_assert!(range.start < range.end);
                prop_assert!(range.end <= display.len());
            }
            for pair in ranges.windows(2) {
                prop_assert!(pair[0].end < pair[1].start);
            }
        }
    }
}
