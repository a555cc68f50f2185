//! Secondary sort: physical order over `(key, word)`, logical grouping on the
//! key alone.

use std::cmp::Ordering;

use itertools::Itertools;

use crate::record::{GroupKey, Record};

pub type SortCmp = fn(&Record, &Record) -> Ordering;
pub type GroupEq = fn(&Record, &Record) -> bool;

/// Total order used to sort a lane's stream: key first, word as tie-break.
pub fn sort_cmp(a: &Record, b: &Record) -> Ordering {
    a.key()
        .cmp(b.key())
        .then_with(|| a.word().cmp(b.word()))
}

/// Decides where one group ends in a sorted stream. Ignores the word.
pub fn group_eq(a: &Record, b: &Record) -> bool {
    a.key() == b.key()
}

/// All words of one key, in the order they came out of the sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGroup {
    pub key: GroupKey,
    pub words: Vec<String>,
}

pub fn sort_records(records: &mut [Record], cmp: SortCmp) {
    records.sort_by(cmp);
}

/// Splits an already sorted stream into maximal runs of `eq`-equal records.
/// A key with a single record still yields a one-word group.
pub fn group_sorted(records: Vec<Record>, eq: GroupEq) -> Vec<KeyGroup> {
    let mut groups = Vec::new();
    let mut iter = records.into_iter().peekable();
    while let Some(head) = iter.next() {
        let tail = iter
            .peeking_take_while(|next| eq(&head, next))
            .map(Record::into_word)
            .collect_vec();
        let (key, word) = head.into_parts();
        let mut words = Vec::with_capacity(tail.len() + 1);
        words.push(word);
        words.extend(tail);
        groups.push(KeyGroup { key, words });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(word: &str) -> Record {
        Record::from_word(word).unwrap()
    }

    #[test]
    fn sort_orders_by_key_then_word() {
        let mut records = vec![rec("tone"), rec("race"), rec("note"), rec("acre"), rec("care")];
        sort_records(&mut records, sort_cmp);
        let words = records.iter().map(Record::word).collect_vec();
        assert_eq!(words, vec!["acre", "care", "race", "note", "tone"]);
    }

    #[test]
    fn group_comparator_ignores_word() {
        assert!(group_eq(&rec("race"), &rec("care")));
        assert!(!group_eq(&rec("race"), &rec("tone")));
        assert_ne!(sort_cmp(&rec("race"), &rec("care")), Ordering::Equal);
    }

    #[test]
    fn groups_follow_sorted_runs() {
        let mut records = vec![rec("cat"), rec("tone"), rec("race"), rec("note"), rec("care")];
        sort_records(&mut records, sort_cmp);
        let groups = group_sorted(records, group_eq);

        let keys = groups.iter().map(|g| g.key.as_str()).collect_vec();
        assert_eq!(keys, vec!["acer", "act", "enot"]);
        assert_eq!(groups[0].words, vec!["care", "race"]);
        assert_eq!(groups[1].words, vec!["cat"]);
        assert_eq!(groups[2].words, vec!["note", "tone"]);
    }

    #[test]
    fn arrival_order_does_not_matter() {
        let forward = vec![rec("race"), rec("care"), rec("acre")];
        let mut backward = forward.clone();
        backward.reverse();

        let run = |mut records: Vec<Record>| {
            sort_records(&mut records, sort_cmp);
            group_sorted(records, group_eq)
        };
        assert_eq!(run(forward), run(backward));
    }

    #[test]
    fn empty_stream_has_no_groups() {
        assert!(group_sorted(vec![], group_eq).is_empty());
    }
}
