use std::{collections::BTreeSet, fmt};

use itertools::Itertools;

use crate::record::GroupKey;

pub type ReduceFn = fn(&GroupKey, Vec<String>) -> Option<AnagramGroup>;

/// Smallest number of distinct words that makes a group worth emitting.
pub const MIN_GROUP_SIZE: usize = 2;

/// Distinct words sharing one key, in lexicographic order.
///
/// Built once per group and never modified afterwards. The key is kept for
/// ordering and diagnostics; only the count and the words are written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnagramGroup {
    key: GroupKey,
    words: Vec<String>,
}

impl AnagramGroup {
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Number of distinct words. Not an identifier: unrelated groups can
    /// share a count.
    pub fn count(&self) -> usize {
        self.words.len()
    }

    /// Words joined with `,`, no trailing separator.
    pub fn joined(&self) -> String {
        self.words.iter().join(",")
    }
}

impl fmt::Display for AnagramGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count(), self.joined())
    }
}

/// Reduces all words seen for `key`: dedup, sort, and keep the group only if
/// it holds at least [`MIN_GROUP_SIZE`] distinct words.
pub fn reduce(key: &GroupKey, words: Vec<String>) -> Option<AnagramGroup> {
    let unique: BTreeSet<String> = words.into_iter().collect();
    if unique.len() < MIN_GROUP_SIZE {
        return None;
    }
    Some(AnagramGroup {
        key: key.clone(),
        words: unique.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> GroupKey {
        GroupKey::parse(s).unwrap()
    }

    fn words(ws: &[&str]) -> Vec<String> {
        ws.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn emits_sorted_distinct_words() {
        let group = reduce(&key("acer"), words(&["race", "care", "acre"])).unwrap();
        assert_eq!(group.count(), 3);
        assert_eq!(group.joined(), "acre,care,race");
        assert_eq!(group.to_string(), "3 acre,care,race");
    }

    #[test]
    fn duplicates_count_once() {
        let group = reduce(&key("enot"), words(&["tone", "note", "tone", "tone"])).unwrap();
        assert_eq!(group.count(), 2);
        assert_eq!(group.to_string(), "2 note,tone");
    }

    #[test]
    fn single_word_is_dropped() {
        assert!(reduce(&key("act"), words(&["cat"])).is_none());
        assert!(reduce(&key("act"), words(&["cat", "cat", "cat"])).is_none());
        assert!(reduce(&key("act"), vec![]).is_none());
    }
}
