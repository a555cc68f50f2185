use itertools::Itertools;

use crate::record::Record;

/// Drops repeated `(key, word)` pairs from one lane buffer, keeping the first
/// occurrence of each. Keys are never merged or lost: a key with at least one
/// record still has at least one afterwards.
///
/// Running it is optional. Skipping it only costs volume.
pub fn combine(records: Vec<Record>) -> Vec<Record> {
    records.into_iter().unique().collect_vec()
}

/// Stand-in for [`combine`] when the combiner is switched off.
pub fn pass_through(records: Vec<Record>) -> Vec<Record> {
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(word: &str) -> Record {
        Record::from_word(word).unwrap()
    }

    #[test]
    fn removes_duplicate_pairs_only() {
        let input = vec![rec("race"), rec("care"), rec("race"), rec("tone"), rec("race")];
        let out = combine(input);
        let words = out.iter().map(Record::word).collect_vec();
        assert_eq!(words, vec!["race", "care", "tone"]);
    }

    #[test]
    fn keeps_every_key() {
        let input = vec![rec("cat"), rec("cat"), rec("dog")];
        let out = combine(input);
        let keys = out.iter().map(|r| r.key().as_str()).collect_vec();
        assert_eq!(keys, vec!["act", "dgo"]);
    }

    #[test]
    fn empty_stays_empty() {
        assert!(combine(vec![]).is_empty());
    }
}
