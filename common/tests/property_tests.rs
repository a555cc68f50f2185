//! Property-based tests for the partition/combine/sort/reduce chain.
//!
//! Words are drawn from a tiny alphabet so that anagram collisions and
//! repeated words are frequent.

use std::collections::{BTreeMap, BTreeSet};

use common::{assign_lane, Lane, LaneCount, Record, Workload};
use proptest::prelude::*;

/// Runs the whole chain in process and returns each lane's output lines.
fn run(words: &[String], lanes: usize, workload: Workload) -> Vec<Vec<String>> {
    let lanes = LaneCount::try_from(lanes).unwrap();
    let mut buffers: Vec<Vec<Record>> = lanes.lanes().map(|_| Vec::new()).collect();
    for word in words {
        let record = Record::from_word(word.clone()).unwrap();
        let lane = (workload.partition)(record.key(), lanes);
        buffers[lane].push(record);
    }
    buffers
        .into_iter()
        .enumerate()
        .map(|(index, buffer)| {
            let mut lane = Lane::new(index, workload);
            lane.collect((workload.combine)(buffer)).unwrap();
            let output = lane.run().unwrap();
            output.groups.iter().map(ToString::to_string).collect()
        })
        .collect()
}

fn all_lines(per_lane: Vec<Vec<String>>) -> BTreeSet<String> {
    per_lane.into_iter().flatten().collect()
}

prop_compose! {
    fn arbitrary_words()(words in prop::collection::vec("[a-e]{2,4}", 0..60)) -> Vec<String> {
        words
    }
}

proptest! {
    #[test]
    fn lane_count_does_not_change_groups(words in arbitrary_words(), lanes in 1usize..9) {
        let single = all_lines(run(&words, 1, Workload::default()));
        let many = all_lines(run(&words, lanes, Workload::default()));
        prop_assert_eq!(single, many);
    }

    #[test]
    fn combiner_does_not_change_output(words in arbitrary_words(), lanes in 1usize..9) {
        let with = run(&words, lanes, Workload::default());
        let without = run(&words, lanes, Workload::default().without_combiner());
        prop_assert_eq!(with, without);
    }

    #[test]
    fn rerun_and_reordering_give_identical_output(words in arbitrary_words(), lanes in 1usize..9) {
        let first = run(&words, lanes, Workload::default());
        let second = run(&words, lanes, Workload::default());
        let mut reversed = words.clone();
        reversed.reverse();
        let third = run(&reversed, lanes, Workload::default());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &third);
    }

    #[test]
    fn repeated_words_count_once(words in arbitrary_words(), lanes in 1usize..9) {
        let mut doubled = words.clone();
        doubled.extend(words.iter().cloned());
        prop_assert_eq!(run(&words, lanes, Workload::default()), run(&doubled, lanes, Workload::default()));
    }

    #[test]
    fn every_key_lives_in_one_lane(words in arbitrary_words(), lanes in 1usize..9) {
        let count = LaneCount::try_from(lanes).unwrap();
        let mut owner: BTreeMap<String, usize> = BTreeMap::new();
        for word in &words {
            let record = Record::from_word(word.clone()).unwrap();
            let lane = assign_lane(record.key(), count);
            prop_assert!(lane < lanes);
            let seen = *owner.entry(record.key().to_string()).or_insert(lane);
            prop_assert_eq!(seen, lane);
        }
    }

    #[test]
    fn anagrams_share_exactly_one_group(words in arbitrary_words(), lanes in 1usize..9) {
        let lines = all_lines(run(&words, lanes, Workload::default()));
        let groups: Vec<BTreeSet<String>> = lines
            .iter()
            .map(|line| {
                let (count, members) = line.split_once(' ').unwrap();
                let members: BTreeSet<String> = members.split(',').map(str::to_string).collect();
                assert_eq!(count.parse::<usize>().unwrap(), members.len());
                members
            })
            .collect();

        let distinct: BTreeSet<&String> = words.iter().collect();
        for a in &distinct {
            for b in &distinct {
                if a == b {
                    continue;
                }
                let ka = Record::from_word(a.to_string()).unwrap();
                let kb = Record::from_word(b.to_string()).unwrap();
                let together = groups
                    .iter()
                    .filter(|g| g.contains(*a) && g.contains(*b))
                    .count();
                if ka.key() == kb.key() {
                    prop_assert_eq!(together, 1);
                } else {
                    prop_assert_eq!(together, 0);
                }
            }
        }
    }

    #[test]
    fn lone_words_produce_nothing(word in "[a-z]{2,8}", repeats in 1usize..5, lanes in 1usize..9) {
        let words = vec![word; repeats];
        prop_assert!(all_lines(run(&words, lanes, Workload::default())).is_empty());
    }
}

#[test]
fn worked_example() {
    let words: Vec<String> = ["race", "care", "acre", "tone", "note", "cat"]
        .iter()
        .map(|w| w.to_string())
        .collect();
    let lines = all_lines(run(&words, 8, Workload::default()));
    let expected: BTreeSet<String> = ["3 acre,care,race", "2 note,tone"]
        .iter()
        .map(|l| l.to_string())
        .collect();
    assert_eq!(lines, expected);
}

#[test]
fn empty_input_gives_empty_output() {
    for lanes in [1, 8] {
        let per_lane = run(&[], lanes, Workload::default());
        assert_eq!(per_lane.len(), lanes);
        assert!(per_lane.iter().all(Vec::is_empty));
    }
}
