use std::fmt;

use crate::error::{MalformedReason, MalformedRecord};

/// Canonical signature of a word: its letters sorted ascending.
///
/// Always lowercase ASCII, at least two letters long, and already in
/// ascending order, so every anagram of a word maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey(String);

impl GroupKey {
    /// Derives the key of a normalized word. Returns `None` when the word is
    /// shorter than two letters or contains anything but `a-z`.
    pub fn of(word: &str) -> Option<Self> {
        if word.len() < 2 || !word.bytes().all(|b| b.is_ascii_lowercase()) {
            return None;
        }
        let mut letters = word.as_bytes().to_vec();
        letters.sort_unstable();
        // only ascii lowercase bytes, always valid utf-8
        String::from_utf8(letters).ok().map(Self)
    }

    /// Accepts an already computed key after checking its shape.
    pub fn parse(key: &str) -> Result<Self, MalformedReason> {
        if key.len() < 2 {
            return Err(MalformedReason::KeyTooShort);
        }
        if !key.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(MalformedReason::KeyNotLowercaseAscii);
        }
        if !key.as_bytes().windows(2).all(|w| w[0] <= w[1]) {
            return Err(MalformedReason::KeyNotSorted);
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One `(groupKey, word)` pair flowing through the pipeline.
///
/// Fields are private: a `Record` can only be built through [`Record::new`]
/// or [`Record::from_word`], both of which guarantee that the key is the
/// sorted letters of the word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    key: GroupKey,
    word: String,
}

impl Record {
    /// Validates a pair produced by the normalizer.
    pub fn new(key: impl Into<String>, word: impl Into<String>) -> Result<Self, MalformedRecord> {
        let key = key.into();
        let word = word.into();
        let parsed = match GroupKey::parse(&key) {
            Ok(parsed) => parsed,
            Err(reason) => return Err(MalformedRecord { key, word, reason }),
        };
        match GroupKey::of(&word) {
            Some(expected) if expected == parsed => Ok(Self { key: parsed, word }),
            _ => Err(MalformedRecord {
                key,
                word,
                reason: MalformedReason::KeyMismatch,
            }),
        }
    }

    pub fn from_word(word: impl Into<String>) -> Option<Self> {
        let word = word.into();
        GroupKey::of(&word).map(|key| Self { key, word })
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn into_word(self) -> String {
        self.word
    }

    pub fn into_parts(self) -> (GroupKey, String) {
        (self.key, self.word)
    }
}

impl TryFrom<(String, String)> for Record {
    type Error = MalformedRecord;

    fn try_from((key, word): (String, String)) -> Result<Self, Self::Error> {
        Self::new(key, word)
    }
}
