//! Normalizer for the anagram job: splits text into tokens, drops stop words,
//! and turns each remaining token into a `(groupKey, word)` pair.

use std::collections::HashSet;

use common::{App, GroupKey, Workload};
use itertools::Itertools;
use once_cell::sync::Lazy;

const STOP_WORDS: &str = "'tis,'twas,a,able,about,across,after,ain't,all,almost,also,am,among,an,\
and,any,are,aren't,as,at,be,because,been,but,by,can,can't,cannot,could,could've,couldn't,dear,did,\
didn't,do,does,doesn't,don't,either,else,ever,every,for,from,get,got,had,has,hasn't,have,he,he'd,\
he'll,he's,her,hers,him,his,how,how'd,how'll,how's,however,i,i'd,i'll,i'm,i've,if,in,into,is,isn't,\
it,it's,its,just,least,let,like,likely,may,me,might,might've,mightn't,most,must,must've,mustn't,my,\
neither,no,nor,not,of,off,often,on,only,or,other,our,own,rather,said,say,says,shan't,she,she'd,\
she'll,she's,should,should've,shouldn't,since,so,some,than,that,that'll,that's,the,their,them,then,\
there,there's,these,they,they'd,they'll,they're,they've,this,tis,to,too,twas,us,wants,was,wasn't,we,\
we'd,we'll,we're,were,weren't,what,what'd,what's,when,when'd,when'll,when's,where,where'd,where'll,\
where's,which,while,who,who'd,who'll,who's,whom,why,why'd,why'll,why's,will,with,won't,would,\
would've,wouldn't,yet,you,you'd,you'll,you're,you've,your";

/// Built on first use, never modified.
static STOP_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOP_WORDS.split(',').collect());

pub const APP_NAME: &str = "anagram";

pub fn is_stop_word(token: &str) -> bool {
    let lowered = token.to_lowercase();
    let trimmed = lowered.trim_matches(|c: char| c.is_ascii_punctuation() && c != '\'');
    STOP_SET.contains(trimmed)
}

/// Lowercase letters-only form of a token, or `None` if it is a stop word or
/// ends up shorter than two letters.
pub fn normalize(token: &str) -> Option<String> {
    if is_stop_word(token) {
        return None;
    }
    let word: String = token
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    (word.len() > 1).then_some(word)
}

pub fn map(_filename: &str, contents: &str) -> Vec<(String, String)> {
    contents
        .split_whitespace()
        .filter_map(normalize)
        .filter_map(|word| GroupKey::of(&word).map(|key| (key.to_string(), word)))
        .collect_vec()
}

pub fn app() -> App {
    App::new(APP_NAME, map, Workload::default())
}
