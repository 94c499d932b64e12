//! Minimal, deterministic text normalization helpers.
//!
//! Terms are maximal runs of word characters (alphanumeric or `_`); everything else is a
//! separator. This is the default word split of the classic TF-IDF vectorizer: no stemming,
//! no language detection.

use resumerank_core::{StopWords, TfidfConfig};

/// Common English function words. Only consulted when `StopWords::English` is selected.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "etc",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it",
    "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now",
    "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out",
    "over", "own", "same", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would",
    "you", "your", "yours", "yourself", "yourselves",
];

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

pub fn is_stop_word(term: &str, stop_words: StopWords) -> bool {
    match stop_words {
        StopWords::None => false,
        StopWords::English => ENGLISH_STOP_WORDS.contains(&term),
    }
}

/// Split `s` into terms according to `cfg`, in document order (duplicates kept).
pub fn tokens(s: &str, cfg: &TfidfConfig) -> Vec<String> {
    let min_chars = cfg.min_token_chars.max(1);
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut cur_chars = 0usize;

    let mut flush = |cur: &mut String, cur_chars: &mut usize| {
        if *cur_chars >= min_chars && !is_stop_word(cur, cfg.stop_words) {
            out.push(std::mem::take(cur));
        } else {
            cur.clear();
        }
        *cur_chars = 0;
    };

    for ch in s.chars() {
        if is_word_char(ch) {
            if cfg.lowercase {
                cur.extend(ch.to_lowercase());
            } else {
                cur.push(ch);
            }
            cur_chars += 1;
        } else if cur_chars > 0 {
            flush(&mut cur, &mut cur_chars);
        }
    }
    if cur_chars > 0 {
        flush(&mut cur, &mut cur_chars);
    }
    out
}
