/*!
 * Text analysis for the full-text index.
 *
 * The analyzer mirrors the index tokenizer (`unicode61`): text is split on
 * anything that is not a letter or digit and lower-cased. On top of that it
 * drops stop words and single-character tokens, which is what key-term
 * extraction and glossary lookups work with.
 */

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;

/// Common English words carrying no meaning for lookups
pub static IGNORE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
        "it", "no", "not", "of", "on", "or", "s", "such", "t", "that", "the", "their", "then",
        "there", "these", "they", "this", "to", "was", "will", "with",
    ]
    .into_iter()
    .collect()
});

/// Words ignored when looking up similar messages, a superset of `IGNORE_WORDS`
///
/// Includes markup noise that shows up in web application strings.
pub static IGNORE_SIMILAR: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut words: HashSet<&'static str> = [
        "also", "class", "href", "http", "me", "most", "net", "per", "span", "their", "theirs",
        "you", "your", "yours", "www",
    ]
    .into_iter()
    .collect();
    words.extend(IGNORE_WORDS.iter().copied());
    words
});

/// Split text into lower-cased word tokens
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Tokens with stop words and single characters removed, in text order
pub fn analyze(text: &str) -> Vec<String> {
    tokenize(text)
        .filter(|t| t.chars().count() > 1 && !IGNORE_WORDS.contains(t.as_str()))
        .collect()
}

/// Occurrences of each analyzed term in the text
pub fn term_frequencies(text: &str) -> BTreeMap<String, usize> {
    let mut freqs = BTreeMap::new();
    for term in analyze(text) {
        *freqs.entry(term).or_insert(0) += 1;
    }
    freqs
}

/// Bose-Einstein (Bo1) informativeness of a term
///
/// `tf` is the frequency in the text being analyzed, `cf` the frequency in
/// the indexed collection and `docs` the number of indexed documents.
pub fn bo1_weight(tf: usize, cf: i64, docs: i64) -> f64 {
    if cf <= 0 || docs <= 0 {
        return 0.0;
    }
    let f = cf as f64 / docs as f64;
    tf as f64 * ((1.0 + f) / f).log2() + (1.0 + f).log2()
}

/// Pick the `limit` best scored terms, highest first, ties alphabetically
pub fn top_terms(mut scored: Vec<(String, f64)>, limit: usize) -> Vec<(String, f64)> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(limit);
    scored
}

/// All `k` sized combinations of `items`, in lexicographic index order
pub fn combinations<T: Clone>(items: &[T], k: usize) -> Vec<Vec<T>> {
    let n = items.len();
    if k == 0 || k > n {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut indices: Vec<usize> = (0..k).collect();
    loop {
        result.push(indices.iter().map(|&i| items[i].clone()).collect());

        // Rightmost index that can still move forward
        let Some(pos) = (0..k).rev().find(|&i| indices[i] != i + n - k) else {
            break;
        };
        indices[pos] += 1;
        for j in pos + 1..k {
            indices[j] = indices[j - 1] + 1;
        }
    }
    result
}
