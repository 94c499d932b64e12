//! Per-call TF-IDF term space.
//!
//! A `TermSpace` is fitted on exactly one corpus and then thrown away. Vocabulary and idf are
//! never shared between fits, so scores from two different fits are not comparable.

use crate::textprep;
use resumerank_core::{Error, Result, TfidfConfig};
use std::collections::BTreeMap;

/// Sparse row: `(column, weight)` pairs sorted by column, zero weights omitted.
pub type SparseRow = Vec<(usize, f64)>;

#[derive(Debug, Clone)]
pub struct TermSpace {
    /// Column -> term, sorted lexicographically (column order == term order).
    terms: Vec<String>,
    idf: Vec<f64>,
    rows: Vec<SparseRow>,
}

fn idf_weight(n_docs: usize, df: usize, smooth: bool) -> f64 {
    let (n, df) = (n_docs as f64, df as f64);
    if smooth {
        ((1.0 + n) / (1.0 + df)).ln() + 1.0
    } else {
        (n / df).ln() + 1.0
    }
}

impl TermSpace {
    /// Fit vocabulary + idf on `corpus` and weight every entry.
    ///
    /// Rows are L2-normalized. Fails with `Error::EmptyVocabulary` when no entry has a term.
    pub fn fit<S: AsRef<str>>(corpus: &[S], cfg: &TfidfConfig) -> Result<Self> {
        let counts: Vec<BTreeMap<String, usize>> = corpus
            .iter()
            .map(|entry| {
                let mut m = BTreeMap::new();
                for t in textprep::tokens(entry.as_ref(), cfg) {
                    *m.entry(t).or_insert(0usize) += 1;
                }
                m
            })
            .collect();

        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for m in &counts {
            for term in m.keys() {
                *df.entry(term.as_str()).or_insert(0) += 1;
            }
        }
        if df.is_empty() {
            return Err(Error::EmptyVocabulary);
        }

        let n_docs = corpus.len();
        let terms: Vec<String> = df.keys().map(|t| t.to_string()).collect();
        let idf: Vec<f64> = df
            .values()
            .map(|&d| idf_weight(n_docs, d, cfg.smooth_idf))
            .collect();
        let column: BTreeMap<&str, usize> = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let rows = counts
            .iter()
            .map(|m| {
                // BTreeMap iteration is term-sorted, so columns come out ascending.
                let mut row: SparseRow = m
                    .iter()
                    .map(|(term, &tf)| {
                        let col = column[term.as_str()];
                        let tf = if cfg.sublinear_tf {
                            1.0 + (tf as f64).ln()
                        } else {
                            tf as f64
                        };
                        (col, tf * idf[col])
                    })
                    .collect();
                let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, w) in row.iter_mut() {
                        *w /= norm;
                    }
                }
                row
            })
            .collect();

        let space = Self { terms, idf, rows };
        tracing::debug!(
            corpus_len = n_docs,
            vocabulary = space.vocabulary_len(),
            "fitted tf-idf term space"
        );
        Ok(space)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.terms.len()
    }

    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        &self.rows[i]
    }

    pub fn term(&self, column: usize) -> &str {
        &self.terms[column]
    }

    /// idf of `term`, if it is in the vocabulary.
    #[cfg(test)]
    fn idf_of(&self, term: &str) -> Option<f64> {
        self.terms
            .binary_search_by(|t| t.as_str().cmp(term))
            .ok()
            .map(|i| self.idf[i])
    }

    pub fn cosine(&self, a: usize, b: usize) -> f64 {
        cosine(&self.rows[a], &self.rows[b])
    }

    /// Terms present in both rows, strongest contribution to `row(a) · row(b)` first.
    pub fn shared_terms(&self, a: usize, b: usize, top_k: usize) -> Vec<(&str, f64)> {
        let mut shared: Vec<(&str, f64)> = merge_join(&self.rows[a], &self.rows[b])
            .map(|(col, wa, wb)| (self.terms[col].as_str(), wa * wb))
            .collect();
        shared.sort_by(|x, y| {
            y.1.partial_cmp(&x.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| x.0.cmp(y.0))
        });
        shared.truncate(top_k);
        shared
    }
}

/// Pairs of weights for columns present in both sorted rows.
fn merge_join<'a>(
    a: &'a [(usize, f64)],
    b: &'a [(usize, f64)],
) -> impl Iterator<Item = (usize, f64, f64)> + 'a {
    let mut i = 0usize;
    let mut j = 0usize;
    std::iter::from_fn(move || {
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    let out = (a[i].0, a[i].1, b[j].1);
                    i += 1;
                    j += 1;
                    return Some(out);
                }
            }
        }
        None
    })
}

/// `(a·b) / (‖a‖‖b‖)` over sparse rows, 0 when either side has zero magnitude.
///
/// Identical rows give exactly 1.0: the dot product and both squared norms are summed in the
/// same order, and `sqrt(x * x) == x` for finite floats.
pub fn cosine(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let na: f64 = a.iter().map(|(_, w)| w * w).sum();
    let nb: f64 = b.iter().map(|(_, w)| w * w).sum();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let dot: f64 = merge_join(a, b).map(|(_, wa, wb)| wa * wb).sum();
    (dot / (na * nb).sqrt()).clamp(0.0, 1.0)
}
