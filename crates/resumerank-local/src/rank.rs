//! Query-vs-documents similarity ranking.
//!
//! The corpus is always `[query] + documents`: row 0 is the query, row `i + 1` is
//! `documents[i]`. Output is index-aligned with `documents` and never sorted here.

use crate::tfidf::TermSpace;
use resumerank_core::{Error, Result, TfidfConfig};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedTerm {
    pub term: String,
    /// This term's share of the (unnormalized) dot product.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDocument {
    pub score: f64,
    pub matched_terms: Vec<MatchedTerm>,
}

fn fit_corpus<S: AsRef<str>>(
    query: &str,
    documents: &[S],
    cfg: &TfidfConfig,
) -> Result<TermSpace> {
    let mut corpus: Vec<&str> = Vec::with_capacity(documents.len() + 1);
    corpus.push(query);
    corpus.extend(documents.iter().map(|d| d.as_ref()));

    let space = TermSpace::fit(&corpus, cfg)?;
    if space.row(0).is_empty() {
        return Err(Error::EmptyQuery);
    }
    if !documents.is_empty() && (1..space.n_rows()).all(|i| space.row(i).is_empty()) {
        return Err(Error::NoDocumentTerms);
    }
    Ok(space)
}

/// Cosine similarity of each document to the query, in input order.
///
/// Fails on a degenerate space: no terms at all, a query without terms, or a batch in which
/// no document has a term.
pub fn rank<S: AsRef<str>>(query: &str, documents: &[S], cfg: &TfidfConfig) -> Result<Vec<f64>> {
    let space = fit_corpus(query, documents, cfg)?;
    Ok((1..space.n_rows()).map(|i| space.cosine(0, i)).collect())
}

/// Like [`rank`], plus the `explain_top_k` strongest query terms found in each document.
pub fn rank_detailed<S: AsRef<str>>(
    query: &str,
    documents: &[S],
    cfg: &TfidfConfig,
    explain_top_k: usize,
) -> Result<Vec<RankedDocument>> {
    let space = fit_corpus(query, documents, cfg)?;
    Ok((1..space.n_rows())
        .map(|i| RankedDocument {
            score: space.cosine(0, i),
            matched_terms: space
                .shared_terms(0, i, explain_top_k)
                .into_iter()
                .map(|(term, weight)| MatchedTerm {
                    term: term.to_string(),
                    weight,
                })
                .collect(),
        })
        .collect())
}

/// [`rank`] with the batch failure policy applied: a failed ranking is logged and yields an
/// empty sequence. Callers must read "empty" as "no ranking possible".
pub fn rank_or_empty<S: AsRef<str>>(
    query: &str,
    documents: &[S],
    cfg: &TfidfConfig,
) -> Vec<f64> {
    match rank(query, documents, cfg) {
        Ok(scores) => scores,
        Err(e) => {
            tracing::error!(
                documents = documents.len(),
                kind = e.kind(),
                error = %e,
                "ranking failed"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cfg() -> TfidfConfig {
        TfidfConfig::default()
    }

    #[test]
    fn self_similarity_is_exactly_one() {
        for q in [
            "rust",
            "senior backend engineer distributed systems",
            "Kafka, Kafka and more KAFKA!",
        ] {
            assert_eq!(rank(q, &[q], &cfg()).unwrap(), vec![1.0], "q={q:?}");
        }
    }

    #[test]
    fn end_to_end_backend_vs_designer() {
        let query = "senior backend engineer distributed systems";
        let docs = [
            "senior backend engineer with distributed systems experience",
            "graphic designer with illustration skills",
        ];
        let scores = rank(query, &docs, &cfg()).unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores[0] > scores[1]);
        assert!(scores[0] > 0.3, "scores={scores:?}");
        assert!(scores[1].abs() < 1e-12, "scores={scores:?}");
    }

    #[test]
    fn disjoint_vocabulary_scores_zero() {
        let scores = rank("rust tokio", &["watercolor painting"], &cfg()).unwrap();
        assert_eq!(scores, vec![0.0]);
    }

    #[test]
    fn empty_document_in_batch_scores_zero_and_keeps_position() {
        let docs = ["rust engineer", "", "rust"];
        let scores = rank("rust engineer", &docs, &cfg()).unwrap();
        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0], 1.0);
        assert_eq!(scores[1], 0.0);
        assert!(scores[2] > 0.0 && scores[2] < 1.0);
    }

    #[test]
    fn degenerate_batches_are_ranking_failures() {
        let err = rank("", &["", "", ""], &cfg()).unwrap_err();
        assert!(matches!(err, Error::EmptyVocabulary));

        let err = rank("senior engineer", &["", "", ""], &cfg()).unwrap_err();
        assert!(matches!(err, Error::NoDocumentTerms));

        let err = rank("", &["senior engineer", "designer"], &cfg()).unwrap_err();
        assert!(matches!(err, Error::EmptyQuery));
        assert_eq!(err.kind(), "ranking_failure");
    }

    #[test]
    fn rank_or_empty_returns_empty_on_failure() {
        assert!(rank_or_empty("q", &["", "", ""], &cfg()).is_empty());
        assert!(rank_or_empty("", &["python developer"], &cfg()).is_empty());
        assert_eq!(rank_or_empty("python", &["python"], &cfg()), vec![1.0]);
    }

    #[test]
    fn no_documents_is_an_empty_success() {
        let docs: [&str; 0] = [];
        assert_eq!(rank("rust", &docs, &cfg()).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn scores_depend_on_the_batch() {
        // Same query and document, different neighbours: idf changes, so does the score.
        let q = "rust kafka";
        let alone = rank(q, &["rust kafka postgres"], &cfg()).unwrap()[0];
        let crowded = rank(
            q,
            &["rust kafka postgres", "rust", "rust java", "rust go"],
            &cfg(),
        )
        .unwrap()[0];
        assert!((alone - crowded).abs() > 1e-6, "alone={alone} crowded={crowded}");
    }

    #[test]
    fn rank_detailed_explains_shared_terms() {
        let ranked = rank_detailed(
            "rust kafka engineer",
            &["kafka and rust engineer", "chef"],
            &cfg(),
            2,
        )
        .unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].matched_terms.len(), 2);
        assert!(ranked[1].matched_terms.is_empty());
        assert_eq!(ranked[1].score, 0.0);
        let plain = rank(
            "rust kafka engineer",
            &["kafka and rust engineer", "chef"],
            &cfg(),
        )
        .unwrap();
        assert_eq!(plain[0], ranked[0].score);
    }

    proptest! {
        #[test]
        fn output_is_index_aligned_and_bounded(
            docs in prop::collection::vec("[a-d ]{0,24}", 0..8),
        ) {
            let query = "ab cd bd";
            if let Ok(scores) = rank(query, &docs, &cfg()) {
                prop_assert_eq!(scores.len(), docs.len());
                for (d, s) in docs.iter().zip(&scores) {
                    prop_assert!((0.0..=1.0).contains(s));
                    if crate::textprep::tokens(d, &cfg()).is_empty() {
                        prop_assert_eq!(*s, 0.0);
                    }
                }
            }
        }

        #[test]
        fn query_is_always_identical_to_its_copy(q in "[a-z]{2,8}( [a-z]{2,8}){0,6}") {
            let scores = rank(&q, &[q.as_str(), "zzzz yyyy"], &cfg()).unwrap();
            prop_assert_eq!(scores[0], 1.0);
        }
    }
}
