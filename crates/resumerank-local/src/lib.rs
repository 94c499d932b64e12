use futures_util::stream::{self, StreamExt};
use resumerank_core::{
    pair_scores, DocumentInput, Error, ExtractedText, Result, Scored, ScoredCandidate, TfidfConfig,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

pub mod extract;
pub mod rank;
pub mod textprep;
pub mod tfidf;

/// Hex SHA-256 of the raw upload. Equal digests mean the same file was uploaded twice.
pub fn content_sha256(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// One document after extraction, still carrying its caller-supplied label.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    pub label: String,
    pub sha256: String,
    pub bytes: usize,
    #[serde(flatten)]
    pub extracted: ExtractedText,
}

fn extract_one(input: &DocumentInput) -> ExtractedDocument {
    ExtractedDocument {
        label: input.label.clone(),
        sha256: content_sha256(&input.bytes),
        bytes: input.bytes.len(),
        extracted: extract::extract_or_empty(input),
    }
}

/// Extract every document in order, one after another.
pub fn extract_all(inputs: &[DocumentInput]) -> Vec<ExtractedDocument> {
    inputs.iter().map(extract_one).collect()
}

/// Extract every document on the blocking pool, at most `jobs` at a time.
///
/// Output order always matches `inputs`. A worker that dies still yields an (empty) entry so
/// positions never shift.
pub async fn extract_batch(inputs: Vec<DocumentInput>, jobs: usize) -> Vec<ExtractedDocument> {
    let jobs = jobs.clamp(1, 64);
    stream::iter(inputs)
        .map(|input| async move {
            let label = input.label.clone();
            let bytes = input.bytes.len();
            match tokio::task::spawn_blocking(move || extract_one(&input)).await {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::error!(label = %label, error = %e, "extraction worker failed");
                    let mut extracted = ExtractedText::empty("none");
                    extracted.warnings.push("extraction_failed");
                    ExtractedDocument {
                        label,
                        sha256: String::new(),
                        bytes,
                        extracted,
                    }
                }
            }
        })
        .buffered(jobs)
        .collect()
        .await
}

/// A scored candidate plus what the extractor and the ranker saw.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenedCandidate {
    #[serde(flatten)]
    pub candidate: ScoredCandidate,
    pub matched_terms: Vec<rank::MatchedTerm>,
    pub engine: &'static str,
    pub text_chars: usize,
    pub sha256: String,
    pub warnings: Vec<&'static str>,
}

impl Scored for ScreenedCandidate {
    fn score(&self) -> f64 {
        self.candidate.score
    }
}

/// Result of one screening batch. `candidates` is in input order and is empty when no ranking
/// was possible (`ranked == false`).
#[derive(Debug, Clone, Serialize)]
pub struct Screening {
    pub ranked: bool,
    pub failure: Option<String>,
    pub candidates: Vec<ScreenedCandidate>,
}

impl Screening {
    fn failed(e: &Error, documents: usize) -> Self {
        tracing::error!(documents, kind = e.kind(), error = %e, "ranking failed");
        Self {
            ranked: false,
            failure: Some(e.to_string()),
            candidates: Vec::new(),
        }
    }
}

fn screen_result(
    query: &str,
    docs: &[ExtractedDocument],
    cfg: &TfidfConfig,
    explain_top_k: usize,
) -> Result<Vec<ScreenedCandidate>> {
    let texts: Vec<&str> = docs.iter().map(|d| d.extracted.text.as_str()).collect();
    let ranked = rank::rank_detailed(query, &texts, cfg, explain_top_k)?;
    let scores: Vec<f64> = ranked.iter().map(|r| r.score).collect();
    let labels: Vec<&str> = docs.iter().map(|d| d.label.as_str()).collect();

    Ok(pair_scores(&labels, &scores)
        .into_iter()
        .zip(ranked)
        .zip(docs)
        .map(|((candidate, r), doc)| ScreenedCandidate {
            candidate,
            matched_terms: r.matched_terms,
            engine: doc.extracted.engine,
            text_chars: doc.extracted.text_chars(),
            sha256: doc.sha256.clone(),
            warnings: doc.extracted.warnings.clone(),
        })
        .collect())
}

/// Rank extracted documents against `query` in one batch.
pub fn screen(
    query: &str,
    docs: &[ExtractedDocument],
    cfg: &TfidfConfig,
    explain_top_k: usize,
) -> Screening {
    match screen_result(query, docs, cfg, explain_top_k) {
        Ok(candidates) => Screening {
            ranked: true,
            failure: None,
            candidates,
        },
        Err(e) => Screening::failed(&e, docs.len()),
    }
}

/// [`screen`] on the blocking pool, bounded by `timeout` for the whole ranking call.
pub async fn screen_with_timeout(
    query: String,
    docs: Vec<ExtractedDocument>,
    cfg: TfidfConfig,
    explain_top_k: usize,
    timeout: Option<Duration>,
) -> Screening {
    let n = docs.len();
    let task =
        tokio::task::spawn_blocking(move || screen_result(&query, &docs, &cfg, explain_top_k));
    let joined = match timeout {
        Some(t) => match tokio::time::timeout(t, task).await {
            Ok(j) => j,
            Err(_) => {
                return Screening::failed(&Error::Timeout(t.as_millis() as u64), n);
            }
        },
        None => task.await,
    };
    match joined {
        Ok(Ok(candidates)) => Screening {
            ranked: true,
            failure: None,
            candidates,
        },
        Ok(Err(e)) => Screening::failed(&e, n),
        Err(e) => {
            tracing::error!(error = %e, "ranking worker failed");
            Screening {
                ranked: false,
                failure: Some(format!("ranking worker failed: {e}")),
                candidates: Vec::new(),
            }
        }
    }
}
