use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("extraction failed for {label}: {reason}")]
    Extraction { label: String, reason: String },
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("empty vocabulary: no corpus entry contains a term")]
    EmptyVocabulary,
    #[error("query contains no terms")]
    EmptyQuery,
    #[error("no document contains a term")]
    NoDocumentTerms,
    #[error("ranking timed out after {0}ms")]
    Timeout(u64),
}

impl Error {
    /// Coarse failure class: `extraction_failure` (per document) or `ranking_failure` (per batch).
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Extraction { .. } | Error::UnsupportedFormat(_) => "extraction_failure",
            Error::EmptyVocabulary
            | Error::EmptyQuery
            | Error::NoDocumentTerms
            | Error::Timeout(_) => "ranking_failure",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// One uploaded document: raw bytes plus the caller's label (usually a file name).
///
/// The label is passed through unchanged; nothing here derives identity from the bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub label: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Optional MIME hint (e.g. `application/pdf`). Bytes are sniffed when absent.
    pub content_type: Option<String>,
}

impl DocumentInput {
    pub fn new(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            bytes,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A document readable as an ordered sequence of pages.
///
/// Page-level failures are reported per page so callers can skip them without losing the
/// rest of the document.
pub trait PagedDocument {
    fn page_count(&self) -> usize;
    /// Text of page `index` (0-based).
    fn page_text(&self, index: usize) -> Result<String>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub engine: &'static str,
    pub text: String,
    pub pages_total: usize,
    /// Pages that contributed non-empty text.
    pub pages_used: usize,
    pub warnings: Vec<&'static str>,
}

impl ExtractedText {
    pub fn empty(engine: &'static str) -> Self {
        Self {
            engine,
            text: String::new(),
            pages_total: 0,
            pages_used: 0,
            warnings: Vec::new(),
        }
    }

    pub fn text_chars(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopWords {
    #[default]
    None,
    English,
}

impl std::str::FromStr for StopWords {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(StopWords::None),
            "english" | "en" => Ok(StopWords::English),
            other => Err(format!("unknown stop word list: {other} (allowed: none, english)")),
        }
    }
}

/// Term weighting knobs. Defaults match the classic TF-IDF vectorizer setup:
/// raw counts, smoothed idf, tokens of two or more word characters, lowercased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TfidfConfig {
    /// Replace tf with `1 + ln(tf)`.
    pub sublinear_tf: bool,
    /// `idf = ln((1 + n) / (1 + df)) + 1` when true, `ln(n / df) + 1` otherwise.
    pub smooth_idf: bool,
    pub min_token_chars: usize,
    pub stop_words: StopWords,
    pub lowercase: bool,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            sublinear_tf: false,
            smooth_idf: true,
            min_token_chars: 2,
            stop_words: StopWords::None,
            lowercase: true,
        }
    }
}

/// A label paired with its similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub label: String,
    /// Cosine similarity in [0, 1].
    pub score: f64,
    /// `score` scaled to [0, 100] and rounded to two decimals (display only).
    pub percent: f64,
}

/// Scale a [0, 1] similarity to a percentage rounded to two decimals.
pub fn to_percent(score: f64) -> f64 {
    (score * 100.0 * 100.0).round() / 100.0
}

/// Pair labels with scores by position.
///
/// An empty `scores` (failed ranking) yields an empty list rather than zero-filled rows.
pub fn pair_scores<S: AsRef<str>>(labels: &[S], scores: &[f64]) -> Vec<ScoredCandidate> {
    labels
        .iter()
        .zip(scores.iter())
        .map(|(label, &score)| ScoredCandidate {
            label: label.as_ref().to_string(),
            score,
            percent: to_percent(score),
        })
        .collect()
}

/// Anything carrying a similarity score that a presentation layer may sort on.
pub trait Scored {
    fn score(&self) -> f64;
}

impl Scored for ScoredCandidate {
    fn score(&self) -> f64 {
        self.score
    }
}

/// Stable sort: score descending, ties keep input order.
pub fn sort_by_score_desc<T: Scored>(items: &mut [T]) {
    items.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
