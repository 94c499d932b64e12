use resumerank_core::{DocumentInput, Error, ExtractedText, PagedDocument, Result};

/// Width handed to html2text. Line wrapping is irrelevant for term weighting, so keep it wide.
const HTML_WIDTH: usize = 200;

/// Convert HTML to readable plain text.
pub fn html_to_text(html: &str, width: usize) -> String {
    html2text::from_read(html.as_bytes(), width).unwrap_or_else(|_| html.to_string())
}

fn has_any_text(s: &str) -> bool {
    s.chars().any(|c| !c.is_whitespace())
}

/// Best-effort sniff for PDF bytes (magic header).
pub fn bytes_look_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Best-effort guess for whether bytes are HTML-ish.
pub fn bytes_look_like_html(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let rest = &bytes[start..];
    rest.starts_with(b"<!doctype")
        || rest.starts_with(b"<!DOCTYPE")
        || rest.starts_with(b"<html")
        || rest.starts_with(b"<HTML")
        || rest.starts_with(b"<head")
        || rest.starts_with(b"<body")
}

/// Best-effort sniff for common image formats (scanned resumes uploaded as pictures).
pub fn bytes_look_like_image(bytes: &[u8]) -> bool {
    bytes.starts_with(b"\x89PNG\r\n\x1a\n")
        || bytes.starts_with(b"\xff\xd8\xff")
        || bytes.starts_with(b"GIF87a")
        || bytes.starts_with(b"GIF89a")
        || bytes.starts_with(b"II*\x00")
        || bytes.starts_with(b"MM\x00*")
        || (bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP")
}

/// NUL bytes near the start mean "binary we don't understand", not text.
fn bytes_look_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(1024).any(|&b| b == 0)
}

fn content_type_lc_prefix(ct: Option<&str>) -> String {
    ct.unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

fn strip_tag_blocks(html: &str, tag: &str) -> String {
    // Only removes a block when its close tag is found; ASCII-case-insensitive on tag names.
    let open_pat = format!("<{}", tag.to_ascii_lowercase());
    let close_pat = format!("</{}>", tag.to_ascii_lowercase());

    let mut out = String::new();
    let mut i = 0usize;
    let lower = html.to_ascii_lowercase();
    while let Some(rel_start) = lower[i..].find(&open_pat) {
        let start = i + rel_start;
        let after_open = start + open_pat.len();
        let Some(rel_end) = lower[after_open..].find(&close_pat) else {
            break;
        };
        out.push_str(&html[i..start]);
        i = after_open + rel_end + close_pat.len();
    }
    out.push_str(&html[i..]);
    out
}

/// A document that is a single page (plain text, rendered HTML).
#[derive(Debug, Clone)]
pub struct SinglePage(pub String);

impl PagedDocument for SinglePage {
    fn page_count(&self) -> usize {
        1
    }

    fn page_text(&self, index: usize) -> Result<String> {
        if index == 0 {
            Ok(self.0.clone())
        } else {
            Err(Error::Extraction {
                label: format!("page {}", index + 1),
                reason: "page out of range".to_string(),
            })
        }
    }
}

/// A PDF loaded with lopdf; text is pulled one page at a time.
pub struct PdfPages {
    doc: lopdf::Document,
    page_numbers: Vec<u32>,
}

impl PdfPages {
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| Error::Extraction {
            label: "pdf".to_string(),
            reason: format!("failed to load PDF: {e}"),
        })?;
        // `get_pages` is keyed by 1-based page number, already in page order.
        let page_numbers = doc.get_pages().keys().copied().collect();
        Ok(Self { doc, page_numbers })
    }
}

impl PagedDocument for PdfPages {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        let Some(&page_number) = self.page_numbers.get(index) else {
            return Err(Error::Extraction {
                label: format!("page {}", index + 1),
                reason: "page out of range".to_string(),
            });
        };
        self.doc
            .extract_text(&[page_number])
            .map_err(|e| Error::Extraction {
                label: format!("page {page_number}"),
                reason: e.to_string(),
            })
    }
}

/// Pages that went into a joined text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinedPages {
    pub text: String,
    pub pages_total: usize,
    pub pages_used: usize,
    pub pages_failed: usize,
}

/// Join the text of every page that yields some, separated by single spaces, in page order.
///
/// Failed and blank pages are skipped; they never fail the document. Each page is trimmed
/// before joining, so `text` carries no page-edge whitespace.
pub fn join_pages(doc: &dyn PagedDocument) -> JoinedPages {
    let pages_total = doc.page_count();
    let mut pages_failed = 0usize;
    let texts: Vec<String> = (0..pages_total)
        .filter_map(|i| match doc.page_text(i) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(page = i + 1, error = %e, "skipping page without extractable text");
                pages_failed += 1;
                None
            }
        })
        .map(|t| t.trim().to_string())
        .filter(|t| has_any_text(t))
        .collect();
    JoinedPages {
        pages_used: texts.len(),
        text: texts.join(" "),
        pages_total,
        pages_failed,
    }
}

/// Whole-document fallback via `pdf-extract` (split by pages so blank pages can still be dropped).
fn pdf_to_pages_fallback(bytes: &[u8]) -> FallbackPages {
    // pdf-extract can panic on malformed input; keep a bad upload from taking the batch down.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("pdf-extract panicked".to_string()),
    }
}

/// Page texts from the fallback engine, or why it could not produce any.
type FallbackPages = std::result::Result<Vec<String>, String>;

fn extract_pdf(bytes: &[u8]) -> Result<ExtractedText> {
    extract_pdf_with(bytes, pdf_to_pages_fallback)
}

fn from_fallback_pages(pages: &[String], mut warnings: Vec<&'static str>) -> ExtractedText {
    let texts: Vec<&str> = pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| has_any_text(p))
        .collect();
    warnings.push("pdf_fallback_used");
    if texts.is_empty() {
        warnings.push("pdf_no_text_layer");
    }
    ExtractedText {
        engine: "pdf-extract",
        pages_used: texts.len(),
        text: texts.join(" "),
        pages_total: pages.len(),
        warnings,
    }
}

/// lopdf first; `fallback` runs when lopdf cannot load the file or loads it but finds no text.
fn extract_pdf_with(
    bytes: &[u8],
    fallback: impl Fn(&[u8]) -> FallbackPages,
) -> Result<ExtractedText> {
    let mut warnings: Vec<&'static str> = Vec::new();
    match PdfPages::load(bytes) {
        Ok(pdf) => {
            let joined = join_pages(&pdf);
            if joined.pages_failed > 0 {
                warnings.push("pdf_page_failed");
            }
            if joined.pages_used == 0 {
                match fallback(bytes) {
                    Ok(pages) => {
                        let out = from_fallback_pages(&pages, warnings.clone());
                        if out.pages_used > 0 {
                            return Ok(out);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "pdf-extract found no text either");
                    }
                }
                warnings.push("pdf_no_text_layer");
            }
            Ok(ExtractedText {
                engine: "lopdf",
                text: joined.text,
                pages_total: joined.pages_total,
                pages_used: joined.pages_used,
                warnings,
            })
        }
        Err(load_err) => {
            tracing::warn!(error = %load_err, "lopdf could not load document; trying pdf-extract");
            let pages = fallback(bytes).map_err(|fallback_err| Error::Extraction {
                label: "pdf".to_string(),
                reason: format!("{load_err}; pdf-extract: {fallback_err}"),
            })?;
            Ok(from_fallback_pages(&pages, warnings))
        }
    }
}

fn single_page(engine: &'static str, text: String) -> ExtractedText {
    let joined = join_pages(&SinglePage(text));
    ExtractedText {
        engine,
        text: joined.text,
        pages_total: joined.pages_total,
        pages_used: joined.pages_used,
        warnings: Vec::new(),
    }
}

/// Extract plain text from one document.
///
/// - PDF: lopdf page by page; pdf-extract when lopdf cannot parse the file.
/// - HTML: html2text after dropping script/style blocks.
/// - Markdown/plain text: taken as-is (lossy UTF-8).
/// - Images: supported but empty (no OCR), with a warning.
/// - Anything else binary: `Error::UnsupportedFormat`.
pub fn extract_document(input: &DocumentInput) -> Result<ExtractedText> {
    let bytes = input.bytes.as_slice();
    let ct = content_type_lc_prefix(input.content_type.as_deref());

    let with_label = |e: Error| match e {
        Error::Extraction { reason, .. } => Error::Extraction {
            label: input.label.clone(),
            reason,
        },
        other => other,
    };

    if ct == "application/pdf" || bytes_look_like_pdf(bytes) {
        return extract_pdf(bytes).map_err(with_label);
    }

    if ct.starts_with("image/") || bytes_look_like_image(bytes) {
        let mut out = ExtractedText::empty("image");
        out.pages_total = 1;
        out.warnings.push("image_no_text_extraction");
        return Ok(out);
    }

    if ct == "text/html" || ct == "application/xhtml+xml" || bytes_look_like_html(bytes) {
        let html0 = String::from_utf8_lossy(bytes);
        let html1 = strip_tag_blocks(&html0, "script");
        let html = strip_tag_blocks(&html1, "style");
        return Ok(single_page("html2text", html_to_text(&html, HTML_WIDTH)));
    }

    if bytes_look_binary(bytes) {
        return Err(Error::UnsupportedFormat(format!(
            "{}: not PDF, HTML, image, or text{}",
            input.label,
            if ct.is_empty() {
                String::new()
            } else {
                format!(" ({ct})")
            }
        )));
    }

    let engine = if ct == "text/markdown" || ct == "text/x-markdown" {
        "markdown"
    } else {
        "text"
    };
    Ok(single_page(
        engine,
        String::from_utf8_lossy(bytes).into_owned(),
    ))
}

/// Extraction with the batch failure policy applied: any document-level failure is logged and
/// becomes an empty text, so a batch always gets one string per document.
pub fn extract_or_empty(input: &DocumentInput) -> ExtractedText {
    match extract_document(input) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(
                label = %input.label,
                kind = e.kind(),
                error = %e,
                "text extraction failed"
            );
            let mut out = ExtractedText::empty("none");
            out.warnings.push("extraction_failed");
            out
        }
    }
}
