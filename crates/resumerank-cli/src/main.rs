use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use resumerank_core::{sort_by_score_desc, DocumentInput, StopWords, TfidfConfig};
use resumerank_local::{extract, ExtractedDocument, Screening};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "resumerank")]
#[command(
    about = "Rank resumes against a job description by TF-IDF cosine similarity",
    long_about = None
)]
struct Cli {
    /// Log at debug level (overrides RESUMERANK_LOG).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score every resume against the job description and print them best-first.
    Rank(RankCmd),
    /// Print the text extracted from one document.
    Extract(ExtractCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
#[command(group(ArgGroup::new("job_description").required(true).args(["query", "query_file"])))]
struct RankCmd {
    /// Job description text.
    #[arg(long)]
    query: Option<String>,
    /// File holding the job description (PDF, HTML or text).
    #[arg(long)]
    query_file: Option<PathBuf>,
    /// Resume files (PDF, HTML, text; images are accepted but score 0).
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Documents extracted concurrently.
    #[arg(long, env = "RESUMERANK_JOBS", default_value_t = 4)]
    jobs: usize,
    /// Give up on the ranking step after this many milliseconds.
    #[arg(long, env = "RESUMERANK_TIMEOUT_MS")]
    timeout_ms: Option<u64>,
    /// Only print the best N candidates.
    #[arg(long)]
    top: Option<usize>,
    /// Show the N strongest shared terms per candidate.
    #[arg(long, default_value_t = 0)]
    explain: usize,
    /// Use 1 + ln(tf) instead of raw term counts.
    #[arg(long)]
    sublinear_tf: bool,
    /// Use ln(n / df) + 1 instead of the smoothed idf.
    #[arg(long)]
    no_smooth_idf: bool,
    /// Stop word list. Allowed: none, english
    #[arg(long, default_value = "none")]
    stop_words: StopWords,
    /// Shortest term kept, in characters.
    #[arg(long, default_value_t = 2)]
    min_token_chars: usize,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
}

impl RankCmd {
    fn tfidf_config(&self) -> TfidfConfig {
        TfidfConfig {
            sublinear_tf: self.sublinear_tf,
            smooth_idf: !self.no_smooth_idf,
            min_token_chars: self.min_token_chars,
            stop_words: self.stop_words,
            ..TfidfConfig::default()
        }
    }
}

#[derive(clap::Args, Debug)]
struct ExtractCmd {
    file: PathBuf,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("RESUMERANK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // stdout carries results (often JSON); logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Opt-in env file (`RESUMERANK_ENV_FILE`). Never overrides variables already set.
fn load_env_file() {
    let Ok(p) = std::env::var("RESUMERANK_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "html" | "htm" | "xhtml" => Some("text/html"),
        "md" | "markdown" => Some("text/markdown"),
        "txt" | "text" => Some("text/plain"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

fn label_for_path(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_document(path: &Path) -> Result<DocumentInput> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let input = DocumentInput::new(label_for_path(path), bytes);
    Ok(match content_type_for_path(path) {
        Some(ct) => input.with_content_type(ct),
        None => input,
    })
}

fn load_query(args: &RankCmd) -> Result<String> {
    if let Some(q) = &args.query {
        return Ok(q.clone());
    }
    let Some(path) = &args.query_file else {
        anyhow::bail!("a job description is required (--query or --query-file)");
    };
    let input = read_document(path)?;
    let extracted = extract::extract_document(&input)
        .with_context(|| format!("extract job description from {}", path.display()))?;
    Ok(extracted.text)
}

fn print_rank_text(screening: &Screening, shown: &[resumerank_local::ScreenedCandidate]) {
    if !screening.ranked {
        println!(
            "no ranking possible: {}",
            screening.failure.as_deref().unwrap_or("unknown reason")
        );
        return;
    }
    println!("{:>4}  {:>7}  CANDIDATE", "RANK", "MATCH%");
    for (i, c) in shown.iter().enumerate() {
        println!(
            "{:>4}  {:>7.2}  {}",
            i + 1,
            c.candidate.percent,
            c.candidate.label
        );
        if !c.matched_terms.is_empty() {
            let terms: Vec<&str> = c.matched_terms.iter().map(|t| t.term.as_str()).collect();
            println!("{:>15}terms: {}", "", terms.join(", "));
        }
        if !c.warnings.is_empty() {
            println!("{:>15}warnings: {}", "", c.warnings.join(", "));
        }
    }
    if let Some(top) = shown.first() {
        println!(
            "top candidate: {} - {}% match",
            top.candidate.label, top.candidate.percent
        );
    }
}

async fn run_rank(args: RankCmd) -> Result<()> {
    let query = load_query(&args)?;
    let inputs = args
        .files
        .iter()
        .map(|p| read_document(p))
        .collect::<Result<Vec<_>>>()?;
    let n_files = inputs.len();
    tracing::debug!(documents = n_files, jobs = args.jobs, "extracting resumes");

    let docs: Vec<ExtractedDocument> = resumerank_local::extract_batch(inputs, args.jobs).await;
    let screening = resumerank_local::screen_with_timeout(
        query.clone(),
        docs,
        args.tfidf_config(),
        args.explain,
        args.timeout_ms.map(Duration::from_millis),
    )
    .await;

    let mut shown = screening.candidates.clone();
    sort_by_score_desc(&mut shown);
    if let Some(k) = args.top {
        shown.truncate(k);
    }

    match args.output.to_ascii_lowercase().as_str() {
        "json" => {
            let top_candidate = shown.first().map(|c| {
                serde_json::json!({
                    "label": c.candidate.label,
                    "score": c.candidate.score,
                    "percent": c.candidate.percent,
                })
            });
            let payload = serde_json::json!({
                "schema_version": 1,
                "kind": "rank",
                "ok": true,
                "ranked": screening.ranked,
                "failure": screening.failure,
                "query_chars": query.chars().count(),
                "documents": n_files,
                "results": shown,
                "top_candidate": top_candidate,
            });
            println!("{payload}");
        }
        _ => print_rank_text(&screening, &shown),
    }
    Ok(())
}

fn run_extract(args: ExtractCmd) -> Result<()> {
    let input = read_document(&args.file)?;
    let doc = resumerank_local::extract_all(std::slice::from_ref(&input))
        .pop()
        .context("extraction produced no document")?;
    match args.output.to_ascii_lowercase().as_str() {
        "json" => {
            let payload = serde_json::json!({
                "schema_version": 1,
                "kind": "extract",
                "ok": !doc.extracted.warnings.contains(&"extraction_failed"),
                "document": doc,
            });
            println!("{payload}");
        }
        _ => println!("{}", doc.extracted.text),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Rank(args) => run_rank(args).await?,
        Commands::Extract(args) => run_extract(args)?,
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "resumerank",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("resumerank {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_is_guessed_from_extension() {
        assert_eq!(
            content_type_for_path(Path::new("cv.PDF")),
            Some("application/pdf")
        );
        assert_eq!(content_type_for_path(Path::new("cv.htm")), Some("text/html"));
        assert_eq!(content_type_for_path(Path::new("scan.jpeg")), Some("image/jpeg"));
        assert_eq!(content_type_for_path(Path::new("README")), None);
    }

    #[test]
    fn label_is_the_file_name() {
        assert_eq!(label_for_path(Path::new("/tmp/x/jane_doe.pdf")), "jane_doe.pdf");
    }

    #[test]
    fn cli_requires_a_job_description_and_files() {
        assert!(Cli::try_parse_from(["resumerank", "rank", "a.pdf"]).is_err());
        assert!(Cli::try_parse_from(["resumerank", "rank", "--query", "rust"]).is_err());
        assert!(Cli::try_parse_from(["resumerank", "rank", "--query", "rust", "a.pdf"]).is_ok());
    }

    #[test]
    fn tfidf_flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "resumerank",
            "rank",
            "--query",
            "rust",
            "--sublinear-tf",
            "--no-smooth-idf",
            "--stop-words",
            "english",
            "a.txt",
        ])
        .unwrap();
        let Commands::Rank(args) = cli.command else {
            panic!("expected rank");
        };
        let cfg = args.tfidf_config();
        assert!(cfg.sublinear_tf);
        assert!(!cfg.smooth_idf);
        assert_eq!(cfg.stop_words, StopWords::English);
        assert_eq!(cfg.min_token_chars, 2);
    }
}
