use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use snipnote_core::{
    ArticleExtractor, CookieStore, EnvCredentials, ExtractionError, ExtractionResult, FetchConfig, MarkdownConfig,
    OutputFormat, RuleIndex, fetch_file, fetch_stdin,
};
use tracing_subscriber::EnvFilter;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for the extraction result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Markdown,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: markdown, json", s)),
        }
    }
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Markdown => OutputFormat::Markdown,
            Format::Json => OutputFormat::Json,
        }
    }
}

/// Archive web articles as clean Markdown using declarative site rules
#[derive(Parser, Debug)]
#[command(name = "snipnote")]
#[command(author = "SnipNote Contributors")]
#[command(version)]
#[command(about = "Archive web articles as clean Markdown", long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Source URL of file or stdin input, used to pick the site rule and
    /// resolve relative links
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Site rule file
    #[arg(long, env = "SNIPNOTE_RULES", value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Cookie file ({"domain": {"name": "value"}})
    #[arg(long, env = "SNIPNOTE_COOKIES", value_name = "FILE")]
    cookies: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    format: Format,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// HTTP timeout per attempt in seconds
    #[arg(long, default_value = "10", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for the first request attempt
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Fence language for code blocks without a language marker
    #[arg(long, default_value = "java", value_name = "LANG")]
    code_lang: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("snipnote_core=debug,snipnote=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

fn build_extractor(args: &Args) -> anyhow::Result<ArticleExtractor> {
    let rules = match &args.rules {
        Some(path) => RuleIndex::from_path(path)?,
        None => RuleIndex::load_default()?,
    };
    let cookies = match &args.cookies {
        Some(path) => CookieStore::from_path(path)?,
        None => CookieStore::load_default()?,
    };

    if args.verbose {
        echo::print_info(&format!("{} site rules loaded", rules.rules().len()));
    }

    let extractor = ArticleExtractor::builder()
        .rules(rules)
        .cookies(cookies)
        .credentials(EnvCredentials)
        .fetch_config(FetchConfig { timeout: args.timeout, user_agent: args.user_agent.clone(), ..Default::default() })
        .markdown_config(MarkdownConfig { default_code_language: args.code_lang.clone(), ..Default::default() })
        .build()?;
    Ok(extractor)
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

async fn extract(args: &Args, extractor: &ArticleExtractor) -> anyhow::Result<ExtractionResult> {
    if is_url(&args.input) {
        if args.verbose {
            echo::print_step(1, 2, &format!("Fetching {}", args.input.bright_white().underline()));
        }
        return Ok(extractor.extract(&args.input).await?);
    }

    let html = if args.input == "-" {
        if args.verbose {
            echo::print_step(1, 2, "Reading from stdin");
        }
        fetch_stdin()?
    } else {
        if args.verbose {
            echo::print_step(1, 2, &format!("Reading from file {}", args.input.bright_white()));
        }
        fetch_file(&args.input)?
    };

    if args.verbose {
        eprintln!("  {} {}", "Size:".dimmed(), echo::format_size(html.len()).bright_white());
    }
    Ok(extractor.extract_html(&html, args.url.as_deref())?)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let started = Instant::now();
    let extractor = build_extractor(&args)?;
    let result = extract(&args, &extractor).await?;

    if args.verbose {
        echo::print_extraction_details(&result);
        echo::print_step(2, 2, "Writing output");
        echo::print_timing("Total", started.elapsed());
    }

    let output = result.to_format(args.format.into()).context("Failed to serialize result")?;

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", output);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        echo::print_banner();
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ExtractionError>() {
                Some(extraction) => echo::print_extraction_error(extraction),
                None => echo::print_error(&err),
            }
            ExitCode::FAILURE
        }
    }
}
