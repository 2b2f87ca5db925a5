use anyhow::{Context, Result};
use clap::Parser;
use elastiq::{Query, QueryExpr, QuerySettings, SearchContext};
use std::io::Read;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "elastiq")]
#[command(about = "Translate a JSON query tree into a search request", long_about = None)]
struct Args {
    /// Path to a JSON query tree, or "-" for stdin
    #[arg(long, default_value = "-")]
    input: String,

    /// Settings file (JSON)
    #[arg(long, env = "ELASTIQ_CONFIG")]
    config: Option<PathBuf>,

    /// Index the request is sent to
    #[arg(long, env = "ELASTIQ_INDEX")]
    index: Option<String>,

    /// Dotted namespace prepended to every field name
    #[arg(long, env = "ELASTIQ_PREFIX")]
    prefix: Option<String>,

    /// Pretty-print the request body
    #[arg(long)]
    pretty: bool,
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading query from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading query from {}", input))
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so the request body can be piped
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => QuerySettings::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => QuerySettings::default(),
    };
    if let Some(index) = args.index {
        settings = settings.with_index(index);
    }
    if let Some(prefix) = args.prefix {
        settings = settings.with_field_prefix(prefix);
    }

    let context = SearchContext::new(settings)?;
    let expr: QueryExpr =
        serde_json::from_str(&read_input(&args.input)?).context("parsing query tree")?;
    let query: Query = expr.into();
    let translation = context.translate(&query)?;

    info!(
        path = %context.search_path(&translation),
        materializer = translation.materializer.kind(),
        "Translated query (elastiq v{})",
        elastiq::VERSION
    );

    let body = if args.pretty {
        serde_json::to_string_pretty(&translation.search_request)?
    } else {
        serde_json::to_string(&translation.search_request)?
    };
    println!("{}", body);

    Ok(())
}
