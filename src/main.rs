//! pyrecover - prints the Python 2.0 source of a serialized code object.

use clap::Parser;
use pyrecover::bytecode::CodeObject;
use pyrecover::frontend::token_dumper::TokenDumper;
use pyrecover::{Config, Decompiler, Error, Loader};
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration file picked up from the working directory when present.
const LOCAL_CONFIG: &str = "pyrecover.toml";

#[derive(Parser, Debug)]
#[command(name = "pyrecover")]
#[command(about = "Recover Python 2.0 source from a compiled code object")]
struct Cli {
    /// Code object serialized as postcard (.pcode) or JSON (.json)
    file: PathBuf,

    /// Print the decoded token stream instead of source
    #[arg(long)]
    tokens: bool,

    /// Show each instruction's raw argument in the token listing
    #[arg(long, requires = "tokens")]
    args: bool,

    /// Print the rewritten syntax tree instead of source
    #[arg(long)]
    ast: bool,

    /// Disable ANSI colors in listings
    #[arg(long)]
    no_color: bool,

    /// Extra configuration file layered over the defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// One level of indentation in the generated source
    #[arg(long)]
    indent: Option<String>,

    /// Deepest syntax tree accepted
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(Debug, ThisError)]
enum CliError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("expected a .pcode or .json file, got {0}")]
    Extension(String),

    #[error("malformed code object: {0}")]
    Postcard(#[from] postcard::Error),

    #[error("malformed code object: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Pipeline(#[from] Error),
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        report(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    debug!(?config, "configuration loaded");

    let code = load_code(&cli.file)?;
    let decompiler = Decompiler::new(config);

    if cli.tokens {
        let decoded = decompiler.decode(&code)?;
        let mut dumper = TokenDumper::new();
        if !decompiler.config().diagnostics.color {
            dumper = dumper.no_color();
        }
        if cli.args {
            dumper = dumper.with_args();
        }
        dumper.dump(&decoded.tokens);
        return Ok(());
    }

    if cli.ast {
        print!("{}", decompiler.syntax_tree(&code)?);
        return Ok(());
    }

    print!("{}", decompiler.decompile(&code)?);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, Error> {
    let mut loader = Loader::new().with_optional_file(LOCAL_CONFIG);
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    if let Some(indent) = &cli.indent {
        loader = loader.set_override("output.indent", indent.clone())?;
    }
    if let Some(depth) = cli.max_depth {
        loader = loader.set_override("limits.max_depth", depth as i64)?;
    }
    if cli.no_color {
        loader = loader.set_override("diagnostics.color", false)?;
    }
    Ok(loader.build()?)
}

fn load_code(path: &Path) -> Result<CodeObject, CliError> {
    let read = |path: &Path| {
        std::fs::read(path).map_err(|source| CliError::Read {
            path: path.display().to_string(),
            source,
        })
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("pcode") => Ok(postcard::from_bytes(&read(path)?)?),
        Some("json") => Ok(serde_json::from_slice(&read(path)?)?),
        _ => Err(CliError::Extension(path.display().to_string())),
    }
}

fn report(e: &CliError) {
    if let CliError::Pipeline(pipeline) = e {
        if let Error::Parse(parse) = pipeline.root() {
            eprintln!("--- This code section failed: ---");
            eprint!("{}", parse.listing());
        }
    }
    eprintln!("error: {}", e);
}
