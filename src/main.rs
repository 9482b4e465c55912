//! Command-line interface for xsd-check

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::sync::Arc;

#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use xsd_check::validators::{
    ConsoleHandler, FileResolver, ProblemHandler, ProblemRecord, SchemaResolver,
};
#[cfg(feature = "cli")]
use xsd_check::{Limits, SchemaLoader, ValidationContext};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsd-check")]
#[command(author, version, about = "Validate a set of XML Schema documents", long_about = None)]
struct Cli {
    /// Schema documents to validate together
    #[arg(value_name = "SCHEMA", required = true)]
    schemas: Vec<PathBuf>,

    /// Namespace given to schemas without a target namespace
    #[arg(short, long, value_name = "URI")]
    namespace: Option<String>,

    /// Print problems as a JSON array
    #[arg(long)]
    json: bool,

    /// Use strict load limits
    #[arg(long)]
    strict: bool,
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => std::process::exit(1),
        Ok(false) => {}
        Err(e) => {
            ConsoleHandler::stdout().terminate_with_cause("cannot load schemas", &e);
            std::process::exit(2);
        }
    }
}

/// Load and validate; returns whether blocking problems were found
#[cfg(feature = "cli")]
fn run(cli: &Cli) -> xsd_check::Result<bool> {
    let resolvers = cli
        .schemas
        .iter()
        .map(|path| FileResolver::new(path).map(|r| Arc::new(r) as Arc<dyn SchemaResolver>))
        .collect::<xsd_check::Result<Vec<_>>>()?;

    let limits = if cli.strict {
        Limits::strict()
    } else {
        Limits::default()
    };

    let mut ctx = if cli.json {
        ValidationContext::new()
    } else {
        ValidationContext::with_handler(ConsoleHandler::stdout())
    };
    let documents = SchemaLoader::new()
        .with_limits(limits)
        .load(&resolvers, cli.namespace.as_deref(), &mut ctx)?;
    xsd_check::validate_schemas(&documents, &mut ctx);

    if cli.json {
        let records: Vec<ProblemRecord> = ctx.problems().iter().map(|p| p.record()).collect();
        let text = serde_json::to_string_pretty(&records)
            .map_err(|e| xsd_check::Error::Other(format!("cannot serialize problems: {}", e)))?;
        println!("{}", text);
        return Ok(ctx.error_count() > 0);
    }

    let blocking = ctx.report_to_handler();
    ctx.report(&format!(
        "{} documents, {} errors",
        documents.len(),
        ctx.error_count()
    ));
    Ok(blocking)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
