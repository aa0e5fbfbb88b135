//! Sieve command line tool
//!
//! Builds the query specification for one request against a resource schema
//! and prints it as JSON, optionally with the SQL it translates to.
//!
//! Usage:
//!   sieve --schema people.yaml --query 'select=id,name&filter[age][gte]=18&limit=10' --sql

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use sieve_kernel::{
    Config, QuerySpecification, RequestInput, ResourceSchema, SchemaDefinition, SeaQueryAdapter,
    SpecificationAggregator,
};

/// Build a query specification from request parameters.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Resource schema file (.yaml, .yml, .json or .toml).
    #[arg(long)]
    schema: PathBuf,

    /// Request parameters as a URL query string.
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    query: Option<String>,

    /// Request parameters as a JSON object file.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Also print the Postgres SQL for the specification.
    #[arg(long)]
    sql: bool,

    /// Exit with a failure status when the request has validation errors.
    #[arg(long)]
    strict: bool,
}

#[derive(Serialize)]
struct Output {
    specification: QuerySpecification,
    #[serde(skip_serializing_if = "Option::is_none")]
    sql: Option<String>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(&config.log_filter);

    let schema = SchemaDefinition::from_path(&args.schema)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?
        .with_fallback_max_limit(config.max_limit)
        .build()
        .context("invalid schema")?;

    let input = match (&args.query, &args.input) {
        (Some(query), _) => RequestInput::from_query_string(query),
        (None, Some(path)) => {
            let body = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            RequestInput::from_json_str(&body)
                .with_context(|| format!("invalid request input in {}", path.display()))?
        }
        (None, None) => anyhow::bail!("either --query or --input is required"),
    };

    let specification = SpecificationAggregator::new(&schema, &input).into_specification();
    let valid = specification.is_valid();
    if !valid {
        info!(
            resource = %schema.resource(),
            errors = specification.errors().len(),
            "request has validation errors"
        );
    }

    let sql = args.sql.then(|| render_sql(&schema, specification.clone()));
    let output = Output { specification, sql };
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("failed to serialize specification")?
    );

    if args.strict && !valid {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn render_sql(schema: &ResourceSchema, specification: QuerySpecification) -> String {
    let mut adapter = SeaQueryAdapter::for_schema(schema);
    specification.apply_to(&mut adapter);
    adapter.to_sql()
}

fn init_tracing(directives: &str) {
    let filter = EnvFilter::try_new(directives)
        .unwrap_or_else(|_| EnvFilter::new(sieve_kernel::config::DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
