//! Document generation API server
//!
//! Fills the VAT and Service Agreement contract templates, numbers each
//! result, and converts it to PDF. Endpoints:
//!
//! - `POST /generate-document` - fill a template and convert it
//! - `GET /download/:filename` - fetch a generated file
//! - `GET /` - service description
//! - `GET /health` - liveness probe

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use docfill_core::{
    platform_converter, DocumentGenerator, FileSerialCounter, TemplateSet, DEFAULT_COMPANY_CODE,
    DEFAULT_SERIAL_BASE,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod error;
mod handlers;
mod models;
mod state;

use state::AppState;

/// Command-line arguments for the document generation server
#[derive(Parser, Debug)]
#[command(name = "docfill-api")]
#[command(about = "Fill contract templates and convert them to PDF")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Directory containing the .docx templates
    #[arg(long, env = "DOCFILL_TEMPLATES_DIR", default_value = ".")]
    templates_dir: PathBuf,

    /// Directory generated documents are written to
    #[arg(long, env = "DOCFILL_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Serial counter state file
    #[arg(long, env = "DOCFILL_SERIAL_FILE", default_value = "serial_data.txt")]
    serial_file: PathBuf,

    /// Base serial used when the state file is first created
    #[arg(long, env = "DOCFILL_SERIAL_BASE", default_value_t = DEFAULT_SERIAL_BASE)]
    serial_base: u64,

    /// Company code prefixed to reference numbers
    #[arg(long, env = "DOCFILL_COMPANY_CODE", default_value = DEFAULT_COMPANY_CODE)]
    company_code: String,

    /// LibreOffice executable (ignored on Windows, which uses Word)
    #[arg(long, env = "DOCFILL_OFFICE_BINARY", default_value = "libreoffice")]
    office_binary: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Build the router over shared state
fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/generate-document", post(handlers::generate_document))
        .route("/download/:filename", get(handlers::download))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before parsing so it feeds the env fallbacks
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("docfill_api={}", level).parse()?)
                .add_directive(format!("docfill_core={}", level).parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Initializing document generation API...");

    let templates = TemplateSet::new(&args.templates_dir);
    for kind in templates.missing() {
        warn!(
            "Template for '{}' not found at {}",
            kind.label(),
            templates.path(kind).display()
        );
    }

    std::fs::create_dir_all(&args.output_dir)?;

    let counter = Arc::new(FileSerialCounter::with_base(
        &args.serial_file,
        args.serial_base,
    ));
    let converter = platform_converter(&args.office_binary);
    let generator = DocumentGenerator::new(templates, counter, converter, &args.output_dir)
        .with_company_code(&args.company_code);

    info!(
        "Serial state in {}, output in {}",
        args.serial_file.display(),
        args.output_dir.display()
    );

    let state = Arc::new(AppState::new(generator));
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
