//! Invoice dashboard server.
//!
//! Serves the mutation pipeline over REST:
//! - Storage: SQLite via SQLx (parameter-bound statements)
//! - Auth: bcrypt credential verification + JWT sessions
//! - Networking: Axum on Tokio
//!
//! Usage:
//!   cargo run --bin seed            # populate placeholder data
//!   cargo run --bin invoice_dash    # start server
//!   # Then drive it with dash-cli or curl (see README)

use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use invoice_dash::rest::create_router;
use invoice_dash::storage::Storage;

#[derive(Parser)]
#[command(name = "invoice_dash")]
#[command(about = "Invoice dashboard server", long_about = None)]
struct Cli {
    /// Address to serve the dashboard on.
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// SQLx database URL; falls back to DATABASE_URL, then a local file.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = cli
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://dashboard.db".to_string());

    let storage = Storage::open(&database_url).await?;
    let app = create_router(storage);

    info!(addr = %cli.addr, "invoice dashboard listening");
    info!("swagger ui at /swagger-ui");

    let listener = TcpListener::bind(cli.addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
