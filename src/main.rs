//! Modelgate HTTP server
//!
//! Starts an Axum web server that dispatches OpenAI-compatible requests to
//! deployment pools or a passthrough upstream.

use clap::Parser;
use modelgate::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    telemetry,
};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        match output {
            Some(path) => {
                std::fs::write(&path, generate_config_template())?;
                eprintln!("Wrote configuration template to {}", path);
            }
            None => print!("{}", generate_config_template()),
        }
        return Ok(());
    }

    let config = Config::from_file(&cli.config)?;
    telemetry::init(&config.observability);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    tracing::info!(
        config_path = %cli.config,
        pool = config.pool.is_some(),
        single_model = ?config.routing.single_model,
        passthrough_api_base = ?config.passthrough.api_base,
        "Starting Modelgate"
    );

    let state = AppState::new(config)?;
    let app = handlers::router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
