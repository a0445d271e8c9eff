use clap::{Parser, Subcommand};
use serde_json::Value;

use edge_gateway::config::{ObservabilityConfig, RealtimeConfig};
use edge_gateway::lifecycle::wait_for_signal;
use edge_gateway::observability::logging;
use edge_gateway::realtime::{ConnectionManager, ConnectionState, InboundMessage, WILDCARD};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the edge gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the gateway's local health endpoint
    Health {
        #[arg(short, long, default_value = "http://localhost:3000")]
        url: String,
    },
    /// Stream live messages from the backend socket
    Watch {
        #[arg(short, long, env = "BACKEND_URL", default_value = "http://localhost:8080")]
        backend: String,

        #[arg(short, long, env = "GATEWAY_TOKEN")]
        token: String,

        /// Only print messages of this type
        #[arg(long = "type", default_value = WILDCARD)]
        kind: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Health { url } => {
            let res = reqwest::get(format!("{}/health", url.trim_end_matches('/'))).await?;
            print_response(res).await?;
        }
        Commands::Watch {
            backend,
            token,
            kind,
        } => watch(backend, token, kind).await?,
    }

    Ok(())
}

async fn watch(
    backend: String,
    token: String,
    kind: String,
) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&ObservabilityConfig {
        log_level: "warn".to_string(),
        ..ObservabilityConfig::default()
    });

    let manager = ConnectionManager::new(RealtimeConfig::default(), backend);
    manager
        .dispatcher()
        .add_listener(kind, |message: &InboundMessage| print_message(message));
    manager.connect(&token)?;

    let mut states = manager.state_changes();
    let exhausted = states.wait_for(|state| *state == ConnectionState::Exhausted);

    tokio::select! {
        _ = exhausted => eprintln!("Connection lost, reconnect attempts exhausted"),
        _ = wait_for_signal() => {}
    }
    manager.disconnect();
    Ok(())
}

fn print_message(message: &InboundMessage) {
    match message.stock_update() {
        Some(update) => {
            let symbol = update.symbol.as_deref().unwrap_or("-");
            match update.change_percent() {
                Some(change) => println!(
                    "stock #{} {:<6} {:>10.2} ({:+.2}%)",
                    update.id, symbol, update.current_price, change
                ),
                None => println!(
                    "stock #{} {:<6} {:>10.2}",
                    update.id, symbol, update.current_price
                ),
            }
        }
        None => println!("{}", message.payload()),
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
