//! uwsgi-gateway command line.
//!
//! Talks to uwsgi peers (ping, one-shot requests), validates configuration
//! files and runs the cluster health monitor.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tokio::sync::broadcast;

use uwsgi_gateway::cluster::{ping_node, ClusterMonitor, ClusterNode, ClusterNodes, PingOutcome};
use uwsgi_gateway::config::{load_config, GatewayConfig};
use uwsgi_gateway::net::simple_message;
use uwsgi_gateway::observability::logging;
use uwsgi_gateway::protocol::{decode_dict, encode_dict};

#[derive(Parser)]
#[command(name = "uwsgi-gateway")]
#[command(about = "uwsgi protocol gateway tools", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Socket timeout in seconds (overrides the configuration)
    #[arg(short, long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ping a uwsgi node
    Ping {
        /// Node address (host:port)
        addr: String,
    },
    /// Send a dictionary frame and print the response
    Send {
        /// Peer address (host:port)
        addr: String,
        /// Variables as KEY=VALUE
        vars: Vec<String>,
        #[arg(long, default_value_t = 0)]
        modifier1: u8,
        #[arg(long, default_value_t = 0)]
        modifier2: u8,
    },
    /// Validate a configuration file
    CheckConfig {
        path: PathBuf,
    },
    /// Ping configured cluster nodes until interrupted
    Monitor,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => GatewayConfig::default(),
    };
    logging::init(&config.observability.log_level);

    let timeout = cli.timeout.unwrap_or(config.timeouts.socket_secs);

    match run(cli.command, config, timeout).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Commands,
    config: GatewayConfig,
    timeout: u64,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Commands::Ping { addr } => {
            let node = ClusterNode::new(addr.clone(), addr.clone());
            let outcome = ping_node(&node, timeout).await;
            println!("{}", json!({ "node": addr, "alive": outcome == PingOutcome::Ok }));
            if outcome != PingOutcome::Ok {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Send {
            addr,
            vars,
            modifier1,
            modifier2,
        } => {
            let pairs = vars
                .iter()
                .map(|var| {
                    var.split_once('=')
                        .ok_or_else(|| format!("expected KEY=VALUE, got {var:?}"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let payload = encode_dict(&pairs)?;

            let (header, body) = simple_message(
                &addr,
                modifier1,
                modifier2,
                &payload,
                config.buffer_size as usize,
                timeout,
            )
            .await?;
            print_response(header.modifier1, header.modifier2, &body)?;
        }
        Commands::CheckConfig { path } => {
            let checked = load_config(&path)?;
            println!(
                "{}",
                json!({
                    "path": path.display().to_string(),
                    "valid": true,
                    "static_maps": checked.static_files.static_maps.len(),
                    "apps": checked.apps.len(),
                    "nodes": checked.cluster.nodes.len(),
                })
            );
        }
        Commands::Monitor => {
            let nodes = Arc::new(ClusterNodes::from_config(&config.cluster.nodes));
            let monitor = ClusterMonitor::new(nodes, &config.cluster, timeout);
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

            let handle = tokio::spawn(monitor.run(shutdown_rx));
            tokio::signal::ctrl_c().await?;
            tracing::info!("Interrupt received, stopping monitor");
            let _ = shutdown_tx.send(());
            handle.await?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_response(modifier1: u8, modifier2: u8, body: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let payload = match decode_dict(body) {
        Ok(pairs) if !pairs.is_empty() => {
            let mut map = Map::new();
            for (k, v) in pairs {
                map.insert(
                    String::from_utf8_lossy(k).into_owned(),
                    Value::String(String::from_utf8_lossy(v).into_owned()),
                );
            }
            Value::Object(map)
        }
        _ => Value::String(String::from_utf8_lossy(body).into_owned()),
    };

    let out = json!({
        "modifier1": modifier1,
        "modifier2": modifier2,
        "size": body.len(),
        "payload": payload,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
