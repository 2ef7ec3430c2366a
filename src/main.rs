use anyhow::Context;
use clap::Parser;
use sourcequery::{Client, Filter, MasterQuery, QueryConfig, Region, Server};
use std::{net::SocketAddr, path::PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Master server as host:port
    #[arg(short, long)]
    master: Option<String>,

    /// Per request deadline in milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Region name or code
    #[arg(short, long, default_value = "all")]
    region: Region,

    /// Application id, 0 for any
    #[arg(short, long, default_value_t = 0)]
    appid: u32,

    /// Extra master filter as key=value, may be repeated
    #[arg(short, long = "filter")]
    filters: Vec<Filter>,

    /// Query a single server instead of walking the master list
    #[arg(short, long)]
    server: Option<SocketAddr>,

    /// Skip player lists
    #[arg(long)]
    no_players: bool,
}

fn load_config(args: &Args) -> anyhow::Result<QueryConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => QueryConfig::default(),
    };

    if let Some(master) = &args.master {
        config.master = master.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if args.no_players {
        config.players = false;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    debug!("Using {:?}", config);

    let client = Client::new(&config)?;

    let servers: Vec<Server> = match args.server {
        Some(addr) => client.query_server(addr).await.into_iter().collect(),
        None => {
            let query = args
                .filters
                .iter()
                .cloned()
                .fold(MasterQuery::new(args.region).app_id(args.appid), |q, f| {
                    q.filter(f)
                });
            client.query(&query).await
        }
    };

    info!("Queried {} servers", servers.len());
    println!("{}", serde_json::to_string_pretty(&servers)?);

    Ok(())
}
