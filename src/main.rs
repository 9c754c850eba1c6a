use std::sync::Arc;

use clap::{Parser, Subcommand};
use natpunch::config::Config;

#[derive(Parser)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    /// path to a TOML configuration file overriding the STUN/punch defaults.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// resolve this host's public endpoint via STUN.
    Discover {
        /// STUN server to query; defaults to the configured primary.
        #[arg(long)]
        server: Option<String>,
    },
    /// classify this host's NAT behavior.
    Classify {
        #[arg(long)]
        primary: Option<String>,
        #[arg(long)]
        secondary: Option<String>,
    },
    /// attempt to open a direct UDP path to a peer.
    Punch {
        /// the peer's advertised public endpoint, `ip:port`.
        #[arg(long)]
        peer: String,
        /// LAN candidate endpoints to probe before the public endpoint.
        #[arg(long = "local-candidate")]
        local_candidates: Vec<String>,
        /// local NAT type, from a prior `classify` run.
        #[arg(long)]
        local_nat_type: Option<String>,
        /// remote NAT type, learned out-of-band (e.g. via signaling).
        #[arg(long)]
        remote_nat_type: Option<String>,
    },
}

fn parse_nat_type(value: &str) -> anyhow::Result<nat::NatType> {
    Ok(match value.to_ascii_lowercase().as_str() {
        "open_internet" | "openinternet" => nat::NatType::OpenInternet,
        "full_cone" | "fullcone" => nat::NatType::FullCone,
        "restricted_cone" | "restrictedcone" => nat::NatType::RestrictedCone,
        "port_restricted_cone" | "portrestrictedcone" => nat::NatType::PortRestrictedCone,
        "symmetric" => nat::NatType::Symmetric,
        "blocked" => nat::NatType::Blocked,
        "unknown" => nat::NatType::Unknown,
        other => anyhow::bail!("unrecognized NAT type: {other}"),
    })
}

async fn run(command: Command, config: Arc<Config>) -> anyhow::Result<()> {
    match command {
        Command::Discover { server } => {
            let record = natpunch::discover(&config, server.as_deref())?;
            println!("public endpoint: {}", record.public_endpoint);
            println!("local endpoint:  {}", record.local_endpoint);
        }
        Command::Classify { primary, secondary } => {
            let mapping = natpunch::classify(&config, primary.as_deref(), secondary.as_deref())?;
            println!("nat type:        {:?}", mapping.nat_type);
            println!("public endpoint: {}", mapping.public_endpoint);
        }
        Command::Punch {
            peer,
            local_candidates,
            local_nat_type,
            remote_nat_type,
        } => {
            let public_endpoint: nat::Endpoint = peer.parse()?;
            let local_endpoints = local_candidates
                .iter()
                .map(|s| s.parse())
                .collect::<Result<Vec<nat::Endpoint>, _>>()?;

            let mut peer_info = punch::PeerInfo::new(public_endpoint).with_local_candidates(local_endpoints);
            if let Some(remote_type) = remote_nat_type.as_deref() {
                peer_info = peer_info.with_remote_nat_type(parse_nat_type(remote_type)?);
            }

            let local_nat_type = local_nat_type.as_deref().map(parse_nat_type).transpose()?;
            let connection = natpunch::punch(&config, peer_info, local_nat_type).await?;

            println!("connected to:    {}", connection.remote_endpoint);
            println!("round-trip time: {:?}", connection.rtt);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = simple_logger::init_with_level(config.log.level.as_level()) {
        eprintln!("failed to initialize logger: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(cli.command, config).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}
