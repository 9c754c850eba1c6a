pub mod config;

use std::time::Instant;

use config::Config;

/// Resolves a public endpoint via STUN. Exposed so integration tests can
/// drive the same path the `discover` subcommand takes.
pub fn discover(config: &Config, server: Option<&str>) -> anyhow::Result<nat::DiscoveryRecord> {
    let server = server.unwrap_or(&config.stun.primary_server);
    let client = nat::StunClient::new()?.with_timeout(config.stun.timeout());
    let record = client.discover_with_retry(server, config.stun.retry_attempts)?;
    Ok(record)
}

/// Classifies the local NAT using the configured primary/secondary STUN
/// servers. Exposed so integration tests can drive the same path the
/// `classify` subcommand takes.
pub fn classify(config: &Config, primary: Option<&str>, secondary: Option<&str>) -> anyhow::Result<nat::Mapping> {
    let primary = primary.unwrap_or(&config.stun.primary_server);
    let secondary = secondary.unwrap_or(&config.stun.secondary_server);
    let client = nat::StunClient::new()?.with_timeout(config.stun.timeout());
    let mapping = nat::classify_with_retry(&client, primary, secondary, config.stun.retry_attempts)?;
    Ok(mapping)
}

/// Opens a direct UDP path to `peer`, binding a fresh ephemeral socket.
/// `local_nat_type`, when given, gates the attempt against `peer`'s
/// advertised NAT type before any packets are sent. Exposed so integration
/// tests can drive the same path the `punch` subcommand takes.
pub async fn punch(
    config: &Config,
    peer: punch::PeerInfo,
    local_nat_type: Option<nat::NatType>,
) -> anyhow::Result<punch::Connection> {
    let mapping = local_nat_type.map(|nat_type| nat::Mapping {
        local_endpoint: "0.0.0.0:0".parse().unwrap(),
        public_endpoint: "0.0.0.0:0".parse().unwrap(),
        nat_type,
        detected_at: Instant::now(),
    });

    let socket = tokio::net::UdpSocket::bind("0.0.0.0:0").await?;
    let puncher = punch::Puncher::new(socket, mapping, config.punch.to_engine_config());
    let connection = punch::punch_with_retry(&puncher, &peer, config.punch.retry_attempts).await?;
    Ok(connection)
}
