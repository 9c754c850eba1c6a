use std::sync::Arc;

use signaling::config::Config;
use signaling::janitor;
use signaling::router::Router;
use signaling::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::load()?);
    simple_logger::init_with_level(config.log.level.as_level())?;

    let router = Arc::new(Router::new(config.server.room_capacity));

    tokio::spawn(janitor::run(router.clone(), config.janitor.to_runtime_config()));

    server::serve(config, router).await
}
