use npconfig::get_config;
use npprofile::ProfileServerExt;
use npserver::{LoggingOptions, ServerBuilder};
use npspotify::SpotifyServerExt;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Infrastructure ==========

    let config = get_config();
    let mut server = ServerBuilder::new_configured().build();
    server
        .init_logging(LoggingOptions::from_config(&config))
        .await;

    server
        .add_route("/info", || async {
            serde_json::json!({
                "name": "NowPlaying",
                "version": env!("CARGO_PKG_VERSION"),
            })
        })
        .await;

    // ========== PHASE 2 : Endpoints métier ==========

    info!("🎧 Initializing Spotify gateway...");
    let gateway = server.init_spotify().await?;
    info!(
        "✅ Spotify gateway ready (snapshot TTL {}s)",
        gateway.settings().cache_ttl_secs
    );

    info!("👤 Initializing profile endpoints...");
    if let Err(e) = server.init_profile().await {
        warn!("⚠️ Failed to initialize profile endpoints: {}", e);
    }

    // ========== PHASE 3 : Démarrage du serveur ==========

    info!("🌐 Starting HTTP server...");
    server.start().await?;

    info!("✅ NowPlaying is ready at {}", server.info().base_url);
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    Ok(())
}
