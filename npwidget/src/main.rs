//! Suit une passerelle « now playing » et affiche une ligne par changement

use anyhow::Result;
use npconfig::get_config;
use npwidget::{HttpSnapshotSource, Poller, WidgetConfigExt, render_line};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("npwidget=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = get_config();
    let gateway_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.get_widget_gateway_url());

    let source = HttpSnapshotSource::new(&gateway_url, config.get_widget_request_timeout())?;
    info!("Following {}", source.url());

    let poller = Poller::new(Arc::new(source), config.get_widget_poller_config());
    let mut views = poller.subscribe();
    poller.start();

    let mut last_line = String::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, stopping");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = render_line(&views.borrow_and_update());
                // La progression change 60 fois par seconde, le texte une fois
                if line != last_line {
                    println!("{}", line);
                    last_line = line;
                }
            }
        }
    }

    poller.shutdown().await;
    Ok(())
}
