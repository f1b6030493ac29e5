//! # npwidget - Widget « now playing »
//!
//! Client de la passerelle : il interroge `GET /now-playing` à intervalle
//! fixe et fait avancer la progression localement entre deux polls.
//!
//! ```no_run
//! use npwidget::{HttpSnapshotSource, Poller, PollerConfig, render_line};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let source = HttpSnapshotSource::new("http://localhost:8080", Duration::from_secs(8))?;
//! let poller = Poller::new(Arc::new(source), PollerConfig::default());
//! let mut views = poller.subscribe();
//! poller.start();
//!
//! while views.changed().await.is_ok() {
//!     println!("{}", render_line(&views.borrow()));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config_ext;
pub mod display;
pub mod poller;
pub mod progress;
pub mod source;
pub mod state;
pub mod ticker;
pub mod view;

pub use config_ext::WidgetConfigExt;
pub use display::{Decision, DisplayDebouncer};
pub use poller::{Poller, PollerConfig};
pub use progress::{ProgressAnchor, format_ms, local_progress};
pub use source::{FetchError, HttpSnapshotSource, SnapshotSource};
pub use state::{DisplayState, PollEvent, PollerState, transition};
pub use ticker::ProgressTicker;
pub use view::{WidgetView, render_line};
