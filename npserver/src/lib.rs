//! # npserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple pour monter les différentes
//! briques du site (passerelle Spotify, profil Discord, vitrine GitHub) sur
//! un seul serveur HTTP.
//!
//! ## Fonctionnalités
//!
//! - 🚀 **API de haut niveau** : routes JSON, handlers avec état, sous-routers
//! - 📡 **Server-Sent Events (SSE)** : logs en temps réel via `/log-sse`
//! - 📚 **Documentation OpenAPI** : Swagger UI par API enregistrée
//! - ⚡ **Arrêt gracieux** : gestion propre de Ctrl+C
//!
//! ## Architecture
//!
//! - [`server`] : serveur principal et builder
//! - [`logs`] : buffer de logs, couche `tracing` et endpoints associés
//!
//! Les crates métier n'ajoutent pas de dépendance ici : elles étendent
//! [`Server`] avec leurs propres traits d'extension.
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use npserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut server = ServerBuilder::new("MyServer", "localhost", 8080).build();
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await;
//!     server.wait().await;
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, LoggingOptions, SseLayer, log_dump, log_sse};
pub use server::{Server, ServerBuilder, ServerInfo};
