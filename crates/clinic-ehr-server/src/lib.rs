//! HTTP API for the clinic EHR.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  axum Router (/api)                  │
//! │  patients · appointments · records · labs · pharmacy │
//! │  prescriptions · payments · reports · settings       │
//! │  backups · deployments · calendar                    │
//! └───────────────┬──────────────────────────┬───────────┘
//!                 │                          │
//!      ┌──────────▼─────────┐     ┌──────────▼─────────┐
//!      │  clinic-ehr-core   │     │   GoogleClient     │
//!      │  Database (SQLite) │     │  OAuth + Calendar  │
//!      │  BackupManager     │     │     (reqwest)      │
//!      └────────────────────┘     └────────────────────┘
//! ```
//!
//! Every response uses the `{ success, data | error }` envelope. The caller
//! is identified by the `X-User-Id` header.

pub mod auth;
pub mod calendar_sync;
pub mod config;
pub mod error;
pub mod google;
pub mod oauth_state;
pub mod routes;
pub mod telemetry;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::routing::get;
use axum::{Json, Router};
use clinic_ehr_core::{BackupStore, Database, FsBackupStore};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

pub use config::{GoogleConfig, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use google::GoogleClient;
pub use oauth_state::OAuthStates;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub store: Arc<dyn BackupStore>,
    pub google: Arc<GoogleClient>,
    pub oauth_states: Arc<OAuthStates>,
    /// Serializes calendar syncs
    pub calendar_gate: Arc<tokio::sync::Mutex<()>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Open the database and backup directory named in `config`.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let db = Database::open(&config.database_path)?;
        let store = FsBackupStore::new(&config.backup_dir)?;
        Ok(Self::with_parts(db, Arc::new(store), config))
    }

    pub fn with_parts(db: Database, store: Arc<dyn BackupStore>, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            store,
            google: Arc::new(GoogleClient::new(config.google.clone())),
            oauth_states: Arc::new(OAuthStates::new()),
            calendar_gate: Arc::new(tokio::sync::Mutex::new(())),
            config: Arc::new(config),
        }
    }

    /// Lock the database. Never hold the guard across an `.await`.
    pub fn db(&self) -> Result<MutexGuard<'_, Database>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::internal("database lock poisoned"))
    }
}

/// The full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", routes::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
