use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::error;

use flock_db::Database;
use flock_gateway::Dispatcher;
use flock_types::api::{Report, Workflow};

use crate::error::{ApiError, ApiResult};
use crate::remote::RemoteClient;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub remote: RemoteClient,
    /// Face matches below this score are ignored.
    pub face_min_confidence: f64,
    /// Not persisted; lost on restart.
    pub workflows: RwLock<Vec<Workflow>>,
    /// Not persisted; lost on restart.
    pub reports: RwLock<Vec<Report>>,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: String, remote: RemoteClient, face_min_confidence: f64) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret,
            dispatcher: Dispatcher::new(),
            remote,
            face_min_confidence,
            workflows: RwLock::new(Vec::new()),
            reports: RwLock::new(Vec::new()),
        })
    }
}

/// Runs a database call off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("database task failed"))
        })?
        .map_err(ApiError::from)
}
