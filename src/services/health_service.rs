use tracing::{debug, warn};

use crate::{dto::health::HealthResponse, state::SharedState};

/// `degraded` while no store is installed, the supervisor flagged it, or it fails a ping.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.store().await else {
        debug!("health probe without a storage backend");
        return HealthResponse::degraded();
    };

    match store.health_check().await {
        Ok(()) if !state.is_degraded() => HealthResponse::ok(),
        Ok(()) => HealthResponse::degraded(),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded()
        }
    }
}
