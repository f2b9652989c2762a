//! Routes answered by the remote backend, with mock fallback.

use axum::{Json, extract::State};
use serde_json::Value;

use flock_types::api::{Proxied, ResourceQuery};

use crate::error::ApiQuery;
use crate::mock;
use crate::state::AppState;

pub async fn ministries(State(state): State<AppState>) -> Json<Proxied<Value>> {
    Json(state.remote.get_or_mock("/ministries", &[], mock::ministries).await)
}

pub async fn announcements(State(state): State<AppState>) -> Json<Proxied<Value>> {
    Json(state.remote.get_or_mock("/announcements", &[], mock::announcements).await)
}

pub async fn resources(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ResourceQuery>,
) -> Json<Proxied<Value>> {
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let params: Vec<(&str, &str)> = category.map(|c| ("category", c)).into_iter().collect();
    Json(
        state
            .remote
            .get_or_mock("/resources", &params, || mock::resources_in(category))
            .await,
    )
}
