use axum::extract::{Query, State};
use axum::Json;

use crate::aggregator;
use crate::dto::{NodeContainerStats, NodeIdQuery, NodeSystemStats};
use crate::error_response::ApiResult;
use crate::state::AppState;

pub async fn system_stats(
    State(state): State<AppState>,
    Query(query): Query<NodeIdQuery>,
) -> ApiResult<Json<Vec<NodeSystemStats>>> {
    let targets = aggregator::determine_targets(&state, &query.targets()).await?;
    let stats = aggregator::aggregate_system_stats(&state, &targets).await?;
    Ok(Json(stats))
}

pub async fn container_stats(
    State(state): State<AppState>,
    Query(query): Query<NodeIdQuery>,
) -> ApiResult<Json<Vec<NodeContainerStats>>> {
    let targets = aggregator::determine_targets(&state, &query.targets()).await?;
    let stats = aggregator::aggregate_container_stats(&state, &targets).await?;
    Ok(Json(stats))
}
