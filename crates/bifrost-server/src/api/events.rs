//! `/events`

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::instrument;

use super::views::EventsView;
use crate::error::ServiceError;
use crate::service::Services;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Page cursor: a wire timestamp, or `all`.
    pub before: Option<String>,
}

/// `GET /events?before=`
pub async fn list_events(
    State(services): State<Services>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Json<EventsView>, ServiceError> {
    let Query(query) = query?;
    let events = services.audit.list(query.before.as_deref()).await?;
    Ok(Json(events.into()))
}

/// `DELETE /events?before=`: return the listing, then clear the log.
#[instrument(skip(services, query))]
pub async fn clear_events(
    State(services): State<Services>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Json<EventsView>, ServiceError> {
    let Query(query) = query?;
    let events = services.audit.clear(query.before.as_deref()).await?;
    Ok(Json(events.into()))
}
