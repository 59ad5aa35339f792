use super::{AppState, error::ApiError};
use crate::server::telemetry::{increment_records_created, increment_records_not_found};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use taskstash::{Error, NOT_FOUND_TEXT, NewRecord, Record, RecordId, Store};

pub async fn list_tasks<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let records = state.service.list_all().await?;
    Ok(Json(records))
}

/// Answers a missing record with `404` and a sentinel-shaped body that echoes
/// the requested id.
pub async fn get_task<S: Store>(
    State(state): State<AppState<S>>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = raw_id.parse::<RecordId>()?;

    match state.service.get(id).await {
        Ok(record) => Ok(Json(record).into_response()),
        Err(Error::NotFound { id }) => {
            increment_records_not_found();
            let body = Record::new(id, NOT_FOUND_TEXT, NOT_FOUND_TEXT);
            Ok((StatusCode::NOT_FOUND, Json(body)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn create_task<S: Store>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let Json(payload) = payload.map_err(|rejection| Error::Validation {
        reason: rejection.body_text(),
    })?;

    let record = state
        .service
        .create(payload.title, payload.description)
        .await?;
    increment_records_created();
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn health<S: Store>(State(state): State<AppState<S>>) -> (StatusCode, &'static str) {
    if state.is_serving() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting down")
    }
}
