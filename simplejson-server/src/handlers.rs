//! HTTP handlers for the SimpleJSON protocol endpoints
//!
//! Bodies are taken as raw bytes and decoded here, so a missing or unusual
//! `Content-Type` is tolerated and every decode failure becomes a 400.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::de::DeserializeOwned;
use simplejson_core::{
    annotation::{AnnotationRecord, AnnotationsRequest},
    query::{QueryRequest, QueryResponseEntry, SearchRequest, TagKeysRequest, TagValuesRequest},
    tags::{TagKey, TagValue},
};
use tracing::debug;

use crate::error::{ApiError, Endpoint};
use crate::AppState;

fn decode<T: DeserializeOwned>(endpoint: Endpoint, body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::new(endpoint, err.into()))
}

/// Health probe answered on `/`
pub async fn root_handler() -> &'static str {
    "OK"
}

/// Anything not routed
pub async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "File not found")
}

/// `POST /query`
pub async fn query_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<QueryResponseEntry>>, ApiError> {
    let request: QueryRequest = decode(Endpoint::Query, &body)?;
    debug!(
        "Received query for {} targets over {} - {}",
        request.targets.len(),
        request.range.from,
        request.range.to
    );

    state
        .dispatcher
        .handle_query(request)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(Endpoint::Query, err))
}

/// `OPTIONS /annotations`
pub async fn annotations_options_handler() -> impl IntoResponse {
    [(header::ALLOW, "POST,OPTIONS")]
}

/// `POST /annotations`
pub async fn annotations_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<AnnotationRecord>>, ApiError> {
    let request: AnnotationsRequest = decode(Endpoint::Annotations, &body)?;
    debug!("Received annotation query {:?}", request.annotation.query);

    state
        .dispatcher
        .handle_annotations(request)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(Endpoint::Annotations, err))
}

/// `POST /search`
pub async fn search_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<String>>, ApiError> {
    let request: SearchRequest = decode(Endpoint::Search, &body)?;
    debug!("Received search for {:?}", request.target);

    state
        .dispatcher
        .handle_search(request)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(Endpoint::Search, err))
}

/// `POST /tag-keys`. The body carries no fields but is still validated.
pub async fn tag_keys_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<TagKey>>, ApiError> {
    let _request: TagKeysRequest = decode(Endpoint::TagKeys, &body)?;
    debug!("Received tag keys request");

    state
        .dispatcher
        .handle_tag_keys()
        .await
        .map(Json)
        .map_err(|err| ApiError::new(Endpoint::TagKeys, err))
}

/// `POST /tag-values`
pub async fn tag_values_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<TagValue>>, ApiError> {
    let request: TagValuesRequest = decode(Endpoint::TagValues, &body)?;
    debug!("Received tag values request for key {:?}", request.key);

    state
        .dispatcher
        .handle_tag_values(request)
        .await
        .map(Json)
        .map_err(|err| ApiError::new(Endpoint::TagValues, err))
}
