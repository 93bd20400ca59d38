use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRef, Path, Query, State,
    },
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::api::auth::{Principal, TokenVerifier, Writer};
use crate::api::error::{api_error, error_response, json_rejection, query_rejection, ApiError};
use crate::api::routes::API_BASE_PATH;
use crate::logic::{IdGenerator, Outcome, Resource, ResourceService};
use crate::model::{ListParams, MarketUser, Page};
use crate::store::traits::Store;

/// Shared request state: the mutation service over one store backend and
/// the bearer-token verifier.
pub struct AppState<S: Store> {
    pub service: ResourceService<S>,
    pub verifier: Arc<TokenVerifier>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: Arc<S>, verifier: TokenVerifier) -> Self {
        Self {
            service: ResourceService::new(store, Arc::new(IdGenerator::new())),
            verifier: Arc::new(verifier),
        }
    }
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            verifier: Arc::clone(&self.verifier),
        }
    }
}

impl<S: Store> FromRef<AppState<S>> for Arc<TokenVerifier> {
    fn from_ref(state: &AppState<S>) -> Self {
        Arc::clone(&state.verifier)
    }
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

fn location<E: Resource>(entity: &E) -> String {
    format!("{}/{}/{}", API_BASE_PATH, E::COLLECTION, entity.id())
}

fn created<E: Resource>(entity: E) -> Response {
    let location = location(&entity);
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(entity),
    )
        .into_response()
}

pub async fn list_resources<S: Store + 'static, E: Resource>(
    State(state): State<AppState<S>>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<E>>, ApiError> {
    let Query(params) = query.map_err(query_rejection)?;
    let page = state.service.list::<E>(&params).await.map_err(error_response)?;
    Ok(Json(page))
}

pub async fn get_resource<S: Store + 'static, E: Resource>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<E>, ApiError> {
    let entity = state.service.get::<E>(&id).await.map_err(error_response)?;
    Ok(Json(entity))
}

pub async fn create_resource<S: Store + 'static, E: Resource>(
    State(state): State<AppState<S>>,
    Writer(principal): Writer,
    body: Result<Json<E::Draft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(draft) = body.map_err(json_rejection)?;
    let entity = state
        .service
        .create::<E>(draft, &principal.subject)
        .await
        .map_err(error_response)?;
    Ok(created(entity))
}

pub async fn replace_resource<S: Store + 'static, E: Resource>(
    State(state): State<AppState<S>>,
    Writer(principal): Writer,
    Path(id): Path<String>,
    body: Result<Json<E::Draft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(draft) = body.map_err(json_rejection)?;
    let outcome = state
        .service
        .replace::<E>(&id, draft, &principal.subject)
        .await
        .map_err(error_response)?;

    Ok(match outcome {
        Outcome::Created(entity) => created(entity),
        Outcome::Updated(entity) => (StatusCode::OK, Json(entity)).into_response(),
    })
}

/// Accepts `application/json-patch+json` bodies.
pub async fn patch_resource<S: Store + 'static, E: Resource>(
    State(state): State<AppState<S>>,
    Writer(principal): Writer,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<E>, ApiError> {
    let Json(document) = body.map_err(json_rejection)?;
    let entity = state
        .service
        .patch::<E>(&id, document, &principal.subject)
        .await
        .map_err(error_response)?;
    Ok(Json(entity))
}

pub async fn delete_resource<S: Store + 'static, E: Resource>(
    State(state): State<AppState<S>>,
    Writer(principal): Writer,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete::<E>(&id, &principal.subject)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// The market user registered for the caller's identity-provider subject.
pub async fn whoami<S: Store + 'static>(
    State(state): State<AppState<S>>,
    principal: Principal,
) -> Result<Json<MarketUser>, ApiError> {
    let user = state
        .service
        .user_by_subject(&principal.subject)
        .await
        .map_err(error_response)?;
    Ok(Json(user))
}

pub async fn no_handler(method: Method, uri: Uri) -> ApiError {
    let message = format!("No handler found for {} {}", method, uri.path());
    api_error(StatusCode::NOT_FOUND, &message, vec![message.clone()])
}

