use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::handler::Handler;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router, middleware};
use onboard_model::{Book, Entity, User};
use onboard_service::{EntityServices, ServiceError};
use serde_json::Value;

use crate::auth::{Credentials, require_basic_auth};
use crate::envelope::{ApiError, Deleted, Envelope, Inserted};

/// Shared handles behind every route.
#[derive(Clone)]
pub struct AppState {
    pub users: EntityServices<User>,
    pub books: EntityServices<Book>,
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(
        users: EntityServices<User>,
        books: EntityServices<Book>,
        credentials: Credentials,
    ) -> Self {
        Self {
            users,
            books,
            credentials: Arc::new(credentials),
        }
    }
}

/// Build the HTTP API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .merge(entity_routes(state.users, Arc::clone(&state.credentials)))
        .merge(entity_routes(state.books, state.credentials))
}

/// Routes under `/{collection}` for one entity type. Only creation needs
/// credentials.
fn entity_routes<T: Entity>(services: EntityServices<T>, credentials: Arc<Credentials>) -> Router {
    let base = format!("/{}", T::COLLECTION);
    let auth = middleware::from_fn_with_state(credentials, require_basic_auth);

    Router::new()
        .route(&base, get(list::<T>).post(create::<T>.layer(auth)))
        .route(&format!("{base}/count"), get(count::<T>))
        .route(
            &format!("{base}/{{id}}"),
            get(read::<T>).patch(update::<T>).delete(delete::<T>),
        )
        .with_state(services)
}

async fn healthcheck() -> &'static str {
    "OK"
}

type ApiResult<T> = Result<T, ApiError>;

async fn list<T: Entity>(State(services): State<EntityServices<T>>) -> ApiResult<Envelope<T>> {
    let items = services.crud.list().await?;
    Ok(Envelope::items(format!("{} retrieved successfully", title::<T>()), items))
}

async fn count<T: Entity>(State(services): State<EntityServices<T>>) -> ApiResult<Envelope<u64>> {
    let count = services.crud.count().await?;
    Ok(Envelope::data(format!("{} count retrieved successfully", title::<T>()), count))
}

async fn create<T: Entity>(
    State(services): State<EntityServices<T>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Envelope<Inserted>)> {
    let Json(payload) = payload.map_err(invalid_body)?;
    let entity = services.crud.create(payload).await?;
    let inserted_id = entity
        .id()
        .map(|id| id.to_hex())
        .ok_or_else(|| ServiceError::Internal(format!("created {} has no id", T::NAME)))?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(
            format!("{} created successfully", title::<T>()),
            Inserted { inserted_id },
        ),
    ))
}

async fn read<T: Entity>(
    State(services): State<EntityServices<T>>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<T>> {
    let entity = services.crud.read(&id).await?;
    Ok(Envelope::data(format!("{} retrieved successfully", title::<T>()), entity))
}

async fn update<T: Entity>(
    State(services): State<EntityServices<T>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Envelope<T>> {
    let Json(payload) = payload.map_err(invalid_body)?;
    let entity = services.crud.update(&id, payload).await?;
    Ok(Envelope::data(format!("{} updated successfully", title::<T>()), entity))
}

async fn delete<T: Entity>(
    State(services): State<EntityServices<T>>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Deleted>> {
    let deleted_count = services.crud.delete(&id).await?;
    Ok(Envelope::data(
        format!("{} deleted successfully", title::<T>()),
        Deleted { deleted_count },
    ))
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError(ServiceError::InvalidArgument(format!(
        "invalid request body: {}",
        rejection.body_text()
    )))
}

/// "user" -> "User".
fn title<T: Entity>() -> String {
    let mut chars = T::NAME.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
