use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::GlobalKeyExtractor,
    GovernorLayer,
};
use tracing::{debug, warn};

use crate::auth::verify_password;

use super::error::ApiError;
use super::responses::{
    AuthRequest, AuthResponse, CreatedResponse, HealthResponse, MessageResponse, ProductPayload,
    ProductResponse, UpdatedResponse, UserResponse,
};
use super::state::AppState;

pub fn router(state: AppState) -> Router {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(20)
            .burst_size(50)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .expect("default governor config is valid"),
    );

    Router::new()
        .route("/health", get(health))
        .route("/usuarios", get(list_users).post(authenticate))
        .route("/productos", get(list_products).post(create_product))
        .route(
            "/productos/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .layer(GovernorLayer::new(governor_conf))
        .layer(tower_http::request_id::SetRequestIdLayer::new(
            axum::http::header::HeaderName::from_static("x-request-id"),
            tower_http::request_id::MakeRequestUuid::default(),
        ))
        .layer(tower_http::request_id::PropagateRequestIdLayer::new(
            axum::http::header::HeaderName::from_static("x-request-id"),
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let products = state.store.count_products().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        products,
    }))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.store.list_users().await?;
    debug!(users = users.len(), "user list requested");
    Ok(Json(
        users.into_iter().map(UserResponse::from).collect::<Vec<_>>(),
    ))
}

async fn authenticate(
    State(state): State<AppState>,
    Json(request): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (username, password) = request.credentials()?;

    let user = state
        .store
        .find_user_by_name(username)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    if !verify_password(password, &user.password_hash) {
        warn!(user = %user.name, "authentication failed");
        return Err(ApiError::Unauthorized);
    }

    debug!(user = %user.name, "authenticated");
    Ok(Json(AuthResponse {
        message: "authenticated",
        user: UserResponse::from(user),
    }))
}

async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.store.list_products().await?;
    // An empty catalog is reported as 404, not as an empty success array.
    if products.is_empty() {
        return Err(ApiError::NoProducts);
    }
    debug!(products = products.len(), "product list requested");
    Ok(Json(
        products
            .into_iter()
            .map(ProductResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .store
        .get_product(id)
        .await?
        .ok_or(ApiError::ProductNotFound)?;
    Ok(Json(ProductResponse::from(product)))
}

async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let fields = payload.validate()?;
    let product = state.store.create_product(&fields).await?;
    debug!(id = product.id, name = %product.name, "product created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "product created",
            id: product.id,
            product: ProductResponse::from(product),
        }),
    ))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    // Validation happens before any store access.
    let fields = payload.validate()?;
    let product = state
        .store
        .update_product(id, &fields)
        .await?
        .ok_or(ApiError::ProductNotFound)?;
    debug!(id, "product updated");
    Ok(Json(UpdatedResponse {
        message: "product updated",
        product: ProductResponse::from(product),
    }))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.store.delete_product(id).await? {
        return Err(ApiError::ProductNotFound);
    }
    debug!(id, "product deleted");
    Ok(Json(MessageResponse {
        message: "product deleted",
    }))
}
