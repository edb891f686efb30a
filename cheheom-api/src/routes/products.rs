use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use cheheom_shared::errors::{AppError, AppResult};
use cheheom_shared::types::{Product, ProductResponse, ProductsResponse, UserType};

use crate::auth::AuthUser;
use crate::services::product_service;
use crate::AppState;

pub async fn create_product(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(product): Json<Product>,
) -> AppResult<Json<ProductResponse>> {
    if user.user_type != UserType::Business {
        return Err(AppError::forbidden("only business accounts can register products"));
    }

    let product = product_service::create(&state.store, &user.id, product).await?;
    Ok(Json(ProductResponse { success: true, product }))
}

pub async fn list_products(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ProductsResponse>> {
    let products = product_service::list_for_owner(&state.store, &user.id).await?;
    Ok(Json(ProductsResponse { success: true, products }))
}
