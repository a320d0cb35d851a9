//! Marketplace listing handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::listing::{CreateListingInput, ListingFilter, UpdateListingInput};
use crate::services::ListingService;
use crate::AppState;

/// Browse listings (public)
pub async fn list_listings(
    State(state): State<AppState>,
    Query(filter): Query<ListingFilter>,
) -> impl IntoResponse {
    let service = ListingService::new(state.db.clone());

    match service.browse(&filter).await {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Current farmer's listings
pub async fn my_listings(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> impl IntoResponse {
    let service = ListingService::new(state.db.clone());

    match service.mine(&current_user.0).await {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a single listing (public)
pub async fn get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = ListingService::new(state.db.clone());

    match service.get(listing_id).await {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_listing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateListingInput>,
) -> impl IntoResponse {
    let service = ListingService::new(state.db.clone());

    match service.create(&current_user.0, input).await {
        Ok(listing) => (StatusCode::CREATED, Json(listing)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_listing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(listing_id): Path<Uuid>,
    Json(input): Json<UpdateListingInput>,
) -> impl IntoResponse {
    let service = ListingService::new(state.db.clone());

    match service.update(&current_user.0, listing_id, input).await {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Soft delete: the listing becomes inactive
pub async fn delete_listing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(listing_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = ListingService::new(state.db.clone());

    match service.deactivate(&current_user.0, listing_id).await {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(e) => e.into_response(),
    }
}
