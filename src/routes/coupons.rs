use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::coupons::{CouponList, CouponValidation, CreateCouponRequest, UpdateCouponRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Coupon,
    response::ApiResponse,
    routes::params::CouponQuery,
    services::coupon_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_coupons))
        .route("/", post(create_coupon))
        .route("/{id}", put(update_coupon))
        .route("/{id}", delete(delete_coupon))
        .route("/{code}/validate", post(validate_coupon))
        .route("/{code}/redeem", put(redeem_coupon))
}

#[utoipa::path(
    get,
    path = "/api/coupons",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("active_only" = Option<bool>, Query, description = "Skip expired coupons"),
    ),
    responses(
        (status = 200, description = "List coupons", body = ApiResponse<CouponList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CouponQuery>,
) -> AppResult<Json<ApiResponse<CouponList>>> {
    let resp = coupon_service::list_coupons(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Create coupon", body = ApiResponse<Coupon>),
        (status = 400, description = "Invalid payload"),
    ),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    let resp = coupon_service::create_coupon(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/coupons/{id}",
    request_body = UpdateCouponRequest,
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    let resp = coupon_service::update_coupon(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/coupons/{id}",
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = coupon_service::delete_coupon(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/coupons/{code}/validate",
    responses(
        (status = 200, description = "Coupon is redeemable", body = ApiResponse<CouponValidation>),
        (status = 400, description = "Expired or usage limit reached"),
        (status = 404, description = "Unknown code"),
    ),
    tag = "Coupons"
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<CouponValidation>>> {
    let resp = coupon_service::validate_coupon(&state, &code).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/coupons/{code}/redeem",
    responses(
        (status = 200, description = "Usage counter advanced", body = ApiResponse<Coupon>),
        (status = 400, description = "Expired or usage limit reached"),
        (status = 404, description = "Unknown code"),
    ),
    tag = "Coupons"
)]
pub async fn redeem_coupon(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    let resp = coupon_service::redeem_coupon(&state, &code).await?;
    Ok(Json(resp))
}
