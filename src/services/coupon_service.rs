use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::coupons::{CouponList, CouponValidation, CreateCouponRequest, UpdateCouponRequest},
    entity::coupons::{ActiveModel, Column, Entity as Coupons, Model as CouponModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Coupon,
    response::{ApiResponse, Meta},
    routes::params::CouponQuery,
    state::AppState,
};

pub async fn list_coupons(
    state: &AppState,
    user: &AuthUser,
    query: CouponQuery,
) -> AppResult<ApiResponse<CouponList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if query.active_only.unwrap_or(false) {
        condition = condition.add(Column::ExpiresAt.gt(Utc::now()));
    }

    let finder = Coupons::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(coupon_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Coupons",
        CouponList { items },
        Some(meta),
    ))
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;

    if payload.name.trim().is_empty() || payload.code.trim().is_empty() {
        return Err(AppError::BadRequest("Name and code are required".into()));
    }
    validate_percent(payload.discount_percent)?;
    if payload.max_uses <= 0 {
        return Err(AppError::BadRequest("max_uses must be positive".into()));
    }
    let expires_at = parse_expiry(&payload.expires_at)?;

    let exists = Coupons::find()
        .filter(Column::Code.eq(payload.code.clone()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("Coupon code already exists".into()));
    }

    let coupon = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        code: Set(payload.code),
        discount_percent: Set(payload.discount_percent),
        times_used: Set(0),
        max_uses: Set(payload.max_uses),
        expires_at: Set(expires_at.into()),
        created_by: Set(Some(user.user_id)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "coupon_create",
        Some("coupons"),
        Some(serde_json::json!({ "coupon_id": coupon.id, "code": coupon.code })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Coupon created",
        coupon_from_entity(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn update_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;

    let existing = Coupons::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(percent) = payload.discount_percent {
        validate_percent(percent)?;
        active.discount_percent = Set(percent);
    }
    if let Some(max_uses) = payload.max_uses {
        if max_uses <= 0 {
            return Err(AppError::BadRequest("max_uses must be positive".into()));
        }
        active.max_uses = Set(max_uses);
    }
    if let Some(expires_at) = payload.expires_at {
        active.expires_at = Set(parse_expiry(&expires_at)?.into());
    }

    let coupon = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Coupon updated",
        coupon_from_entity(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn delete_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Coupons::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Check a code without consuming a use. Unknown, expired and exhausted
/// codes fail distinctly.
pub async fn validate_coupon(
    state: &AppState,
    code: &str,
) -> AppResult<ApiResponse<CouponValidation>> {
    let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
        .bind(code)
        .fetch_optional(&state.pool)
        .await?;
    let coupon = match coupon {
        Some(c) => c,
        None => return Err(AppError::MissingResource(format!("coupon {code}"))),
    };

    classify(&coupon)?;

    Ok(ApiResponse::success(
        "Coupon is valid",
        CouponValidation {
            code: coupon.code,
            discount_percent: coupon.discount_percent,
            remaining_uses: coupon.max_uses - coupon.times_used,
        },
        Some(Meta::empty()),
    ))
}

/// Consume one use. The guard and the increment are a single conditional
/// UPDATE, so concurrent redemptions can never overshoot max_uses.
pub async fn redeem_coupon(state: &AppState, code: &str) -> AppResult<ApiResponse<Coupon>> {
    let updated = sqlx::query_as::<_, Coupon>(
        r#"
        UPDATE coupons
        SET times_used = times_used + 1
        WHERE code = $1 AND expires_at > now() AND times_used < max_uses
        RETURNING *
        "#,
    )
    .bind(code)
    .fetch_optional(&state.pool)
    .await?;

    if let Some(coupon) = updated {
        return Ok(ApiResponse::success(
            "Coupon redeemed",
            coupon,
            Some(Meta::empty()),
        ));
    }

    // The guard rejected the row; re-read to say why.
    let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
        .bind(code)
        .fetch_optional(&state.pool)
        .await?;
    match coupon {
        None => Err(AppError::MissingResource(format!("coupon {code}"))),
        Some(coupon) => {
            classify(&coupon)?;
            // The guard failed but the row now passes both checks: a
            // concurrent update landed between the two statements.
            Err(AppError::Conflict("Coupon state changed, retry".into()))
        }
    }
}

fn classify(coupon: &Coupon) -> AppResult<()> {
    if coupon.expires_at <= Utc::now() {
        return Err(AppError::BadRequest("Coupon expired".into()));
    }
    if coupon.times_used >= coupon.max_uses {
        return Err(AppError::BadRequest("Usage limit reached".into()));
    }
    Ok(())
}

fn validate_percent(percent: i32) -> AppResult<()> {
    if !(0..=100).contains(&percent) {
        return Err(AppError::BadRequest(
            "discount_percent must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

fn parse_expiry(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::BadRequest("Invalid expiry date".into()))
}

fn coupon_from_entity(model: CouponModel) -> Coupon {
    Coupon {
        id: model.id,
        name: model.name,
        code: model.code,
        discount_percent: model.discount_percent,
        times_used: model.times_used,
        max_uses: model.max_uses,
        expires_at: model.expires_at.with_timezone(&Utc),
        created_by: model.created_by,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
