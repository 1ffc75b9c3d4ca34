use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::tickets::{CreateTicketRequest, TicketList, UpdateTicketStatusRequest},
    entity::tickets::{ActiveModel, Column, Entity as Tickets, Model as TicketModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Ticket,
    response::{ApiResponse, Meta},
    routes::params::TicketQuery,
    state::AppState,
};

const TICKET_STATUSES: [&str; 3] = ["open", "in_progress", "closed"];

/// Ticket creation is open to customers; no auth required.
pub async fn create_ticket(
    state: &AppState,
    payload: CreateTicketRequest,
) -> AppResult<ApiResponse<Ticket>> {
    if payload.subject.trim().is_empty() || payload.body.trim().is_empty() {
        return Err(AppError::BadRequest("Subject and body are required".into()));
    }
    if !payload.requester_email.contains('@') {
        return Err(AppError::BadRequest("Invalid requester email".into()));
    }

    let ticket = ActiveModel {
        id: Set(Uuid::new_v4()),
        subject: Set(payload.subject),
        body: Set(payload.body),
        requester_email: Set(payload.requester_email),
        status: Set("open".into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Ticket created",
        ticket_from_entity(ticket),
        Some(Meta::empty()),
    ))
}

pub async fn list_tickets(
    state: &AppState,
    user: &AuthUser,
    query: TicketQuery,
) -> AppResult<ApiResponse<TicketList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Status.eq(status.clone()));
    }

    let finder = Tickets::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ticket_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Tickets",
        TicketList { items },
        Some(meta),
    ))
}

pub async fn get_ticket(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Ticket>> {
    ensure_admin(user)?;
    let ticket = Tickets::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(ticket_from_entity);
    match ticket {
        Some(t) => Ok(ApiResponse::success("Ticket", t, None)),
        None => Err(AppError::NotFound),
    }
}

pub async fn update_ticket_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateTicketStatusRequest,
) -> AppResult<ApiResponse<Ticket>> {
    ensure_admin(user)?;

    if !TICKET_STATUSES.contains(&payload.status.as_str()) {
        return Err(AppError::BadRequest("Invalid ticket status".into()));
    }

    let existing = Tickets::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(t) => t,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let ticket = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Ticket updated",
        ticket_from_entity(ticket),
        Some(Meta::empty()),
    ))
}

pub async fn delete_ticket(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Tickets::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn ticket_from_entity(model: TicketModel) -> Ticket {
    Ticket {
        id: model.id,
        subject: model.subject,
        body: model.body,
        requester_email: model.requester_email,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
