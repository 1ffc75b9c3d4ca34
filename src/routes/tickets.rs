use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::tickets::{CreateTicketRequest, TicketList, UpdateTicketStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Ticket,
    response::ApiResponse,
    routes::params::TicketQuery,
    services::ticket_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_ticket))
        .route("/", get(list_tickets))
        .route("/{id}", get(get_ticket))
        .route("/{id}/status", patch(update_ticket_status))
        .route("/{id}", delete(delete_ticket))
}

#[utoipa::path(
    post,
    path = "/api/tickets",
    request_body = CreateTicketRequest,
    responses(
        (status = 201, description = "Ticket created", body = ApiResponse<Ticket>)
    ),
    tag = "Tickets"
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    Json(payload): Json<CreateTicketRequest>,
) -> AppResult<Json<ApiResponse<Ticket>>> {
    let resp = ticket_service::create_ticket(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tickets",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TicketQuery>,
) -> AppResult<Json<ApiResponse<TicketList>>> {
    let resp = ticket_service::list_tickets(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/tickets/{id}", security(("bearer_auth" = [])), tag = "Tickets")]
pub async fn get_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ticket>>> {
    let resp = ticket_service::get_ticket(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/tickets/{id}/status",
    request_body = UpdateTicketStatusRequest,
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn update_ticket_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTicketStatusRequest>,
) -> AppResult<Json<ApiResponse<Ticket>>> {
    let resp = ticket_service::update_ticket_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(delete, path = "/api/tickets/{id}", security(("bearer_auth" = [])), tag = "Tickets")]
pub async fn delete_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = ticket_service::delete_ticket(&state, &user, id).await?;
    Ok(Json(resp))
}
