use std::sync::Arc;
use std::time::Duration;

use crate::db::{DbPool, OrmConn};
use crate::gateway::{CardGateway, RedirectGateway};

/// Built once at startup and cloned into every handler. Gateways sit behind
/// trait objects; tests substitute fakes.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub card_gateway: Arc<dyn CardGateway>,
    pub paypal_gateway: Arc<dyn RedirectGateway>,
    pub session_ttl: Duration,
}
