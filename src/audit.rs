use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

pub async fn log_audit(
    pool: &DbPool,
    actor_id: Option<Uuid>,
    action: &str,
    entity: Option<&str>,
    detail: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, actor_id, action, entity, detail)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(actor_id)
    .bind(action)
    .bind(entity)
    .bind(detail)
    .execute(pool)
    .await?;

    Ok(())
}
