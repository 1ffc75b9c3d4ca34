use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

use backoffice_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::payments::{
        CardDetails, CardPaymentRequest, CustomerDetails, OrderLine, PaypalCheckoutRequest,
        PaypalReturnQuery,
    },
    entity::products::ActiveModel as ProductActive,
    error::AppError,
    gateway::{
        CardCharge, CardGateway, CardReceipt, CreatedPayment, ExecutedPayment, GatewayError,
        RedirectCheckout, RedirectGateway,
    },
    jobs::session_sweep,
    models::{InvoiceItem, PaypalSession},
    services::{payment_service, paypal_service},
    state::AppState,
};

struct FakeCardGateway {
    decline: bool,
}

#[async_trait]
impl CardGateway for FakeCardGateway {
    async fn charge(&self, charge: &CardCharge) -> Result<CardReceipt, GatewayError> {
        if self.decline {
            return Err(GatewayError::Declined("This transaction was declined".into()));
        }
        Ok(CardReceipt {
            transaction_id: format!("authnet-{}", charge.idempotency_key),
        })
    }
}

struct FakePaypalGateway;

#[async_trait]
impl RedirectGateway for FakePaypalGateway {
    async fn create_payment(
        &self,
        _checkout: &RedirectCheckout,
    ) -> Result<CreatedPayment, GatewayError> {
        let payment_id = format!("PAYID-{}", Uuid::new_v4().simple());
        Ok(CreatedPayment {
            approval_url: format!("https://paypal.test/approve/{payment_id}"),
            payment_id,
        })
    }

    async fn execute_payment(
        &self,
        _payment_id: &str,
        _payer_id: &str,
        _amount: i64,
        _currency: &str,
    ) -> Result<ExecutedPayment, GatewayError> {
        Ok(ExecutedPayment {
            payer_name: "Test Buyer".into(),
            payer_email: "buyer@example.com".into(),
            payer_external_id: Some("PAYER-1".into()),
        })
    }
}

// Integration flow: card checkout with sufficient and insufficient stock,
// the full PayPal redirect round trip, duplicate callbacks, and the
// session sweep.
#[tokio::test]
async fn card_and_paypal_reconciliation_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    // Seed one product with exactly 5 in stock.
    let widget = seed_product(&state, "Reconciliation Widget", 1000, 5).await?;

    // A request for 6 fails before any mutation.
    let err = payment_service::pay_with_card(
        &state,
        card_request(vec![OrderLine {
            product_id: widget.id,
            quantity: 6,
        }]),
    )
    .await
    .expect_err("oversell must be rejected");
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(product_stock(&state, widget.id).await?, 5);
    assert_eq!(invoice_count(&state).await?, 0);

    // A request for all 5 drains the stock and records one invoice.
    let resp = payment_service::pay_with_card(
        &state,
        card_request(vec![OrderLine {
            product_id: widget.id,
            quantity: 5,
        }]),
    )
    .await?;
    let invoice = resp.data.expect("card payment response").invoice;
    assert_eq!(invoice.amount, 5000);
    assert_eq!(invoice.payment_status, "successful");
    assert_eq!(invoice.payment_gateway, "authorize_net");
    assert_eq!(invoice.product_id, Some(widget.id));
    assert_eq!(product_stock(&state, widget.id).await?, 0);
    assert_eq!(invoice_count(&state).await?, 1);

    // A declined charge leaves no trace.
    let declining = with_declining_card(&state);
    let gadget = seed_product(&declining, "Declined Gadget", 2500, 3).await?;
    let err = payment_service::pay_with_card(
        &declining,
        card_request(vec![OrderLine {
            product_id: gadget.id,
            quantity: 1,
        }]),
    )
    .await
    .expect_err("decline must propagate");
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(product_stock(&state, gadget.id).await?, 3);
    assert_eq!(invoice_count(&state).await?, 1);

    // Unknown products 404 before the gateway is involved.
    let err = payment_service::pay_with_card(
        &state,
        card_request(vec![OrderLine {
            product_id: Uuid::new_v4(),
            quantity: 1,
        }]),
    )
    .await
    .expect_err("unknown product must be rejected");
    assert!(matches!(err, AppError::MissingResource(_)));

    // PayPal round trip over two products.
    let lamp = seed_product(&state, "Desk Lamp", 4900, 10).await?;
    let roll = seed_product(&state, "Label Roll", 799, 20).await?;

    let created = paypal_service::start_checkout(
        &state,
        PaypalCheckoutRequest {
            items: vec![
                OrderLine {
                    product_id: lamp.id,
                    quantity: 2,
                },
                OrderLine {
                    product_id: roll.id,
                    quantity: 3,
                },
            ],
        },
    )
    .await?
    .data
    .expect("paypal checkout response");

    let session = sqlx::query_as::<_, PaypalSession>(
        "SELECT * FROM paypal_sessions WHERE payment_id = $1",
    )
    .bind(&created.payment_id)
    .fetch_one(&state.pool)
    .await?;
    assert_eq!(session.total_amount, 2 * 4900 + 3 * 799);
    assert_eq!(session.product_ids.len(), 2);

    // Stock is untouched until the buyer returns.
    assert_eq!(product_stock(&state, lamp.id).await?, 10);

    let executed = paypal_service::complete_checkout(
        &state,
        PaypalReturnQuery {
            payment_id: created.payment_id.clone(),
            payer_id: "PAYER-1".into(),
        },
    )
    .await?
    .data
    .expect("executed payment response");

    assert_eq!(executed.invoice.id, created.payment_id);
    assert_eq!(executed.invoice.payment_gateway, "paypal");
    assert_eq!(executed.invoice.amount, session.total_amount);
    assert_eq!(executed.items.len(), 2);
    assert_eq!(product_stock(&state, lamp.id).await?, 8);
    assert_eq!(product_stock(&state, roll.id).await?, 17);

    let items = sqlx::query_as::<_, InvoiceItem>(
        "SELECT * FROM invoice_items WHERE invoice_id = $1",
    )
    .bind(&created.payment_id)
    .fetch_all(&state.pool)
    .await?;
    assert_eq!(items.len(), 2);

    // The session survives consumption; only the sweep removes it.
    let remaining: (i64,) =
        sqlx::query_as("SELECT count(*) FROM paypal_sessions WHERE payment_id = $1")
            .bind(&created.payment_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(remaining.0, 1);

    // A repeated callback cannot produce a second invoice.
    let err = paypal_service::complete_checkout(
        &state,
        PaypalReturnQuery {
            payment_id: created.payment_id.clone(),
            payer_id: "PAYER-1".into(),
        },
    )
    .await
    .expect_err("duplicate callback must be rejected");
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(product_stock(&state, lamp.id).await?, 8);

    // An unknown payment id finds no session and records nothing.
    let err = paypal_service::complete_checkout(
        &state,
        PaypalReturnQuery {
            payment_id: "PAYID-UNKNOWN".into(),
            payer_id: "PAYER-1".into(),
        },
    )
    .await
    .expect_err("unknown session must be rejected");
    assert!(matches!(err, AppError::MissingResource(_)));

    // Sweep: sessions older than the TTL vanish, younger ones stay.
    state
        .orm
        .execute(Statement::from_string(
            state.orm.get_database_backend(),
            format!(
                "UPDATE paypal_sessions SET created_at = now() - interval '2 hours' \
                 WHERE payment_id = '{}'",
                created.payment_id
            ),
        ))
        .await?;
    sqlx::query(
        r#"
        INSERT INTO paypal_sessions
            (payment_id, total_amount, currency, product_ids, quantities, unit_prices)
        VALUES ('PAYID-FRESH', 100, 'USD', $1, $2, $3)
        "#,
    )
    .bind(vec![lamp.id])
    .bind(vec![1i32])
    .bind(vec![100i64])
    .execute(&state.pool)
    .await?;

    let removed = session_sweep::sweep_expired(&state.pool, Duration::from_secs(3600)).await?;
    assert_eq!(removed, 1);

    let left: (i64,) = sqlx::query_as("SELECT count(*) FROM paypal_sessions")
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(left.0, 1);

    // A buyer returning after the sweep finds no session.
    let err = paypal_service::complete_checkout(
        &state,
        PaypalReturnQuery {
            payment_id: created.payment_id,
            payer_id: "PAYER-1".into(),
        },
    )
    .await
    .expect_err("swept session must be gone");
    assert!(matches!(err, AppError::MissingResource(_)));

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs; coupons are owned by the coupon flow test.
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE invoice_items, invoices, paypal_sessions, audit_logs, products, \
         inventory_stocks, tickets, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState {
        pool,
        orm,
        card_gateway: Arc::new(FakeCardGateway { decline: false }),
        paypal_gateway: Arc::new(FakePaypalGateway),
        session_ttl: Duration::from_secs(3600),
    })
}

fn with_declining_card(state: &AppState) -> AppState {
    AppState {
        card_gateway: Arc::new(FakeCardGateway { decline: true }),
        ..state.clone()
    }
}

async fn seed_product(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<backoffice_api::models::Product> {
    let model = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        description: Set(Some("test product".into())),
        price: Set(price),
        currency: Set("USD".into()),
        stock: Set(stock),
        low_stock_threshold: Set(5),
        stock_id: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(backoffice_api::models::Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        currency: model.currency,
        stock: model.stock,
        low_stock_threshold: model.low_stock_threshold,
        stock_id: model.stock_id,
        created_at: model.created_at.with_timezone(&chrono::Utc),
    })
}

fn card_request(items: Vec<OrderLine>) -> CardPaymentRequest {
    CardPaymentRequest {
        items,
        card: CardDetails {
            card_number: "4111111111111111".into(),
            expiration: "1230".into(),
            card_code: "123".into(),
        },
        customer: CustomerDetails {
            name: "Ada Tester".into(),
            email: "ada@example.com".into(),
        },
    }
}

async fn product_stock(state: &AppState, id: Uuid) -> anyhow::Result<i32> {
    let row: (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    Ok(row.0)
}

async fn invoice_count(state: &AppState) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM invoices")
        .fetch_one(&state.pool)
        .await?;
    Ok(row.0)
}
