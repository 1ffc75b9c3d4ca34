use backoffice_api::gateway::format_amount;
use backoffice_api::routes::health::health_check;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
}

#[test]
fn amounts_render_as_provider_decimals() {
    assert_eq!(format_amount(0), "0.00");
    assert_eq!(format_amount(5), "0.05");
    assert_eq!(format_amount(100), "1.00");
    assert_eq!(format_amount(12345), "123.45");
    assert_eq!(format_amount(999999), "9999.99");
}
