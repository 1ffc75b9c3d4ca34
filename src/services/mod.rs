pub mod admin_service;
pub mod auth_service;
pub mod checkout;
pub mod coupon_service;
pub mod invoice_service;
pub mod payment_service;
pub mod paypal_service;
pub mod product_service;
pub mod ticket_service;
