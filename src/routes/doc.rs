use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        coupons::{CouponList, CouponValidation},
        invoices::{InvoiceList, InvoiceWithItems},
        payments::{CardPaymentResponse, PaypalCheckoutResponse},
        products::{ProductList, StockList},
        tickets::TicketList,
    },
    models::{Coupon, InventoryStock, Invoice, InvoiceItem, Product, Ticket, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, coupons, health, invoices, params, payments, products, tickets},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        coupons::list_coupons,
        coupons::create_coupon,
        coupons::update_coupon,
        coupons::delete_coupon,
        coupons::validate_coupon,
        coupons::redeem_coupon,
        payments::pay_with_card,
        payments::paypal_checkout,
        payments::paypal_success,
        payments::paypal_cancel,
        invoices::list_invoices,
        invoices::get_invoice,
        invoices::update_payment_status,
        tickets::create_ticket,
        tickets::list_tickets,
        tickets::get_ticket,
        tickets::update_ticket_status,
        tickets::delete_ticket,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::list_stocks,
        admin::create_stock
    ),
    components(
        schemas(
            User,
            Product,
            Coupon,
            Invoice,
            InvoiceItem,
            InventoryStock,
            Ticket,
            ProductList,
            StockList,
            CouponList,
            CouponValidation,
            InvoiceList,
            InvoiceWithItems,
            CardPaymentResponse,
            PaypalCheckoutResponse,
            TicketList,
            params::Pagination,
            params::ProductQuery,
            params::CouponQuery,
            params::InvoiceQuery,
            params::TicketQuery,
            params::LowStockQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Coupon>,
            ApiResponse<CouponList>,
            ApiResponse<Invoice>,
            ApiResponse<InvoiceList>,
            ApiResponse<InvoiceWithItems>,
            ApiResponse<CardPaymentResponse>,
            ApiResponse<PaypalCheckoutResponse>,
            ApiResponse<Ticket>,
            ApiResponse<TicketList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Coupons", description = "Coupon endpoints"),
        (name = "Payments", description = "Payment gateway endpoints"),
        (name = "Invoices", description = "Invoice endpoints"),
        (name = "Tickets", description = "Support ticket endpoints"),
        (name = "Admin", description = "Inventory administration endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
