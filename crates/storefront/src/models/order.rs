//! Order read models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use streetlab_core::{Money, OrderId, OrderStatus, PaymentMethod, ProductId, Size};

/// One purchased line as shown on the confirmation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummaryLine {
    pub product_id: ProductId,
    pub name: String,
    pub size: Size,
    pub quantity: u32,
    pub unit_price: Money,
}

/// A committed order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub lines: Vec<OrderSummaryLine>,
}

/// Counters on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DashboardCounts {
    pub total_products: i64,
    pub active_products: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
}
