use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_method")]
pub enum PaymentMethod {
    Online,
    #[sqlx(rename = "Cash-on-delivery")]
    #[serde(rename = "Cash-on-delivery")]
    CashOnDelivery,
}

/// A cart line captured at order time. `id` is a loosely-typed product
/// reference; it is compared as text against `products.id` during
/// category attribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub size: String,
    pub price: f64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub note: String,
    pub cart_items: Json<Vec<CartItem>>,
    pub shipping_charge: f64,
    /// Caller-supplied total, stored verbatim.
    pub total: f64,
    /// Server-side sum of price×quantity plus shipping, kept alongside the
    /// claimed total for reconciliation.
    pub computed_total: f64,
    pub payment_method: PaymentMethod,
    pub payment_details: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_details: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_details: CustomerDetails,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
    pub total: f64,
    pub payment_info: PaymentInfo,
    #[serde(default)]
    pub shipping_charge: Option<f64>,
}

impl CreateOrderRequest {
    /// Item subtotal plus shipping, computed server-side.
    pub fn computed_total(&self) -> f64 {
        let subtotal: f64 = self
            .cart_items
            .iter()
            .map(|item| item.price * item.quantity as f64)
            .sum();
        subtotal + self.shipping_charge.unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_orders: i64,
    pub online_transactions: i64,
    pub total_revenue: f64,
    pub total_products: i64,
    pub out_of_stock_count: i64,
    pub fashion_revenue: f64,
    pub cosmetics_revenue: f64,
    pub fashion_orders: i64,
    pub cosmetics_orders: i64,
    pub customer_count: i64,
}
