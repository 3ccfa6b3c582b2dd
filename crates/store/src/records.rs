//! Plain data records persisted by the store.

use chrono::{DateTime, Utc};
use common::{
    CategoryId, CustomerId, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId,
    UserId,
};

/// A catalogue product as seen by the order workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Current unit price.
    pub price: Money,
    /// Available quantity (the stock ledger entry for this product).
    pub stock: u32,
    pub category_id: Option<CategoryId>,
}

/// Fields needed to add a product to the catalogue.
///
/// Catalogue management belongs to another system; this exists to seed the
/// in-memory store.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub category_id: Option<CategoryId>,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            name: name.into(),
            price,
            stock,
            category_id: None,
        }
    }
}

/// Shipping and contact attributes of a customer profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerProfile {
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

/// A customer profile owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: UserId,
    pub profile: CustomerProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted order header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer_id: CustomerId,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted order line.
///
/// `price` and `subtotal` are snapshots taken when the order was placed and
/// are never recomputed from the product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemRecord {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
    pub subtotal: Money,
    pub created_at: DateTime<Utc>,
}

/// Order header to insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub customer_id: CustomerId,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
}

/// Order line to insert.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
    pub subtotal: Money,
}
