//! Order aggregate, commands and the order workflow.

mod aggregate;
mod commands;
mod service;

pub use aggregate::{Order, OrderLine};
pub use commands::{CancelOrder, LineRequest, PlaceOrder, RequestedItems};
pub use service::OrderService;

use common::{OrderStatus, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request is malformed (e.g. missing or empty item list).
    #[error("{0}")]
    InvalidRequest(String),

    /// The customer does not exist or belongs to another user.
    #[error("Customer not found or does not belong to the current user")]
    CustomerNotFound,

    /// A requested product does not exist.
    #[error("Product with ID {product_id} not found")]
    ProductNotFound { product_id: ProductId },

    /// The order does not exist or belongs to another user.
    #[error("Order not found")]
    OrderNotFound,

    /// A line asks for more than the product has in stock.
    #[error(
        "Insufficient stock for product: {product}. Available: {available}, Requested: {requested}"
    )]
    InsufficientStock {
        product: String,
        available: u32,
        requested: u32,
    },

    /// The order is not in a status that allows the action.
    #[error("Cannot cancel order with status: {status}")]
    InvalidState { status: OrderStatus },

    /// Any other failure, e.g. the store being unavailable.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl OrderError {
    /// Short machine-readable label, used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::InvalidRequest(_) => "invalid_request",
            OrderError::CustomerNotFound
            | OrderError::ProductNotFound { .. }
            | OrderError::OrderNotFound => "not_found",
            OrderError::InsufficientStock { .. } => "insufficient_stock",
            OrderError::InvalidState { .. } => "invalid_state",
            OrderError::Store(_) => "unexpected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_names_quantities() {
        let err = OrderError::InsufficientStock {
            product: "Widget".to_string(),
            available: 2,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product: Widget. Available: 2, Requested: 3"
        );
        assert_eq!(err.kind(), "insufficient_stock");
    }

    #[test]
    fn test_invalid_state_names_status() {
        let err = OrderError::InvalidState {
            status: OrderStatus::Shipped,
        };
        assert_eq!(err.to_string(), "Cannot cancel order with status: shipped");
    }

    #[test]
    fn test_product_not_found_names_id() {
        let err = OrderError::ProductNotFound {
            product_id: ProductId::new(42),
        };
        assert_eq!(err.to_string(), "Product with ID 42 not found");
        assert_eq!(err.kind(), "not_found");
    }
}
