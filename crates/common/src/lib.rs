//! Shared value types for the storefront service.

pub mod money;
pub mod status;
pub mod types;

pub use money::Money;
pub use status::{OrderStatus, PaymentStatus, UnknownStatus};
pub use types::{CategoryId, CustomerId, OrderId, OrderItemId, ProductId, UserId};
