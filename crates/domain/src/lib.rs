//! Domain layer for the storefront order service.
//!
//! This crate provides:
//! - The order workflow (placement with stock reservation, cancellation with
//!   stock restoration, owner-scoped reads)
//! - The order aggregate assembled from persisted headers and lines
//! - Customer profile lookup and create-or-update

pub mod customer;
pub mod order;

pub use customer::{CustomerError, CustomerService, UpsertedProfile};
pub use order::{
    CancelOrder, LineRequest, Order, OrderError, OrderLine, OrderService, PlaceOrder,
    RequestedItems,
};
