//! HTTP route handlers.

pub mod customers;
pub mod health;
pub mod metrics;
pub mod orders;

use domain::{CustomerService, OrderService};
use store::Store;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub order_service: OrderService<S>,
    pub customer_service: CustomerService<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Builds the services over one shared store.
    pub fn new(store: S) -> Self {
        Self {
            order_service: OrderService::new(store.clone()),
            customer_service: CustomerService::new(store),
        }
    }
}
