//! Persistence layer for the storefront service.
//!
//! Exposes a repository-style [`Store`] for reads and a transactional
//! [`UnitOfWork`] for every mutating sequence. Product stock (the stock
//! ledger) is only ever changed through a unit of work.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryUnitOfWork};
pub use postgres::{PgUnitOfWork, PostgresStore};
pub use records::{
    Customer, CustomerProfile, NewOrder, NewOrderItem, NewProduct, OrderItemRecord, OrderRecord,
    Product,
};
pub use store::{Store, UnitOfWork};
