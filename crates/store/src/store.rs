use async_trait::async_trait;
use common::{CustomerId, OrderId, OrderStatus, PaymentStatus, ProductId, UserId};

use crate::{
    Customer, CustomerProfile, NewOrder, NewOrderItem, OrderItemRecord, OrderRecord, Product,
    Result,
};

/// Read access to the storefront tables and the entry point for units of work.
///
/// All implementations must be thread-safe (Send + Sync). Reads issued here
/// see committed state only.
#[async_trait]
pub trait Store: Send + Sync {
    /// The transactional handle returned by [`Store::begin`].
    type UnitOfWork: UnitOfWork;

    /// Opens a new atomic unit of work.
    ///
    /// Dropping the returned handle without calling [`UnitOfWork::commit`]
    /// discards every write made through it.
    async fn begin(&self) -> Result<Self::UnitOfWork>;

    /// Retrieves a product by ID.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Retrieves every existing product among `ids`.
    ///
    /// Missing IDs are silently absent from the result.
    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Retrieves a customer by ID regardless of owner.
    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    /// Retrieves the customer profile owned by a user.
    async fn find_customer_by_user(&self, user_id: UserId) -> Result<Option<Customer>>;

    /// Retrieves an order if it exists and belongs to `user_id`.
    async fn find_order_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderRecord>>;

    /// Lists the orders of a user, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderRecord>>;

    /// Retrieves the lines of the given orders.
    ///
    /// Lines are returned grouped by order and, within an order, in the order
    /// they were inserted.
    async fn find_items_for_orders(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItemRecord>>;
}

/// An atomic, isolated unit of work.
///
/// Every read-validate-write sequence of the order workflow runs through one
/// of these. Either everything written through it becomes visible on
/// [`commit`](UnitOfWork::commit), or nothing does.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Finds a customer by `(id, user_id)`.
    async fn find_customer_for_user(
        &mut self,
        id: CustomerId,
        user_id: UserId,
    ) -> Result<Option<Customer>>;

    /// Finds and locks the customer profile owned by a user.
    async fn lock_customer_by_user(&mut self, user_id: UserId) -> Result<Option<Customer>>;

    /// Inserts a new customer profile for a user.
    async fn insert_customer(
        &mut self,
        user_id: UserId,
        profile: &CustomerProfile,
    ) -> Result<Customer>;

    /// Replaces the attributes of an existing customer profile.
    async fn update_customer(
        &mut self,
        id: CustomerId,
        profile: &CustomerProfile,
    ) -> Result<Customer>;

    /// Reads a product and locks its row until the unit of work ends.
    ///
    /// Concurrent units locking the same product serialize here, so a stock
    /// check made after this call cannot be invalidated by another order.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Reduces a product's stock by `quantity`, flooring at zero.
    ///
    /// Returns the new stock level.
    async fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> Result<u32>;

    /// Increases a product's stock by `quantity`.
    ///
    /// Returns the new stock level, or `None` if the product no longer exists.
    async fn increment_stock(&mut self, id: ProductId, quantity: u32) -> Result<Option<u32>>;

    /// Inserts an order header.
    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord>;

    /// Inserts an order line.
    async fn insert_order_item(&mut self, item: NewOrderItem) -> Result<OrderItemRecord>;

    /// Finds and locks an order if it belongs to `user_id`.
    async fn lock_order_for_user(
        &mut self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderRecord>>;

    /// Retrieves the lines of an order in insertion order.
    async fn find_order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Sets the status and payment status of an order.
    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> Result<OrderRecord>;

    /// Makes every write of this unit of work durable and visible.
    async fn commit(self) -> Result<()>;

    /// Discards every write of this unit of work.
    async fn rollback(self) -> Result<()>;
}
