use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{CustomerId, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Customer, CustomerProfile, NewOrder, NewOrderItem, NewProduct, OrderItemRecord, OrderRecord,
    Product, Result, StoreError,
    store::{Store, UnitOfWork},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    customers: BTreeMap<CustomerId, Customer>,
    orders: BTreeMap<OrderId, OrderRecord>,
    order_items: BTreeMap<OrderItemId, OrderItemRecord>,
    product_seq: i64,
    customer_seq: i64,
    order_seq: i64,
    order_item_seq: i64,
}

impl Tables {
    fn customer_by_user(&self, user_id: UserId) -> Option<&Customer> {
        self.customers.values().find(|c| c.user_id == user_id)
    }

    fn items_of(&self, order_id: OrderId) -> Vec<OrderItemRecord> {
        // BTreeMap iteration is ascending by item id, i.e. insertion order.
        self.order_items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }
}

/// In-memory store implementation for testing.
///
/// Units of work are fully serialized: [`Store::begin`] takes an exclusive
/// lock on the tables and works on a private copy, which replaces the shared
/// tables on commit and is thrown away on rollback or drop. Reads through
/// [`Store`] wait while a unit of work is open.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_on_commit: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every subsequent commit to fail with [`StoreError::Unavailable`].
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Adds a product to the catalogue.
    pub async fn insert_product(&self, product: NewProduct) -> Product {
        let mut tables = self.tables.lock().await;
        tables.product_seq += 1;
        let product = Product {
            id: ProductId::new(tables.product_seq),
            name: product.name,
            description: None,
            price: product.price,
            stock: product.stock,
            category_id: product.category_id,
        };
        tables.products.insert(product.id, product.clone());
        product
    }

    /// Removes a product from the catalogue. Order lines referencing it are kept.
    pub async fn delete_product(&self, id: ProductId) -> bool {
        self.tables.lock().await.products.remove(&id).is_some()
    }

    /// Returns the current stock of a product.
    pub async fn product_stock(&self, id: ProductId) -> Option<u32> {
        self.tables.lock().await.products.get(&id).map(|p| p.stock)
    }

    /// Adds a customer profile for a user.
    pub async fn insert_customer(&self, user_id: UserId, profile: CustomerProfile) -> Customer {
        let mut tables = self.tables.lock().await;
        insert_customer_row(&mut tables, user_id, &profile)
    }

    /// Overwrites the status of an order, as fulfilment tooling would.
    pub async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> Option<OrderRecord> {
        let mut tables = self.tables.lock().await;
        let order = tables.orders.get_mut(&id)?;
        order.status = status;
        order.payment_status = payment_status;
        order.updated_at = Utc::now();
        Some(order.clone())
    }

    /// Returns the number of order headers stored.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Returns the number of order lines stored.
    pub async fn order_item_count(&self) -> usize {
        self.tables.lock().await.order_items.len()
    }
}

fn insert_customer_row(
    tables: &mut Tables,
    user_id: UserId,
    profile: &CustomerProfile,
) -> Customer {
    tables.customer_seq += 1;
    let now = Utc::now();
    let customer = Customer {
        id: CustomerId::new(tables.customer_seq),
        user_id,
        profile: profile.clone(),
        created_at: now,
        updated_at: now,
    };
    tables.customers.insert(customer.id, customer.clone());
    customer
}

#[async_trait]
impl Store for InMemoryStore {
    type UnitOfWork = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<InMemoryUnitOfWork> {
        let committed = self.tables.clone().lock_owned().await;
        let working = committed.clone();
        Ok(InMemoryUnitOfWork {
            committed,
            working,
            fail_on_commit: self.fail_on_commit.clone(),
        })
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.products.get(id).cloned())
            .collect())
    }

    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.tables.lock().await.customers.get(&id).cloned())
    }

    async fn find_customer_by_user(&self, user_id: UserId) -> Result<Option<Customer>> {
        Ok(self.tables.lock().await.customer_by_user(user_id).cloned())
    }

    async fn find_order_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .get(&id)
            .filter(|o| o.user_id == user_id)
            .cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderRecord>> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<_> = tables
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn find_items_for_orders(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItemRecord>> {
        let tables = self.tables.lock().await;
        Ok(order_ids
            .iter()
            .flat_map(|id| tables.items_of(*id))
            .collect())
    }
}

/// Unit of work over an [`InMemoryStore`].
pub struct InMemoryUnitOfWork {
    committed: OwnedMutexGuard<Tables>,
    working: Tables,
    fail_on_commit: Arc<AtomicBool>,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn find_customer_for_user(
        &mut self,
        id: CustomerId,
        user_id: UserId,
    ) -> Result<Option<Customer>> {
        Ok(self
            .working
            .customers
            .get(&id)
            .filter(|c| c.user_id == user_id)
            .cloned())
    }

    async fn lock_customer_by_user(&mut self, user_id: UserId) -> Result<Option<Customer>> {
        Ok(self.working.customer_by_user(user_id).cloned())
    }

    async fn insert_customer(
        &mut self,
        user_id: UserId,
        profile: &CustomerProfile,
    ) -> Result<Customer> {
        Ok(insert_customer_row(&mut self.working, user_id, profile))
    }

    async fn update_customer(
        &mut self,
        id: CustomerId,
        profile: &CustomerProfile,
    ) -> Result<Customer> {
        let customer = self
            .working
            .customers
            .get_mut(&id)
            .ok_or(StoreError::RowNotFound {
                entity: "Customer",
                id: id.get(),
            })?;
        customer.profile = profile.clone();
        customer.updated_at = Utc::now();
        Ok(customer.clone())
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> Result<u32> {
        let product = self
            .working
            .products
            .get_mut(&id)
            .ok_or(StoreError::RowNotFound {
                entity: "Product",
                id: id.get(),
            })?;
        if product.stock < quantity {
            tracing::warn!(
                product_id = %id,
                stock = product.stock,
                quantity,
                "stock decrement clamped at zero"
            );
        }
        product.stock = product.stock.saturating_sub(quantity);
        Ok(product.stock)
    }

    async fn increment_stock(&mut self, id: ProductId, quantity: u32) -> Result<Option<u32>> {
        Ok(self.working.products.get_mut(&id).map(|product| {
            product.stock = product.stock.saturating_add(quantity);
            product.stock
        }))
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord> {
        self.working.order_seq += 1;
        let now = Utc::now();
        let record = OrderRecord {
            id: OrderId::new(self.working.order_seq),
            user_id: order.user_id,
            customer_id: order.customer_id,
            total_amount: order.total_amount,
            status: order.status,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            created_at: now,
            updated_at: now,
        };
        self.working.orders.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_order_item(&mut self, item: NewOrderItem) -> Result<OrderItemRecord> {
        if !self.working.orders.contains_key(&item.order_id) {
            return Err(StoreError::RowNotFound {
                entity: "Order",
                id: item.order_id.get(),
            });
        }
        self.working.order_item_seq += 1;
        let record = OrderItemRecord {
            id: OrderItemId::new(self.working.order_item_seq),
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            subtotal: item.subtotal,
            created_at: Utc::now(),
        };
        self.working.order_items.insert(record.id, record.clone());
        Ok(record)
    }

    async fn lock_order_for_user(
        &mut self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderRecord>> {
        Ok(self
            .working
            .orders
            .get(&id)
            .filter(|o| o.user_id == user_id)
            .cloned())
    }

    async fn find_order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        Ok(self.working.items_of(order_id))
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> Result<OrderRecord> {
        let order = self
            .working
            .orders
            .get_mut(&id)
            .ok_or(StoreError::RowNotFound {
                entity: "Order",
                id: id.get(),
            })?;
        order.status = status;
        order.payment_status = payment_status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn commit(mut self) -> Result<()> {
        if self.fail_on_commit.load(Ordering::SeqCst) {
            tracing::warn!("commit rejected, discarding unit of work");
            return Err(StoreError::Unavailable("commit rejected".to_string()));
        }
        *self.committed = std::mem::take(&mut self.working);
        tracing::debug!("unit of work committed");
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
