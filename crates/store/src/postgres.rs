use async_trait::async_trait;
use common::{
    CategoryId, CustomerId, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId,
    UserId,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    Customer, CustomerProfile, NewOrder, NewOrderItem, OrderItemRecord, OrderRecord, Product,
    Result, StoreError,
    store::{Store, UnitOfWork},
};

const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, stock, category_id";

const CUSTOMER_COLUMNS: &str = "id, user_id, first_name, last_name, address, city, state, \
     zip_code, country, phone, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, customer_id, total_amount_cents, status, \
     payment_method, payment_status, created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, quantity, price_cents, subtotal_cents, created_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn to_u32(table: &'static str, column: &str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::CorruptRow {
        table,
        reason: format!("{column} is negative: {value}"),
    })
}

fn to_i32(quantity: u32) -> Result<i32> {
    i32::try_from(quantity).map_err(|_| StoreError::CorruptRow {
        table: "products",
        reason: format!("quantity out of range: {quantity}"),
    })
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: to_u32("products", "stock", row.try_get("stock")?)?,
        category_id: row
            .try_get::<Option<i64>, _>("category_id")?
            .map(CategoryId::new),
    })
}

fn row_to_customer(row: PgRow) -> Result<Customer> {
    Ok(Customer {
        id: CustomerId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        profile: CustomerProfile {
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            zip_code: row.try_get("zip_code")?,
            country: row.try_get("country")?,
            phone: row.try_get("phone")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: PgRow) -> Result<OrderRecord> {
    let status: String = row.try_get("status")?;
    let payment_status: String = row.try_get("payment_status")?;

    Ok(OrderRecord {
        id: OrderId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        customer_id: CustomerId::new(row.try_get("customer_id")?),
        total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
        status: status.parse::<OrderStatus>().map_err(|e| StoreError::CorruptRow {
            table: "orders",
            reason: e.to_string(),
        })?,
        payment_method: row.try_get("payment_method")?,
        payment_status: payment_status
            .parse::<PaymentStatus>()
            .map_err(|e| StoreError::CorruptRow {
                table: "orders",
                reason: e.to_string(),
            })?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_item(row: PgRow) -> Result<OrderItemRecord> {
    Ok(OrderItemRecord {
        id: OrderItemId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: to_u32("order_items", "quantity", row.try_get("quantity")?)?,
        price: Money::from_cents(row.try_get("price_cents")?),
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Store for PostgresStore {
    type UnitOfWork = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_product).transpose()
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let ids: Vec<i64> = ids.iter().map(ProductId::get).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id ASC"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_product).collect()
    }

    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_customer).transpose()
    }

    async fn find_customer_by_user(&self, user_id: UserId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE user_id = $1"
        ))
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_customer).transpose()
    }

    async fn find_order_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.get())
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn find_items_for_orders(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItemRecord>> {
        let ids: Vec<i64> = order_ids.iter().map(OrderId::get).collect();
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) \
             ORDER BY order_id ASC, id ASC"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_order_item).collect()
    }
}

/// Unit of work backed by a PostgreSQL transaction.
///
/// The transaction rolls back when this value is dropped without a commit.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_customer_for_user(
        &mut self,
        id: CustomerId,
        user_id: UserId,
    ) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.get())
        .bind(user_id.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_customer).transpose()
    }

    async fn lock_customer_by_user(&mut self, user_id: UserId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_customer).transpose()
    }

    async fn insert_customer(
        &mut self,
        user_id: UserId,
        profile: &CustomerProfile,
    ) -> Result<Customer> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO customers
                (user_id, first_name, last_name, address, city, state, zip_code, country, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(user_id.get())
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.address)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.zip_code)
        .bind(&profile.country)
        .bind(&profile.phone)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_customer(row)
    }

    async fn update_customer(
        &mut self,
        id: CustomerId,
        profile: &CustomerProfile,
    ) -> Result<Customer> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE customers SET
                first_name = $2,
                last_name = $3,
                address = $4,
                city = $5,
                state = $6,
                zip_code = $7,
                country = $8,
                phone = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.address)
        .bind(&profile.city)
        .bind(&profile.state)
        .bind(&profile.zip_code)
        .bind(&profile.country)
        .bind(&profile.phone)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::RowNotFound {
            entity: "Customer",
            id: id.get(),
        })?;

        row_to_customer(row)
    }

    #[tracing::instrument(skip(self))]
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_product).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> Result<u32> {
        let stock: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products SET stock = GREATEST(stock - $2, 0), updated_at = NOW()
            WHERE id = $1
            RETURNING stock
            "#,
        )
        .bind(id.get())
        .bind(to_i32(quantity)?)
        .fetch_optional(&mut *self.tx)
        .await?;

        let stock = stock.ok_or(StoreError::RowNotFound {
            entity: "Product",
            id: id.get(),
        })?;
        tracing::debug!(product_id = %id, quantity, stock, "stock decremented");
        to_u32("products", "stock", stock)
    }

    #[tracing::instrument(skip(self))]
    async fn increment_stock(&mut self, id: ProductId, quantity: u32) -> Result<Option<u32>> {
        let stock: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING stock
            "#,
        )
        .bind(id.get())
        .bind(to_i32(quantity)?)
        .fetch_optional(&mut *self.tx)
        .await?;

        if stock.is_none() {
            tracing::debug!(product_id = %id, "no product row to restore stock to");
        }
        stock
            .map(|s| to_u32("products", "stock", s))
            .transpose()
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders
                (user_id, customer_id, total_amount_cents, status, payment_method, payment_status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.user_id.get())
        .bind(order.customer_id.get())
        .bind(order.total_amount.cents())
        .bind(order.status.as_str())
        .bind(&order.payment_method)
        .bind(order.payment_status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_order(row)
    }

    async fn insert_order_item(&mut self, item: NewOrderItem) -> Result<OrderItemRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price_cents, subtotal_cents)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_ITEM_COLUMNS}
            "#
        ))
        .bind(item.order_id.get())
        .bind(item.product_id.get())
        .bind(to_i32(item.quantity)?)
        .bind(item.price.cents())
        .bind(item.subtotal.cents())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_order_item(row)
    }

    #[tracing::instrument(skip(self))]
    async fn lock_order_for_user(
        &mut self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(id.get())
        .bind(user_id.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn find_order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id ASC"
        ))
        .bind(order_id.get())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_order_item).collect()
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> Result<OrderRecord> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET status = $2, payment_status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(status.as_str())
        .bind(payment_status.as_str())
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::RowNotFound {
            entity: "Order",
            id: id.get(),
        })?;

        row_to_order(row)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_stock_is_corrupt() {
        assert!(matches!(
            to_u32("products", "stock", -1),
            Err(StoreError::CorruptRow { table: "products", .. })
        ));
        assert_eq!(to_u32("products", "stock", 7).unwrap(), 7);
    }

    #[test]
    fn test_quantity_out_of_range() {
        assert!(to_i32(u32::MAX).is_err());
        assert_eq!(to_i32(12).unwrap(), 12);
    }
}
