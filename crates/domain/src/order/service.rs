//! Order workflow: placement, cancellation and owner-scoped reads.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use common::{Money, OrderId, OrderStatus, PaymentStatus, ProductId, UserId};
use store::{NewOrder, NewOrderItem, Product, Store, UnitOfWork};

use super::{CancelOrder, LineRequest, Order, OrderError, OrderLine, PlaceOrder, RequestedItems};

/// A line that passed validation, with its price captured.
struct CapturedLine {
    product_id: ProductId,
    quantity: u32,
    price: Money,
    subtotal: Money,
}

/// Service running the order workflow against a [`Store`].
///
/// Each mutating operation runs inside exactly one unit of work: on any
/// error the unit is rolled back before the error is returned, so callers
/// never observe partial state.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order: validates the customer and every line, reserves
    /// stock, and persists the order with its line snapshots.
    ///
    /// Lines are processed in caller order and stock is decremented as each
    /// line passes, so repeated lines for one product are checked against
    /// the already-reduced stock.
    #[tracing::instrument(
        skip(self, cmd),
        fields(user_id = %cmd.user_id, customer_id = %cmd.customer_id)
    )]
    pub async fn create_order(&self, cmd: PlaceOrder) -> Result<Order, OrderError> {
        let started = Instant::now();
        let mut uow = self.store.begin().await?;

        let result = match place(&mut uow, cmd).await {
            Ok(order) => uow.commit().await.map(|()| order).map_err(OrderError::from),
            Err(e) => {
                discard(uow).await;
                Err(e)
            }
        };

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                metrics::histogram!("order_placement_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(
                    order_id = %order.id(),
                    total = %order.total_amount(),
                    lines = order.item_count(),
                    quantity = order.total_quantity(),
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "reason" => e.kind()).increment(1);
                tracing::info!(error = %e, "order rejected");
            }
        }

        result
    }

    /// Cancels a pending or processing order and restores its stock.
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id, user_id = %cmd.user_id))]
    pub async fn cancel_order(&self, cmd: CancelOrder) -> Result<Order, OrderError> {
        let mut uow = self.store.begin().await?;

        let result = match cancel(&mut uow, cmd).await {
            Ok(order) => uow.commit().await.map(|()| order).map_err(OrderError::from),
            Err(e) => {
                discard(uow).await;
                Err(e)
            }
        };

        match &result {
            Ok(order) => {
                metrics::counter!("orders_cancelled_total").increment(1);
                tracing::info!(payment_status = %order.payment_status(), "order cancelled");
            }
            Err(e) => tracing::info!(error = %e, "cancellation rejected"),
        }

        result
    }

    /// Lists a user's orders, newest first, with lines and product detail.
    #[tracing::instrument(skip(self))]
    pub async fn get_user_orders(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        let headers = self.store.list_orders_for_user(user_id).await?;
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<OrderId> = headers.iter().map(|o| o.id).collect();
        let items = self.store.find_items_for_orders(&order_ids).await?;
        let products = self.load_products(items.iter().map(|i| i.product_id)).await?;

        let mut lines_by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for item in items {
            let product = products.get(&item.product_id).cloned();
            lines_by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderLine::new(item).with_product(product));
        }

        Ok(headers
            .into_iter()
            .map(|header| {
                let lines = lines_by_order.remove(&header.id).unwrap_or_default();
                Order::new(header, lines)
            })
            .collect())
    }

    /// Loads one of the user's orders with lines, product detail and customer.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_by_id(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Order, OrderError> {
        let header = self
            .store
            .find_order_for_user(order_id, user_id)
            .await?
            .ok_or(OrderError::OrderNotFound)?;

        let items = self.store.find_items_for_orders(&[order_id]).await?;
        let products = self.load_products(items.iter().map(|i| i.product_id)).await?;
        let lines = items
            .into_iter()
            .map(|item| {
                let product = products.get(&item.product_id).cloned();
                OrderLine::new(item).with_product(product)
            })
            .collect();

        let customer = self.store.find_customer(header.customer_id).await?;
        Ok(Order::new(header, lines).with_customer(customer))
    }

    async fn load_products(
        &self,
        ids: impl Iterator<Item = ProductId>,
    ) -> Result<HashMap<ProductId, Product>, OrderError> {
        let ids: Vec<ProductId> = ids.collect::<BTreeSet<_>>().into_iter().collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let products = self.store.find_products(&ids).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }
}

/// Rolls a failed unit of work back, logging if the rollback itself fails.
///
/// Dropping the unit would discard its writes as well; the explicit call
/// releases the connection and locks immediately.
async fn discard<U: UnitOfWork>(uow: U) {
    if let Err(e) = uow.rollback().await {
        tracing::warn!(error = %e, "rollback failed");
    }
}

fn validate_quantity(line: &LineRequest) -> Result<u32, OrderError> {
    u32::try_from(line.quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| {
            OrderError::InvalidRequest(format!(
                "Quantity for product {} must be a positive integer, got {}",
                line.product_id, line.quantity
            ))
        })
}

fn amount_out_of_range(product_id: ProductId) -> OrderError {
    OrderError::InvalidRequest(format!("Order amount for product {product_id} is out of range"))
}

async fn place<U: UnitOfWork>(uow: &mut U, cmd: PlaceOrder) -> Result<Order, OrderError> {
    let customer = uow
        .find_customer_for_user(cmd.customer_id, cmd.user_id)
        .await?
        .ok_or(OrderError::CustomerNotFound)?;

    let requested = match cmd.items {
        RequestedItems::Lines(lines) if !lines.is_empty() => lines,
        RequestedItems::Lines(_) | RequestedItems::Missing => {
            return Err(OrderError::InvalidRequest(
                "Order must contain at least one item".to_string(),
            ));
        }
        RequestedItems::Malformed { position, reason } => {
            return Err(OrderError::InvalidRequest(format!(
                "Invalid item at position {position}: {reason}"
            )));
        }
    };

    let payment_method = cmd.payment_method.trim();
    if payment_method.is_empty() {
        return Err(OrderError::InvalidRequest(
            "Payment method is required".to_string(),
        ));
    }

    let mut total = Money::zero();
    let mut captured = Vec::with_capacity(requested.len());

    for line in &requested {
        let quantity = validate_quantity(line)?;

        let product = uow
            .lock_product(line.product_id)
            .await?
            .ok_or(OrderError::ProductNotFound {
                product_id: line.product_id,
            })?;

        if product.stock < quantity {
            return Err(OrderError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: quantity,
            });
        }

        let subtotal = product
            .price
            .checked_mul(quantity)
            .ok_or_else(|| amount_out_of_range(product.id))?;
        total = total
            .checked_add(subtotal)
            .ok_or_else(|| amount_out_of_range(product.id))?;

        let remaining = uow.decrement_stock(product.id, quantity).await?;
        tracing::debug!(product_id = %product.id, quantity, remaining, "stock reserved");

        captured.push(CapturedLine {
            product_id: product.id,
            quantity,
            price: product.price,
            subtotal,
        });
    }

    let header = uow
        .insert_order(NewOrder {
            user_id: cmd.user_id,
            customer_id: customer.id,
            total_amount: total,
            status: OrderStatus::Pending,
            payment_method: payment_method.to_string(),
            payment_status: PaymentStatus::Pending,
        })
        .await?;

    let mut lines = Vec::with_capacity(captured.len());
    for line in captured {
        let item = uow
            .insert_order_item(NewOrderItem {
                order_id: header.id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
                subtotal: line.subtotal,
            })
            .await?;
        lines.push(OrderLine::new(item));
    }

    Ok(Order::new(header, lines))
}

async fn cancel<U: UnitOfWork>(uow: &mut U, cmd: CancelOrder) -> Result<Order, OrderError> {
    let order = uow
        .lock_order_for_user(cmd.order_id, cmd.user_id)
        .await?
        .ok_or(OrderError::OrderNotFound)?;

    if !order.status.can_cancel() {
        return Err(OrderError::InvalidState {
            status: order.status,
        });
    }

    let items = uow.find_order_items(order.id).await?;
    let header = uow
        .update_order_status(
            order.id,
            OrderStatus::Cancelled,
            order.payment_status.after_cancellation(),
        )
        .await?;

    for item in &items {
        match uow.increment_stock(item.product_id, item.quantity).await? {
            Some(stock) => {
                tracing::debug!(product_id = %item.product_id, stock, "stock restored");
            }
            None => tracing::warn!(
                product_id = %item.product_id,
                quantity = item.quantity,
                "product no longer exists, stock not restored"
            ),
        }
    }

    Ok(Order::new(header, items.into_iter().map(OrderLine::new).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerId, ProductId};
    use store::{CustomerProfile, InMemoryStore, NewProduct};

    async fn setup() -> (OrderService<InMemoryStore>, UserId, CustomerId, ProductId) {
        let store = InMemoryStore::new();
        let user_id = UserId::new(1);
        let customer = store
            .insert_customer(
                user_id,
                CustomerProfile {
                    first_name: "Ada".to_string(),
                    last_name: "Lovelace".to_string(),
                    ..Default::default()
                },
            )
            .await;
        let product = store
            .insert_product(NewProduct::new("Widget", Money::from_units(10), 5))
            .await;
        (OrderService::new(store), user_id, customer.id, product.id)
    }

    #[tokio::test]
    async fn test_create_order() {
        let (service, user_id, customer_id, product_id) = setup().await;

        let order = service
            .create_order(PlaceOrder::new(
                user_id,
                customer_id,
                vec![LineRequest::new(product_id, 3)],
                "credit_card",
            ))
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(order.total_amount().cents(), 3000);
        assert_eq!(order.item_count(), 1);
        assert_eq!(service.store().product_stock(product_id).await, Some(2));
    }

    #[tokio::test]
    async fn test_rejected_order_leaves_stock_untouched() {
        let (service, user_id, customer_id, product_id) = setup().await;

        let err = service
            .create_order(PlaceOrder::new(
                user_id,
                customer_id,
                vec![
                    LineRequest::new(product_id, 2),
                    LineRequest::new(ProductId::new(999), 1),
                ],
                "credit_card",
            ))
            .await
            .unwrap_err();

        assert!(
            matches!(err, OrderError::ProductNotFound { product_id } if product_id.get() == 999)
        );
        assert_eq!(service.store().product_stock(product_id).await, Some(5));
        assert_eq!(service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_invalid() {
        let (service, user_id, customer_id, product_id) = setup().await;

        let err = service
            .create_order(PlaceOrder::new(
                user_id,
                customer_id,
                vec![LineRequest::new(product_id, 0)],
                "credit_card",
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_cancel_order() {
        let (service, user_id, customer_id, product_id) = setup().await;
        let order = service
            .create_order(PlaceOrder::new(
                user_id,
                customer_id,
                vec![LineRequest::new(product_id, 4)],
                "credit_card",
            ))
            .await
            .unwrap();

        let cancelled = service
            .cancel_order(CancelOrder::new(order.id(), user_id))
            .await
            .unwrap();

        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status(), PaymentStatus::Cancelled);
        assert_eq!(service.store().product_stock(product_id).await, Some(5));
    }

    #[tokio::test]
    async fn test_get_order_by_id_attaches_details() {
        let (service, user_id, customer_id, product_id) = setup().await;
        let order = service
            .create_order(PlaceOrder::new(
                user_id,
                customer_id,
                vec![LineRequest::new(product_id, 1)],
                "paypal",
            ))
            .await
            .unwrap();

        let loaded = service.get_order_by_id(order.id(), user_id).await.unwrap();

        assert_eq!(loaded.customer().map(|c| c.id), Some(customer_id));
        let product = loaded.lines()[0].product.as_ref().unwrap();
        assert_eq!(product.name, "Widget");
    }

    #[tokio::test]
    async fn test_get_user_orders_empty() {
        let (service, _, _, _) = setup().await;
        let orders = service.get_user_orders(UserId::new(77)).await.unwrap();
        assert!(orders.is_empty());
    }
}
