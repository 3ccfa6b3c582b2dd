//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, OrderStatus, PaymentStatus, UserId};
use store::{Customer, OrderItemRecord, OrderRecord, Product};

/// One line of an order together with the product it refers to.
///
/// `product` is the product's current detail when it was loaded, or `None`
/// if the product has been deleted since the order was placed. The line's
/// own price and subtotal are always the snapshot taken at purchase time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub item: OrderItemRecord,
    pub product: Option<Product>,
}

impl OrderLine {
    /// Creates a line without product detail.
    pub fn new(item: OrderItemRecord) -> Self {
        Self {
            item,
            product: None,
        }
    }

    /// Attaches the product's current detail.
    pub fn with_product(mut self, product: Option<Product>) -> Self {
        self.product = product;
        self
    }
}

/// Order aggregate root.
///
/// A header plus its ordered line items. Lines are immutable snapshots once
/// the order exists; only status and payment status change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    header: OrderRecord,
    lines: Vec<OrderLine>,
    customer: Option<Customer>,
}

impl Order {
    /// Assembles an order from its persisted header and lines.
    pub fn new(header: OrderRecord, lines: Vec<OrderLine>) -> Self {
        Self {
            header,
            lines,
            customer: None,
        }
    }

    /// Attaches the customer profile the order ships to.
    pub fn with_customer(mut self, customer: Option<Customer>) -> Self {
        self.customer = customer;
        self
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.header.id
    }

    pub fn user_id(&self) -> UserId {
        self.header.user_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.header.customer_id
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.header.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.header.payment_status
    }

    pub fn payment_method(&self) -> &str {
        &self.header.payment_method
    }

    /// Returns the stored total amount.
    pub fn total_amount(&self) -> Money {
        self.header.total_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.header.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.header.updated_at
    }

    /// Returns the lines in the order they were placed.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns the customer profile, when it was loaded with the order.
    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    /// Returns the number of lines.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.item.quantity).sum()
    }

    /// Sum of the stored line subtotals.
    ///
    /// For every order placed by the workflow this equals
    /// [`total_amount`](Self::total_amount).
    pub fn lines_total(&self) -> Money {
        self.lines.iter().map(|line| line.item.subtotal).sum()
    }
}

#[cfg(test)]
mod tests {
    use common::{OrderItemId, ProductId};

    use super::*;

    fn header(total_cents: i64) -> OrderRecord {
        let now = Utc::now();
        OrderRecord {
            id: OrderId::new(1),
            user_id: UserId::new(10),
            customer_id: CustomerId::new(20),
            total_amount: Money::from_cents(total_cents),
            status: OrderStatus::Pending,
            payment_method: "credit_card".to_string(),
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(id: i64, quantity: u32, price_cents: i64) -> OrderLine {
        let price = Money::from_cents(price_cents);
        OrderLine::new(OrderItemRecord {
            id: OrderItemId::new(id),
            order_id: OrderId::new(1),
            product_id: ProductId::new(id),
            quantity,
            price,
            subtotal: Money::from_cents(price_cents * i64::from(quantity)),
            created_at: Utc::now(),
        })
    }

    #[test]
    fn test_lines_total_matches_stored_total() {
        let order = Order::new(header(3500), vec![line(1, 3, 1000), line(2, 1, 500)]);
        assert_eq!(order.lines_total(), order.total_amount());
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.total_quantity(), 4);
    }

    #[test]
    fn test_lines_keep_placement_order() {
        let order = Order::new(header(0), vec![line(3, 1, 0), line(1, 1, 0)]);
        let ids: Vec<i64> = order.lines().iter().map(|l| l.item.id.get()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_customer_is_optional() {
        let order = Order::new(header(0), vec![]);
        assert!(order.customer().is_none());
    }
}
