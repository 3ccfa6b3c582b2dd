//! Order commands.

use common::{CustomerId, OrderId, ProductId, UserId};

/// One requested line of a new order.
///
/// The quantity is kept as received so the workflow can reject non-positive
/// or out-of-range values itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl LineRequest {
    /// Creates a new line request.
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// The item list of a placement request, as received.
///
/// Problems with the list are carried through to the workflow, which
/// reports them only after the customer has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedItems {
    /// Well-formed lines in caller order.
    Lines(Vec<LineRequest>),
    /// The request carried no list at all, or something other than a list.
    Missing,
    /// The element at `position` could not be read as a line.
    Malformed { position: usize, reason: String },
}

impl From<Vec<LineRequest>> for RequestedItems {
    fn from(lines: Vec<LineRequest>) -> Self {
        RequestedItems::Lines(lines)
    }
}

/// Command to place a new order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The authenticated user placing the order.
    pub user_id: UserId,

    /// The customer profile the order ships to. Must belong to `user_id`.
    pub customer_id: CustomerId,

    /// Requested lines in caller order.
    pub items: RequestedItems,

    /// Payment method label (payment itself is simulated).
    pub payment_method: String,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command.
    pub fn new(
        user_id: UserId,
        customer_id: CustomerId,
        items: Vec<LineRequest>,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            customer_id,
            items: RequestedItems::Lines(items),
            payment_method: payment_method.into(),
        }
    }
}

/// Command to cancel an order.
#[derive(Debug, Clone, Copy)]
pub struct CancelOrder {
    /// The order to cancel.
    pub order_id: OrderId,

    /// The authenticated user requesting the cancellation.
    pub user_id: UserId,
}

impl CancelOrder {
    /// Creates a new CancelOrder command.
    pub fn new(order_id: OrderId, user_id: UserId) -> Self {
        Self { order_id, user_id }
    }
}
