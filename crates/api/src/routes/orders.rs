//! Order endpoints: placement, cancellation and the caller's order history.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, ProductId};
use domain::{CancelOrder, LineRequest, Order, OrderLine, PlaceOrder, RequestedItems};
use serde::{Deserialize, Serialize};
use store::{Product, Store};

use super::AppState;
use super::customers::CustomerResponse;
use crate::auth;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: CustomerId,
    /// Kept loose so a non-list value reaches the workflow's own validation.
    #[serde(default)]
    pub items: serde_json::Value,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub category_id: Option<i64>,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.get(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_decimal_string(),
            category_id: product.category_id.map(|c| c.get()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub quantity: u32,
    pub price: String,
    pub subtotal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductResponse>,
}

impl From<&OrderLine> for OrderItemResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            id: line.item.id.get(),
            product_id: line.item.product_id.get(),
            quantity: line.item.quantity,
            price: line.item.price.to_decimal_string(),
            subtotal: line.item.subtotal.to_decimal_string(),
            product: line.product.as_ref().map(ProductResponse::from),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: i64,
    pub customer_id: i64,
    pub total_amount: String,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerResponse>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().get(),
            user_id: order.user_id().get(),
            customer_id: order.customer_id().get(),
            total_amount: order.total_amount().to_decimal_string(),
            status: order.status().to_string(),
            payment_method: order.payment_method().to_string(),
            payment_status: order.payment_status().to_string(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            items: order.lines().iter().map(OrderItemResponse::from).collect(),
            customer: order.customer().map(CustomerResponse::from),
        }
    }
}

#[derive(Serialize)]
pub struct OrderEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub order: OrderResponse,
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub success: bool,
    pub count: usize,
    pub orders: Vec<OrderResponse>,
}

// -- Handlers --

/// POST /api/orders: place an order for the caller.
#[tracing::instrument(skip(state, headers, body))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderEnvelope>), ApiError> {
    let user_id = auth::user_id(&headers)?;
    let Json(req) = body?;

    let cmd = PlaceOrder {
        user_id,
        customer_id: req.customer_id,
        items: requested_items(req.items),
        payment_method: req.payment_method.unwrap_or_default(),
    };
    let order = state.order_service.create_order(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderEnvelope {
            success: true,
            message: Some("Order placed successfully"),
            order: OrderResponse::from(&order),
        }),
    ))
}

/// GET /api/orders: the caller's orders, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<OrderListResponse>, ApiError> {
    let user_id = auth::user_id(&headers)?;
    let orders = state.order_service.get_user_orders(user_id).await?;

    Ok(Json(OrderListResponse {
        success: true,
        count: orders.len(),
        orders: orders.iter().map(OrderResponse::from).collect(),
    }))
}

/// GET /api/orders/{id}: one of the caller's orders with full detail.
#[tracing::instrument(skip(state, headers, id))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<OrderEnvelope>, ApiError> {
    let user_id = auth::user_id(&headers)?;
    let Path(order_id) = id?;

    let order = state
        .order_service
        .get_order_by_id(order_id, user_id)
        .await?;

    Ok(Json(OrderEnvelope {
        success: true,
        message: None,
        order: OrderResponse::from(&order),
    }))
}

/// PUT /api/orders/{id}/cancel: cancel one of the caller's orders.
#[tracing::instrument(skip(state, headers, id))]
pub async fn cancel<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    id: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<OrderEnvelope>, ApiError> {
    let user_id = auth::user_id(&headers)?;
    let Path(order_id) = id?;

    let order = state
        .order_service
        .cancel_order(CancelOrder::new(order_id, user_id))
        .await?;

    Ok(Json(OrderEnvelope {
        success: true,
        message: Some("Order cancelled successfully"),
        order: OrderResponse::from(&order),
    }))
}

/// Reads the raw `items` value into the workflow's item list.
///
/// Nothing is rejected here: a non-list or an unreadable element is handed to
/// the workflow, which reports it after resolving the customer.
fn requested_items(items: serde_json::Value) -> RequestedItems {
    let serde_json::Value::Array(values) = items else {
        return RequestedItems::Missing;
    };

    let mut lines = Vec::with_capacity(values.len());
    for (position, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<OrderItemRequest>(value) {
            Ok(item) => lines.push(LineRequest::new(item.product_id, item.quantity)),
            Err(e) => {
                return RequestedItems::Malformed {
                    position,
                    reason: e.to_string(),
                };
            }
        }
    }
    RequestedItems::Lines(lines)
}
