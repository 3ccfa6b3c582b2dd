//! Customer profile endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::{Customer, CustomerProfile, Store};

use super::AppState;
use crate::auth;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

impl From<ProfileRequest> for CustomerProfile {
    fn from(req: ProfileRequest) -> Self {
        CustomerProfile {
            first_name: req.first_name,
            last_name: req.last_name,
            address: req.address,
            city: req.city,
            state: req.state,
            zip_code: req.zip_code,
            country: req.country,
            phone: req.phone,
        }
    }
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Customer> for CustomerResponse {
    fn from(customer: &Customer) -> Self {
        let profile = &customer.profile;
        Self {
            id: customer.id.get(),
            user_id: customer.user_id.get(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            address: profile.address.clone(),
            city: profile.city.clone(),
            state: profile.state.clone(),
            zip_code: profile.zip_code.clone(),
            country: profile.country.clone(),
            phone: profile.phone.clone(),
            created_at: customer.created_at,
            updated_at: customer.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct ProfileEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub customer: CustomerResponse,
}

// -- Handlers --

/// GET /api/customers/profile: the caller's customer profile.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<ProfileEnvelope>, ApiError> {
    let user_id = auth::user_id(&headers)?;
    let customer = state.customer_service.get_profile(user_id).await?;

    Ok(Json(ProfileEnvelope {
        success: true,
        message: None,
        customer: CustomerResponse::from(&customer),
    }))
}

/// POST /api/customers/profile: create or update the caller's profile.
#[tracing::instrument(skip(state, headers, body))]
pub async fn upsert<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Result<Json<ProfileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProfileEnvelope>), ApiError> {
    let user_id = auth::user_id(&headers)?;
    let Json(req) = body?;

    let upserted = state
        .customer_service
        .upsert_profile(user_id, req.into())
        .await?;

    let (status, message) = if upserted.created {
        (StatusCode::CREATED, "Customer profile created successfully")
    } else {
        (StatusCode::OK, "Customer profile updated successfully")
    };

    Ok((
        status,
        Json(ProfileEnvelope {
            success: true,
            message: Some(message),
            customer: CustomerResponse::from(&upserted.customer),
        }),
    ))
}
