//! Customer profiles: one shipping/contact profile per user.

use common::UserId;
use store::{Customer, CustomerProfile, Store, StoreError, UnitOfWork};
use thiserror::Error;

/// Errors that can occur during customer profile operations.
#[derive(Debug, Error)]
pub enum CustomerError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Customer profile not found")]
    NotFound,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CustomerError {
    /// Short machine-readable label, used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CustomerError::InvalidRequest(_) => "invalid_request",
            CustomerError::NotFound => "not_found",
            CustomerError::Store(_) => "unexpected",
        }
    }
}

/// Outcome of [`CustomerService::upsert_profile`].
#[derive(Debug, Clone)]
pub struct UpsertedProfile {
    pub customer: Customer,
    /// True when no profile existed and one was inserted.
    pub created: bool,
}

/// Service for reading and maintaining customer profiles.
pub struct CustomerService<S: Store> {
    store: S,
}

impl<S: Store> CustomerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the profile owned by the user.
    #[tracing::instrument(skip(self))]
    pub async fn get_profile(&self, user_id: UserId) -> Result<Customer, CustomerError> {
        self.store
            .find_customer_by_user(user_id)
            .await?
            .ok_or(CustomerError::NotFound)
    }

    /// Creates the user's profile, or replaces its attributes if one exists.
    ///
    /// Lookup and write happen in one unit of work with the existing row
    /// locked, so concurrent calls for the same user cannot both insert.
    #[tracing::instrument(skip(self, profile))]
    pub async fn upsert_profile(
        &self,
        user_id: UserId,
        profile: CustomerProfile,
    ) -> Result<UpsertedProfile, CustomerError> {
        let profile = normalize(profile)?;
        let mut uow = self.store.begin().await?;

        let written = match uow.lock_customer_by_user(user_id).await {
            Ok(Some(existing)) => uow
                .update_customer(existing.id, &profile)
                .await
                .map(|customer| UpsertedProfile {
                    customer,
                    created: false,
                }),
            Ok(None) => uow
                .insert_customer(user_id, &profile)
                .await
                .map(|customer| UpsertedProfile {
                    customer,
                    created: true,
                }),
            Err(e) => Err(e),
        };

        let upserted = match written {
            Ok(upserted) => upserted,
            Err(e) => {
                if let Err(rollback) = uow.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                return Err(e.into());
            }
        };
        uow.commit().await?;

        tracing::info!(
            customer_id = %upserted.customer.id,
            created = upserted.created,
            "customer profile saved"
        );
        Ok(upserted)
    }
}

/// Trims the names and drops blank optional fields.
fn normalize(mut profile: CustomerProfile) -> Result<CustomerProfile, CustomerError> {
    profile.first_name = profile.first_name.trim().to_string();
    profile.last_name = profile.last_name.trim().to_string();
    if profile.first_name.is_empty() || profile.last_name.is_empty() {
        return Err(CustomerError::InvalidRequest(
            "First name and last name are required".to_string(),
        ));
    }

    for field in [
        &mut profile.address,
        &mut profile.city,
        &mut profile.state,
        &mut profile.zip_code,
        &mut profile.country,
        &mut profile.phone,
    ] {
        *field = field
            .take()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryStore;

    fn profile(city: &str) -> CustomerProfile {
        CustomerProfile {
            first_name: " Ada ".to_string(),
            last_name: "Lovelace".to_string(),
            city: Some(city.to_string()),
            phone: Some("   ".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let service = CustomerService::new(InMemoryStore::new());
        let user_id = UserId::new(3);

        let first = service
            .upsert_profile(user_id, profile("London"))
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.customer.profile.first_name, "Ada");
        assert_eq!(first.customer.profile.phone, None);

        let second = service
            .upsert_profile(user_id, profile("Paris"))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.customer.id, first.customer.id);

        let loaded = service.get_profile(user_id).await.unwrap();
        assert_eq!(loaded.profile.city.as_deref(), Some("Paris"));
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_found() {
        let service = CustomerService::new(InMemoryStore::new());
        let err = service.get_profile(UserId::new(9)).await.unwrap_err();
        assert!(matches!(err, CustomerError::NotFound));
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let service = CustomerService::new(InMemoryStore::new());
        let mut p = profile("London");
        p.last_name = " ".to_string();

        let err = service.upsert_profile(UserId::new(1), p).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
        assert!(service.get_profile(UserId::new(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_commit_is_reported() {
        let store = InMemoryStore::new();
        store.set_fail_on_commit(true);
        let service = CustomerService::new(store);

        let err = service
            .upsert_profile(UserId::new(1), profile("London"))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::Store(StoreError::Unavailable(_))));
    }
}
