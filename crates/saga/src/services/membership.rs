//! Membership step: moving the user to the purchased tier.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use storage::{MembershipStore, UserId};

use crate::error::{Result, SagaError};
use crate::services::outbound::{DependencyError, OutboundCall, OutboundRequest};

const SERVICE: &str = "user";

/// Trait for updating the membership tier owned by the user component.
#[async_trait]
pub trait MembershipUpdater: Send + Sync {
    async fn update_tier(&self, user_id: UserId, level: &str) -> Result<()>;
}

/// Updates the tier through the user service's HTTP surface.
#[derive(Clone)]
pub struct HttpMembershipUpdater {
    caller: Arc<dyn OutboundCall>,
    url: String,
}

impl HttpMembershipUpdater {
    /// Creates an updater for the user service at `base_url`.
    pub fn new(caller: Arc<dyn OutboundCall>, base_url: &str) -> Self {
        Self {
            caller,
            url: format!(
                "{}/api/v1/user/membership/update",
                base_url.trim_end_matches('/')
            ),
        }
    }
}

#[async_trait]
impl MembershipUpdater for HttpMembershipUpdater {
    #[tracing::instrument(skip(self))]
    async fn update_tier(&self, user_id: UserId, level: &str) -> Result<()> {
        let response = self
            .caller
            .call(OutboundRequest {
                service: SERVICE,
                method: Method::PUT,
                url: self.url.clone(),
                body: json!({
                    "user_id": user_id,
                    "membership_tier": level,
                }),
            })
            .await?;

        if !response.is_success() {
            return Err(SagaError::Dependency(DependencyError::Status {
                service: SERVICE,
                status: response.status,
            }));
        }
        Ok(())
    }
}

/// Writes the tier straight to the shared membership store.
#[derive(Clone)]
pub struct StoreMembershipUpdater<S> {
    store: S,
}

impl<S: MembershipStore> StoreMembershipUpdater<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: MembershipStore> MembershipUpdater for StoreMembershipUpdater<S> {
    async fn update_tier(&self, user_id: UserId, level: &str) -> Result<()> {
        self.store
            .set_membership_level(user_id, level)
            .await
            .map_err(SagaError::Storage)
    }
}
