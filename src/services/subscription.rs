use async_trait::async_trait;

use crate::error::{ErrorCode, PortalError, Result};
use crate::models::card::CardPayload;
use crate::models::common::{BillingType, PlanCode};
use crate::models::payment::PaymentPage;
use crate::models::subscription::{
    CancelResponse, CheckoutOutcome, CreateSubscriptionRequest, GatewaySubscription,
    MySubscription, SubscriptionResponse, SubscriptionStatus, UpdateSubscriptionRequest,
};
use crate::services::http::ApiClient;
use crate::services::reconcile::SubscriptionSource;

const SUBSCRIPTIONS_PATH: &str = "/api/asaas/subscriptions";

/// Checkout entry point used by the checkout flow. The status read used by
/// the confirmation loop comes from the `SubscriptionSource` supertrait.
#[async_trait]
pub trait SubscriptionGateway: SubscriptionSource {
    async fn create_subscription(
        &self,
        plan_code: PlanCode,
        billing_type: BillingType,
        card: Option<CardPayload>,
    ) -> Result<CheckoutOutcome>;
}

#[derive(Clone)]
pub struct SubscriptionService {
    api: ApiClient,
}

impl SubscriptionService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Creates the subscription at the gateway. `card` must already have
    /// passed the checkout validator; it is only sent for CREDIT_CARD.
    pub async fn create(
        &self,
        plan_code: PlanCode,
        billing_type: BillingType,
        card: Option<CardPayload>,
    ) -> Result<CheckoutOutcome> {
        let card = match billing_type {
            BillingType::CreditCard => {
                Some(card.ok_or_else(|| PortalError::api(ErrorCode::CreditCardDataRequired))?)
            }
            BillingType::Pix | BillingType::Boleto => {
                if card.is_some() {
                    log::debug!("Ignoring card data for {} checkout", billing_type);
                }
                None
            }
        };

        let (credit_card, credit_card_holder_info) = match card {
            Some(payload) => (Some(payload.card), Some(payload.holder)),
            None => (None, None),
        };
        let request = CreateSubscriptionRequest {
            plan_code,
            billing_type,
            credit_card,
            credit_card_holder_info,
            remote_ip: None,
        };

        log::info!("Creating {} subscription with {}", plan_code, billing_type);
        let response: SubscriptionResponse = self.api.post(SUBSCRIPTIONS_PATH, &request).await?;
        let subscription = response.subscription;

        if !billing_type.requires_polling() {
            log::info!("Subscription {} created as {}", subscription.id, subscription.status);
            return Ok(CheckoutOutcome::Activated { subscription });
        }

        match subscription.invoice_url.clone().filter(|url| !url.trim().is_empty()) {
            Some(invoice_url) => {
                log::info!(
                    "Subscription {} awaiting {} payment",
                    subscription.id,
                    billing_type
                );
                Ok(CheckoutOutcome::AwaitingPayment {
                    subscription,
                    invoice_url,
                })
            }
            None => {
                log::error!(
                    "Subscription {} created without an invoice URL for {}",
                    subscription.id,
                    billing_type
                );
                Err(PortalError::api(ErrorCode::SubscriptionCreateFailed))
            }
        }
    }

    pub async fn my_subscription(&self) -> Result<MySubscription> {
        let mine: Option<MySubscription> =
            self.api.get(&format!("{}/me", SUBSCRIPTIONS_PATH)).await?;
        Ok(mine.unwrap_or_default())
    }

    pub async fn subscription(&self, id: &str) -> Result<GatewaySubscription> {
        let response: SubscriptionResponse = self.api.get(&subscription_path(id)?).await?;
        Ok(response.subscription)
    }

    pub async fn update(
        &self,
        id: &str,
        update: &UpdateSubscriptionRequest,
    ) -> Result<GatewaySubscription> {
        if update.billing_type == Some(BillingType::Boleto) {
            return Err(PortalError::api(ErrorCode::BillingTypeInvalid));
        }
        log::info!("Updating subscription {}", id);
        let response: SubscriptionResponse = self.api.put(&subscription_path(id)?, update).await?;
        Ok(response.subscription)
    }

    pub async fn payments(&self, id: &str) -> Result<PaymentPage> {
        self.api
            .get(&format!("{}/payments", subscription_path(id)?))
            .await
    }

    /// Cancels at the gateway. Access is kept until the current period ends.
    pub async fn cancel(&self, id: &str) -> Result<bool> {
        log::info!("Cancelling subscription {}", id);
        let response: CancelResponse = self.api.delete(&subscription_path(id)?).await?;
        Ok(response.success)
    }
}

fn subscription_path(id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(PortalError::api(ErrorCode::SubscriptionNotFound));
    }
    Ok(format!("{}/{}", SUBSCRIPTIONS_PATH, id))
}

#[async_trait]
impl SubscriptionSource for SubscriptionService {
    async fn current_status(&self) -> Result<Option<SubscriptionStatus>> {
        Ok(self.my_subscription().await?.status())
    }
}

#[async_trait]
impl SubscriptionGateway for SubscriptionService {
    async fn create_subscription(
        &self,
        plan_code: PlanCode,
        billing_type: BillingType,
        card: Option<CardPayload>,
    ) -> Result<CheckoutOutcome> {
        self.create(plan_code, billing_type, card).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_path_rejects_odd_ids() {
        assert_eq!(
            subscription_path("sub_abc-123").unwrap(),
            "/api/asaas/subscriptions/sub_abc-123"
        );
        assert!(subscription_path("").is_err());
        assert!(subscription_path("../users/me").is_err());
    }
}
