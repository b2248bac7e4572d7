//! Checkout orchestration: validation, subscription creation, user feedback
//! and, for PIX/BOLETO, the payment confirmation loop.

use chrono::{Datelike, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ReconcileConfig;
use crate::error::{PortalError, Result};
use crate::models::common::{BillingType, PlanCode};
use crate::models::subscription::{CheckoutOutcome, SubscriptionStatus};
use crate::services::reconcile::{
    ManualCheck, ReconcileListener, ReconcileState, Reconciler, ReconciliationHandle,
    SubscriptionSource,
};
use crate::services::subscription::SubscriptionGateway;
use crate::utils::validation::{validate_checkout, CheckoutForm};

pub const SUBSCRIPTION_ROUTE: &str = "/perfil?tab=subscription";
pub const LOGIN_ROUTE: &str = "/login";

const CARD_ACTIVATED: &str = "Assinatura ativada com sucesso!";
const INVOICE_OPENED: &str =
    "Assinatura criada! Conclua o pagamento na fatura aberta. A confirmação é automática.";
const PAYMENT_CONFIRMED: &str = "Pagamento confirmado! Sua assinatura está ativa.";
const NOT_CONFIRMED_YET: &str =
    "Pagamento ainda não confirmado. Continuaremos verificando automaticamente.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// What the checkout flow needs from the presentation layer.
pub trait CheckoutUi: Send + Sync {
    fn notify(&self, notice: Notice);
    fn navigate(&self, route: &str);
    fn open_external(&self, url: &str);
}

/// Drives one checkout page. Holds at most one confirmation loop; starting a
/// new PIX/BOLETO checkout replaces the previous loop.
pub struct CheckoutFlow<G: SubscriptionGateway + 'static> {
    gateway: Arc<G>,
    ui: Arc<dyn CheckoutUi>,
    reconciler: Reconciler,
    active: Mutex<Option<Arc<ReconciliationHandle>>>,
}

impl<G: SubscriptionGateway + 'static> CheckoutFlow<G> {
    pub fn new(gateway: Arc<G>, ui: Arc<dyn CheckoutUi>, config: ReconcileConfig) -> Self {
        Self {
            gateway,
            ui,
            reconciler: Reconciler::new(config),
            active: Mutex::new(None),
        }
    }

    pub async fn submit(
        &self,
        plan_code: PlanCode,
        billing_type: BillingType,
        form: Option<CheckoutForm>,
    ) -> Result<CheckoutOutcome> {
        if let Err(e) = validate_checkout(billing_type, form.as_ref(), Utc::now().year()) {
            log::debug!("Checkout blocked by validation: {}", e);
            self.report_error(&e);
            return Err(e);
        }

        let card = match billing_type {
            BillingType::CreditCard => form.map(CheckoutForm::into_payload),
            BillingType::Pix | BillingType::Boleto => None,
        };

        let outcome = match self
            .gateway
            .create_subscription(plan_code, billing_type, card)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report_error(&e);
                return Err(e);
            }
        };

        match &outcome {
            CheckoutOutcome::Activated { .. } => {
                self.ui.notify(Notice::success(CARD_ACTIVATED));
                self.ui.navigate(SUBSCRIPTION_ROUTE);
            }
            CheckoutOutcome::AwaitingPayment { invoice_url, .. } => {
                self.ui.open_external(invoice_url);
                self.ui.notify(Notice::info(INVOICE_OPENED));
                self.start_reconciliation();
            }
        }

        Ok(outcome)
    }

    /// "I already paid": one immediate status check.
    pub async fn check_payment_now(&self) -> Result<ManualCheck> {
        let Some(handle) = self.active_handle() else {
            return Ok(ManualCheck::Finished(ReconcileState::Idle));
        };

        match handle.check_now().await {
            Ok(ManualCheck::NotConfirmed(status)) => {
                self.ui.notify(Notice::info(NOT_CONFIRMED_YET));
                Ok(ManualCheck::NotConfirmed(status))
            }
            Ok(check) => Ok(check),
            Err(e) => {
                self.report_error(&e);
                Err(e)
            }
        }
    }

    pub fn reconcile_state(&self) -> ReconcileState {
        self.active_handle()
            .map_or(ReconcileState::Idle, |handle| handle.state())
    }

    /// Stops any running confirmation loop. Called when the page goes away.
    pub fn teardown(&self) {
        if let Some(handle) = self.slot().take() {
            handle.cancel();
        }
    }

    fn start_reconciliation(&self) {
        let source: Arc<dyn SubscriptionSource> = self.gateway.clone();
        let listener = Arc::new(FlowListener { ui: self.ui.clone() });

        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            log::info!("Replacing reconciliation {}", previous.id());
            previous.cancel();
        }
        *slot = Some(Arc::new(self.reconciler.start(source, listener)));
    }

    fn active_handle(&self) -> Option<Arc<ReconciliationHandle>> {
        self.slot().clone()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<ReconciliationHandle>>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn report_error(&self, err: &PortalError) {
        self.ui.notify(Notice::error(err.user_message()));
        if err.is_auth_error() {
            self.ui.navigate(LOGIN_ROUTE);
        }
    }
}

impl<G: SubscriptionGateway + 'static> Drop for CheckoutFlow<G> {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct FlowListener {
    ui: Arc<dyn CheckoutUi>,
}

impl ReconcileListener for FlowListener {
    fn on_change(&self, status: SubscriptionStatus) {
        if status == SubscriptionStatus::Active {
            self.ui.notify(Notice::success(PAYMENT_CONFIRMED));
        }
        self.ui.navigate(SUBSCRIPTION_ROUTE);
    }

    fn on_timeout(&self) {
        log::info!("Payment not confirmed in time; the user can check again later");
    }

    fn on_session_expired(&self) {
        let err = PortalError::session_expired();
        self.ui.notify(Notice::error(err.user_message()));
        self.ui.navigate(LOGIN_ROUTE);
    }
}
