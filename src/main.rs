use anyhow::{Context, Result};
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use tokio::sync::mpsc;

use chama365_portal::config::Config;
use chama365_portal::models::subscription::SubscriptionStatus;
use chama365_portal::services::{
    ApiClient, AuthService, FileSessionStore, ReconcileListener, Reconciler, SubscriptionService,
};

enum Outcome {
    Changed(SubscriptionStatus),
    TimedOut,
    SessionExpired,
}

struct ChannelListener {
    tx: mpsc::UnboundedSender<Outcome>,
}

impl ReconcileListener for ChannelListener {
    fn on_change(&self, status: SubscriptionStatus) {
        let _ = self.tx.send(Outcome::Changed(status));
    }

    fn on_timeout(&self) {
        let _ = self.tx.send(Outcome::TimedOut);
    }

    fn on_session_expired(&self) {
        let _ = self.tx.send(Outcome::SessionExpired);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let store = Arc::new(
        FileSessionStore::open(&config.session_file).context("Failed to open session file")?,
    );
    let api = ApiClient::new(&config.api, store).context("Failed to build API client")?;

    log::info!("Chama 365 portal client against {}", api.base_url());

    if let (Ok(email), Ok(password)) = (env::var("CHAMA_EMAIL"), env::var("CHAMA_PASSWORD")) {
        let user = AuthService::new(api.clone())
            .login_user(&email, &password)
            .await
            .context("Login failed")?;
        log::info!("Signed in as user {}", user.id);
    }

    if !api.tokens().is_authenticated() {
        anyhow::bail!("No session found; set CHAMA_EMAIL and CHAMA_PASSWORD to sign in");
    }

    let subscriptions = Arc::new(SubscriptionService::new(api.clone()));
    let mine = subscriptions
        .my_subscription()
        .await
        .context("Failed to fetch subscription")?;

    let Some(local) = mine.local else {
        log::info!("No subscription yet");
        return Ok(());
    };

    log::info!(
        "Subscription {} ({}, {}): {}",
        local.asaas_subscription_id,
        local.plan_code,
        local.billing_type,
        local.status.label()
    );
    if let Some(due) = local.next_due_date {
        log::info!("Next due date: {}", due);
    }

    match subscriptions.payments(&local.asaas_subscription_id).await {
        Ok(page) => {
            for payment in &page.data {
                log::info!(
                    "Invoice {} due {} R$ {}: {}",
                    payment.id,
                    payment.due_date,
                    payment.value,
                    payment.status.label()
                );
            }
        }
        Err(e) => log::warn!("Could not list invoices: {}", e),
    }

    if !local.is_awaiting_payment() {
        return Ok(());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = Reconciler::new(config.reconcile.clone())
        .start(subscriptions.clone(), Arc::new(ChannelListener { tx }));

    tokio::select! {
        outcome = rx.recv() => match outcome {
            Some(Outcome::Changed(status)) => log::info!("Subscription is now {}", status),
            Some(Outcome::TimedOut) => log::info!("Payment still pending, check again later"),
            Some(Outcome::SessionExpired) => log::warn!("Session expired, sign in again"),
            None => log::warn!("Reconciliation ended in {:?}", handle.state()),
        },
        _ = tokio::signal::ctrl_c() => {
            handle.cancel();
            log::info!("Interrupted");
        }
    }

    Ok(())
}
