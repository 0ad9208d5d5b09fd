//! Outward-facing event subscribers.
//!
//! Both subscribers push notifications to HTTP endpoints after a mutation
//! commits. They only ever observe: a failed delivery is logged by the
//! dispatcher and never affects the signal.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use url::Url;

use crate::events::{EventSubscriber, SignalEvent};

/// Notifies an external case system of new signals and status changes.
///
/// The contract is intentionally thin: ids only, the external side fetches
/// whatever detail it needs through the API.
pub struct ExternalSyncSubscriber {
    client: reqwest::Client,
    endpoint: Url,
}

impl ExternalSyncSubscriber {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("signalen/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl EventSubscriber for ExternalSyncSubscriber {
    fn name(&self) -> &'static str {
        "external-sync"
    }

    async fn handle(&self, event: &SignalEvent) -> anyhow::Result<()> {
        let payload = match event {
            SignalEvent::SignalCreated { signal } | SignalEvent::ChildCreated { signal, .. } => {
                json!({
                    "action": "created",
                    "signal_id": signal.id,
                    "status_id": signal.status_id,
                })
            }
            SignalEvent::StatusUpdated { signal, status, .. } => json!({
                "action": "status_changed",
                "signal_id": signal.id,
                "status_id": status.id,
            }),
            _ => return Ok(()),
        };

        self.client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Posts a human-readable status notification to a configured webhook.
pub struct StatusWebhookSubscriber {
    client: reqwest::Client,
    endpoint: Url,
}

impl StatusWebhookSubscriber {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("signalen/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl EventSubscriber for StatusWebhookSubscriber {
    fn name(&self) -> &'static str {
        "status-webhook"
    }

    async fn handle(&self, event: &SignalEvent) -> anyhow::Result<()> {
        let SignalEvent::StatusUpdated { signal, status, .. } = event else {
            return Ok(());
        };

        let payload = json!({
            "signal_id": signal.id,
            "state": status.state.code(),
            "state_label": status.state.label(),
        });
        self.client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
