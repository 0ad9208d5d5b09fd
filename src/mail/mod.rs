//! Reporter mail rule engine.
//!
//! Subscribes to the domain event bus and turns status changes into reporter
//! mails, driven by the declarative rule set in [`rules`]. A mail is only
//! ever a side effect: rule mismatches and missing recipients are silent
//! no-ops, suspicious report text refuses the mail and records a note, and
//! outbound failures bubble up to the dispatcher which logs them without
//! failing the mutation.

pub mod context;
pub mod outbound;
pub mod rules;
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter,
};

use crate::events::{EventSubscriber, SignalEvent};
use crate::models::{Category, CategoryAssignment, Location, Reporter, Status, note, signal, status};
use crate::workflow::State;

pub use context::MailContext;
pub use outbound::{LogMailer, Mailer, OutgoingMail, RestMailer};
pub use rules::{MailRule, Recipient};
pub use templates::{RenderedMail, TemplateKey, render};

const REFUSAL_NOTE: &str =
    "Automatic email was not sent: the report text contains content that cannot be mailed safely.";

/// Settings the engine needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub organization_name: String,
    pub from_email: String,
    /// Upper bound on the percent-decode loop of the content-safety pass.
    pub max_decode_iterations: usize,
}

pub struct MailRuleEngine {
    db: DatabaseConnection,
    mailer: Arc<dyn Mailer>,
    rules: Vec<MailRule>,
    settings: MailSettings,
}

impl MailRuleEngine {
    pub fn new(db: DatabaseConnection, mailer: Arc<dyn Mailer>, settings: MailSettings) -> Self {
        Self {
            db,
            mailer,
            rules: rules::default_rules(),
            settings,
        }
    }

    async fn evaluate(
        &self,
        signal: &signal::Model,
        status: &status::Model,
        prev_state: Option<State>,
    ) -> anyhow::Result<()> {
        // Reporter mails are a parent-signal concern.
        if signal.is_child() {
            return Ok(());
        }

        let Some(rule) = self.find_rule(signal, status, prev_state).await? else {
            return Ok(());
        };

        let Some(recipient) = self.resolve_recipient(signal, status, rule.recipient).await? else {
            return Ok(());
        };

        let context = match self.build_context(signal, status).await? {
            Some(context) => context,
            None => {
                // Content safety refused the text. Record why, send nothing.
                self.append_note(signal.id, REFUSAL_NOTE).await?;
                metrics::counter!("signalen_mails_refused_total", "rule" => rule.name).increment(1);
                tracing::warn!(
                    signal_id = signal.id,
                    rule = rule.name,
                    "mail refused by content-safety pass"
                );
                return Ok(());
            }
        };

        let rendered = templates::render(rule.template, &context);
        let mail = OutgoingMail {
            from_email: self.settings.from_email.clone(),
            to: vec![recipient],
            subject: rendered.subject,
            body: rendered.body,
        };
        self.mailer.send(&mail).await?;
        self.append_note(signal.id, rule.history_entry).await?;

        metrics::counter!("signalen_mails_sent_total", "rule" => rule.name).increment(1);
        tracing::info!(signal_id = signal.id, rule = rule.name, "reporter mail sent");
        Ok(())
    }

    /// First rule whose state match and database guards all pass.
    async fn find_rule(
        &self,
        signal: &signal::Model,
        status: &status::Model,
        prev_state: Option<State>,
    ) -> anyhow::Result<Option<&MailRule>> {
        for rule in &self.rules {
            if !rule.matches(status.state, prev_state, status.send_email) {
                continue;
            }
            if rule.only_first_reported {
                let reported_rows = Status::find()
                    .filter(status::Column::SignalId.eq(signal.id))
                    .filter(status::Column::State.eq(State::Reported))
                    .count(&self.db)
                    .await?;
                if reported_rows != 1 {
                    continue;
                }
            }
            return Ok(Some(rule));
        }
        Ok(None)
    }

    async fn resolve_recipient(
        &self,
        signal: &signal::Model,
        status: &status::Model,
        recipient: Recipient,
    ) -> anyhow::Result<Option<String>> {
        match recipient {
            Recipient::Reporter => {
                let Some(reporter_id) = signal.reporter_id else {
                    return Ok(None);
                };
                let reporter = Reporter::find_by_id(reporter_id).one(&self.db).await?;
                Ok(reporter.filter(|r| r.has_email()).and_then(|r| r.email))
            }
            Recipient::StatusEmailOverride => {
                Ok(status.email_override.clone().filter(|e| !e.is_empty()))
            }
        }
    }

    /// Build the typed template context, or `None` when content safety
    /// refuses the report text.
    async fn build_context(
        &self,
        signal: &signal::Model,
        status: &status::Model,
    ) -> anyhow::Result<Option<MailContext>> {
        let max = self.settings.max_decode_iterations;
        let (text, text_extra) = match (
            context::cleanup_text(&signal.text, max),
            context::cleanup_text(&signal.text_extra, max),
        ) {
            (Ok(text), Ok(text_extra)) => (text, text_extra),
            _ => return Ok(None),
        };

        let (main_category, sub_category) = self.category_names(signal).await?;

        let address = match signal.location_id {
            Some(id) => Location::find_by_id(id)
                .one(&self.db)
                .await?
                .and_then(|l| l.address),
            None => None,
        };

        let reporter = match signal.reporter_id {
            Some(id) => Reporter::find_by_id(id).one(&self.db).await?,
            None => None,
        };

        let handling_message = match signal.category_assignment_id {
            Some(id) => CategoryAssignment::find_by_id(id)
                .one(&self.db)
                .await?
                .and_then(|a| a.stored_handling_message),
            None => None,
        };

        Ok(Some(MailContext {
            signal_id: signal.id,
            formatted_signal_id: MailContext::format_signal_id(signal.id),
            created_at: signal.created_at,
            incident_date_start: signal.incident_date_start,
            text,
            text_extra,
            address,
            status_state_label: status.state.label().to_string(),
            status_text: status.text.clone(),
            handling_message,
            organization_name: self.settings.organization_name.clone(),
            main_category_public_name: main_category,
            sub_category_public_name: sub_category,
            source: signal.source.clone(),
            reporter_email_masked: reporter
                .as_ref()
                .and_then(|r| r.email.as_deref())
                .map(context::mask_email),
            reporter_phone_masked: reporter
                .as_ref()
                .and_then(|r| r.phone.as_deref())
                .map(context::mask_phone),
        }))
    }

    /// Public names of the assigned category and its parent.
    async fn category_names(&self, signal: &signal::Model) -> anyhow::Result<(String, String)> {
        let Some(assignment_id) = signal.category_assignment_id else {
            return Ok((String::new(), String::new()));
        };
        let Some(assignment) = CategoryAssignment::find_by_id(assignment_id)
            .one(&self.db)
            .await?
        else {
            return Ok((String::new(), String::new()));
        };
        let Some(category) = Category::find_by_id(assignment.category_id)
            .one(&self.db)
            .await?
        else {
            return Ok((String::new(), String::new()));
        };

        let sub = category
            .public_name
            .clone()
            .unwrap_or_else(|| category.name.clone());
        let main = match category.parent_id {
            Some(parent_id) => Category::find_by_id(parent_id)
                .one(&self.db)
                .await?
                .map(|p| p.public_name.unwrap_or(p.name))
                .unwrap_or_default(),
            None => String::new(),
        };
        Ok((main, sub))
    }

    async fn append_note(&self, signal_id: i64, text: &str) -> anyhow::Result<()> {
        note::ActiveModel {
            id: NotSet,
            signal_id: Set(signal_id),
            text: Set(text.to_string()),
            created_by: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for MailRuleEngine {
    fn name(&self) -> &'static str {
        "mail-rule-engine"
    }

    async fn handle(&self, event: &SignalEvent) -> anyhow::Result<()> {
        match event {
            SignalEvent::SignalCreated { signal } => {
                let Some(status_id) = signal.status_id else {
                    return Ok(());
                };
                let Some(status) = Status::find_by_id(status_id).one(&self.db).await? else {
                    return Ok(());
                };
                self.evaluate(signal, &status, None).await
            }
            SignalEvent::StatusUpdated {
                signal,
                status,
                prev_status,
            } => {
                self.evaluate(signal, status, prev_status.as_ref().map(|s| s.state))
                    .await
            }
            _ => Ok(()),
        }
    }
}
