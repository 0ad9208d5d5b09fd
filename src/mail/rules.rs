//! Declarative reporter mail rules.
//!
//! A rule ties a workflow state to a template and a recipient strategy. The
//! engine evaluates rules in order and applies the first match; guards that
//! need database state (the once-per-lifetime creation guard) are evaluated
//! by the engine, rules only declare that they need them.

use crate::mail::templates::TemplateKey;
use crate::workflow::State;

/// Where the mail goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// The reporter's email address, skipped when none is on file.
    Reporter,
    /// The `email_override` of the triggering status (external forwarding).
    StatusEmailOverride,
}

#[derive(Debug, Clone)]
pub struct MailRule {
    pub name: &'static str,
    /// States this rule fires on.
    pub states: &'static [State],
    /// Fire only when staff flagged the status with `send_email`.
    pub requires_send_email: bool,
    /// Fire only on the first `reported` status in the signal's lifetime.
    pub only_first_reported: bool,
    /// Do not fire when the previous state is one of these.
    pub skip_when_prev: &'static [State],
    pub recipient: Recipient,
    pub template: TemplateKey,
    /// Note appended to the signal after a successful send.
    pub history_entry: &'static str,
}

impl MailRule {
    /// State/flag match; database-backed guards are checked by the engine.
    pub fn matches(&self, state: State, prev_state: Option<State>, send_email: bool) -> bool {
        if !self.states.contains(&state) {
            return false;
        }
        if self.requires_send_email && !send_email {
            return false;
        }
        if let Some(prev) = prev_state
            && self.skip_when_prev.contains(&prev)
        {
            return false;
        }
        true
    }
}

/// The rule set evaluated on every status change, in priority order.
pub fn default_rules() -> Vec<MailRule> {
    vec![
        MailRule {
            name: "signal created",
            states: &[State::Reported],
            requires_send_email: false,
            only_first_reported: true,
            skip_when_prev: &[],
            recipient: Recipient::Reporter,
            template: TemplateKey::SignalCreated,
            history_entry: "Automatic confirmation email was sent to the reporter.",
        },
        MailRule {
            name: "signal handled",
            states: &[State::Handled],
            requires_send_email: false,
            only_first_reported: false,
            // Re-handling after a reopen request repeats no mail.
            skip_when_prev: &[State::RequestToReopen],
            recipient: Recipient::Reporter,
            template: TemplateKey::SignalHandled,
            history_entry: "Automatic handled email was sent to the reporter.",
        },
        MailRule {
            name: "signal scheduled",
            states: &[State::Scheduled],
            requires_send_email: false,
            only_first_reported: false,
            skip_when_prev: &[],
            recipient: Recipient::Reporter,
            template: TemplateKey::SignalScheduled,
            history_entry: "Automatic scheduled email was sent to the reporter.",
        },
        MailRule {
            name: "signal reopened",
            states: &[State::Reopened],
            requires_send_email: false,
            only_first_reported: false,
            skip_when_prev: &[],
            recipient: Recipient::Reporter,
            template: TemplateKey::SignalReopened,
            history_entry: "Automatic reopened email was sent to the reporter.",
        },
        MailRule {
            name: "reaction requested",
            states: &[State::ReactionRequested],
            requires_send_email: false,
            only_first_reported: false,
            skip_when_prev: &[],
            recipient: Recipient::Reporter,
            template: TemplateKey::ReactionRequested,
            history_entry: "Automatic reaction-request email was sent to the reporter.",
        },
        MailRule {
            name: "forwarded to external",
            states: &[State::ForwardedToExternal],
            requires_send_email: false,
            only_first_reported: false,
            skip_when_prev: &[],
            recipient: Recipient::StatusEmailOverride,
            template: TemplateKey::ForwardedToExternal,
            history_entry: "Report was forwarded to an external party by email.",
        },
        MailRule {
            name: "status changed optional",
            states: &[
                State::Reported,
                State::Awaiting,
                State::InTreatment,
                State::OnHold,
                State::RequestForHandling,
                State::Cancelled,
            ],
            requires_send_email: true,
            only_first_reported: false,
            skip_when_prev: &[],
            recipient: Recipient::Reporter,
            template: TemplateKey::StatusChangedOptional,
            history_entry: "The status update was sent to the reporter by email.",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_named(name: &str) -> MailRule {
        default_rules()
            .into_iter()
            .find(|r| r.name == name)
            .expect("rule exists")
    }

    #[test]
    fn handled_rule_skips_reopen_requests() {
        let rule = rule_named("signal handled");
        assert!(rule.matches(State::Handled, Some(State::InTreatment), false));
        assert!(!rule.matches(State::Handled, Some(State::RequestToReopen), false));
    }

    #[test]
    fn optional_rule_requires_send_email_flag() {
        let rule = rule_named("status changed optional");
        assert!(rule.matches(State::InTreatment, Some(State::Reported), true));
        assert!(!rule.matches(State::InTreatment, Some(State::Reported), false));
        // Not every state qualifies even with the flag.
        assert!(!rule.matches(State::Handled, Some(State::InTreatment), true));
    }

    #[test]
    fn forwarding_rule_targets_the_override_address() {
        let rule = rule_named("forwarded to external");
        assert_eq!(rule.recipient, Recipient::StatusEmailOverride);
        assert!(rule.matches(State::ForwardedToExternal, Some(State::InTreatment), false));
    }

    #[test]
    fn creation_rule_is_flagged_for_the_lifetime_guard() {
        let rule = rule_named("signal created");
        assert!(rule.only_first_reported);
        assert!(rule.matches(State::Reported, None, false));
    }
}
