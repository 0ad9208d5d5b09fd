//! Status workflow for signals.
//!
//! Defines the fixed set of status states and the legal transitions between
//! them, plus the per-state companion field requirements. Validation here is
//! a pure function over (previous state, proposed status fields); it touches
//! no database and is what the actions API consults before writing a new
//! status row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationErrors;

/// Status state of a signal.
///
/// `Empty` is the virtual "no previous status" state: it is never written to
/// the statuses table but anchors the transition table for the very first
/// status of a signal, which must be `Reported`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[sea_orm(string_value = "")]
    Empty,
    #[sea_orm(string_value = "reported")]
    Reported,
    #[sea_orm(string_value = "awaiting")]
    Awaiting,
    #[sea_orm(string_value = "in_treatment")]
    InTreatment,
    #[sea_orm(string_value = "on_hold")]
    OnHold,
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "request_for_handling")]
    RequestForHandling,
    #[sea_orm(string_value = "reaction_requested")]
    ReactionRequested,
    #[sea_orm(string_value = "reaction_received")]
    ReactionReceived,
    #[sea_orm(string_value = "ready_to_send")]
    ReadyToSend,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "send_failed")]
    SendFailed,
    #[sea_orm(string_value = "forwarded_to_external")]
    ForwardedToExternal,
    #[sea_orm(string_value = "handled")]
    Handled,
    #[sea_orm(string_value = "handled_externally")]
    HandledExternally,
    #[sea_orm(string_value = "request_to_reopen")]
    RequestToReopen,
    #[sea_orm(string_value = "reopened")]
    Reopened,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "split")]
    Split,
}

impl State {
    /// Stable string code, as stored in the statuses table.
    pub fn code(&self) -> &'static str {
        match self {
            State::Empty => "",
            State::Reported => "reported",
            State::Awaiting => "awaiting",
            State::InTreatment => "in_treatment",
            State::OnHold => "on_hold",
            State::Scheduled => "scheduled",
            State::RequestForHandling => "request_for_handling",
            State::ReactionRequested => "reaction_requested",
            State::ReactionReceived => "reaction_received",
            State::ReadyToSend => "ready_to_send",
            State::Sent => "sent",
            State::SendFailed => "send_failed",
            State::ForwardedToExternal => "forwarded_to_external",
            State::Handled => "handled",
            State::HandledExternally => "handled_externally",
            State::RequestToReopen => "request_to_reopen",
            State::Reopened => "reopened",
            State::Cancelled => "cancelled",
            State::Split => "split",
        }
    }

    /// Human readable label, used by the status webhook payload.
    pub fn label(&self) -> &'static str {
        match self {
            State::Empty => "Empty",
            State::Reported => "Reported",
            State::Awaiting => "Awaiting handling",
            State::InTreatment => "In treatment",
            State::OnHold => "On hold",
            State::Scheduled => "Scheduled",
            State::RequestForHandling => "Request for handling",
            State::ReactionRequested => "Reaction requested",
            State::ReactionReceived => "Reaction received",
            State::ReadyToSend => "Ready to send",
            State::Sent => "Sent",
            State::SendFailed => "Send failed",
            State::ForwardedToExternal => "Forwarded to external party",
            State::Handled => "Handled",
            State::HandledExternally => "Handled externally",
            State::RequestToReopen => "Request to reopen",
            State::Reopened => "Reopened",
            State::Cancelled => "Cancelled",
            State::Split => "Split",
        }
    }
}

// The open states a signal can sit in while the municipality works on it.
// Most workflow movement happens between these.
const OPEN_STATES: &[State] = &[
    State::Reported,
    State::Awaiting,
    State::InTreatment,
    State::OnHold,
    State::Scheduled,
    State::ReactionRequested,
    State::ReactionReceived,
    State::Reopened,
];

/// States from which the given target state may be entered.
///
/// Keyed by target state: `allowed_predecessors(new).contains(&prev)` decides
/// legality. `State::Empty` appears only in the `Reported` entry; every other
/// state requires an existing status row.
pub fn allowed_predecessors(new_state: State) -> &'static [State] {
    match new_state {
        // First status of a signal, or a staff correction from an open state.
        State::Reported => &[
            State::Empty,
            State::Reported,
            State::Awaiting,
            State::InTreatment,
            State::OnHold,
            State::Scheduled,
            State::ReactionRequested,
            State::ReactionReceived,
            State::Reopened,
            State::SendFailed,
            State::ForwardedToExternal,
            State::RequestForHandling,
        ],
        State::Awaiting => &[
            State::Reported,
            State::Awaiting,
            State::InTreatment,
            State::OnHold,
            State::Scheduled,
            State::ReactionReceived,
            State::Reopened,
            State::RequestForHandling,
        ],
        State::InTreatment => &[
            State::Reported,
            State::Awaiting,
            State::InTreatment,
            State::OnHold,
            State::Scheduled,
            State::ReactionRequested,
            State::ReactionReceived,
            State::Reopened,
            State::RequestForHandling,
            State::Cancelled,
            State::HandledExternally,
        ],
        State::OnHold => &[
            State::Reported,
            State::Awaiting,
            State::InTreatment,
            State::OnHold,
            State::Scheduled,
            State::ReactionReceived,
            State::Reopened,
        ],
        State::Scheduled => &[
            State::Reported,
            State::Awaiting,
            State::InTreatment,
            State::OnHold,
            State::Scheduled,
            State::ReactionReceived,
            State::Reopened,
        ],
        State::RequestForHandling => &[
            State::Reported,
            State::Awaiting,
            State::InTreatment,
            State::OnHold,
            State::Scheduled,
            State::Reopened,
            State::ForwardedToExternal,
        ],
        State::ReactionRequested => OPEN_STATES,
        State::ReactionReceived => &[State::ReactionRequested],
        // Hand-off to an external target API.
        State::ReadyToSend => &[
            State::Reported,
            State::Awaiting,
            State::InTreatment,
            State::OnHold,
            State::Scheduled,
            State::Reopened,
            State::SendFailed,
        ],
        State::Sent => &[State::ReadyToSend],
        State::SendFailed => &[State::ReadyToSend, State::Sent],
        State::ForwardedToExternal => &[
            State::Reported,
            State::Awaiting,
            State::InTreatment,
            State::OnHold,
            State::Scheduled,
            State::Reopened,
            State::ForwardedToExternal,
        ],
        State::Handled => &[
            State::Reported,
            State::Awaiting,
            State::InTreatment,
            State::OnHold,
            State::Scheduled,
            State::ReactionRequested,
            State::ReactionReceived,
            State::Reopened,
            State::RequestForHandling,
            State::RequestToReopen,
            State::HandledExternally,
            State::ForwardedToExternal,
        ],
        State::HandledExternally => &[State::Sent],
        State::RequestToReopen => &[State::Handled],
        State::Reopened => &[
            State::Handled,
            State::Cancelled,
            State::RequestToReopen,
        ],
        State::Cancelled => &[
            State::Reported,
            State::Awaiting,
            State::InTreatment,
            State::OnHold,
            State::Scheduled,
            State::ReactionRequested,
            State::ReactionReceived,
            State::Reopened,
            State::RequestForHandling,
            State::HandledExternally,
            State::ForwardedToExternal,
            State::Cancelled,
        ],
        // Legacy terminal state: one signal spawned several related ones.
        // Kept so historical data stays representable; nothing leaves it.
        State::Split => &[
            State::Reported,
            State::Awaiting,
            State::InTreatment,
            State::OnHold,
            State::Scheduled,
            State::Reopened,
        ],
        State::Empty => &[],
    }
}

/// Proposed status fields, as far as the workflow cares about them.
#[derive(Debug, Clone)]
pub struct ProposedStatus<'a> {
    pub state: State,
    pub text: Option<&'a str>,
    pub target_api: Option<&'a str>,
    pub email_override: Option<&'a str>,
}

/// Validate a status transition.
///
/// `prev_state` is `None` for a signal without any status yet. On failure the
/// returned errors name the offending field (`state`, `target_api`, `text`
/// or `email_override`); nothing is ever coerced.
pub fn validate_transition(
    prev_state: Option<State>,
    proposed: &ProposedStatus<'_>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let current = prev_state.unwrap_or(State::Empty);
    let new_state = proposed.state;

    if new_state == State::Empty {
        errors.add("state", "Status state may not be empty.");
    } else if !allowed_predecessors(new_state).contains(&current) {
        errors.add(
            "state",
            format!(
                "Invalid state transition from `{}` to `{}`.",
                current.label(),
                new_state.label()
            ),
        );
    }

    let has_target_api = proposed.target_api.is_some_and(|t| !t.is_empty());
    if new_state == State::ReadyToSend && !has_target_api {
        errors.add(
            "target_api",
            format!(
                "This field is required when changing `state` to `{}`.",
                State::ReadyToSend.label()
            ),
        );
    }
    if new_state != State::ReadyToSend && has_target_api {
        errors.add(
            "target_api",
            format!(
                "This field can only be set when changing `state` to `{}`.",
                State::ReadyToSend.label()
            ),
        );
    }

    if matches!(new_state, State::Handled | State::Reopened)
        && proposed.text.is_none_or(str::is_empty)
    {
        errors.add(
            "text",
            format!(
                "This field is required when changing `state` to `{}`.",
                new_state.label()
            ),
        );
    }

    if new_state == State::ForwardedToExternal
        && proposed.email_override.is_none_or(str::is_empty)
    {
        errors.add(
            "email_override",
            format!(
                "This field is required when changing `state` to `{}`.",
                State::ForwardedToExternal.label()
            ),
        );
    }

    errors.into_result()
}
