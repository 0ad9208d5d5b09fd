//! Mail templates keyed by rule.
//!
//! Templates are code, not database rows: the set is small and the typed
//! context makes every referenced field a compile-time fact.

use crate::mail::context::MailContext;

/// One key per distinct reporter mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    SignalCreated,
    SignalHandled,
    SignalScheduled,
    SignalReopened,
    ReactionRequested,
    ForwardedToExternal,
    StatusChangedOptional,
}

/// A rendered mail, ready for the outbound channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMail {
    pub subject: String,
    pub body: String,
}

pub fn render(key: TemplateKey, context: &MailContext) -> RenderedMail {
    let org = &context.organization_name;
    let id = &context.formatted_signal_id;

    match key {
        TemplateKey::SignalCreated => RenderedMail {
            subject: format!("Thank you for your report {}", id),
            body: format!(
                "Dear reporter,\n\n\
                 Thank you for reporting a problem to {org}. Your report has \
                 been registered under number {id}.\n\n\
                 You reported:\n{}\n\n\
                 {}\n\n\
                 Kind regards,\n{org}",
                context.text,
                context
                    .handling_message
                    .as_deref()
                    .unwrap_or("We will look into your report as soon as possible."),
            ),
        },
        TemplateKey::SignalHandled => RenderedMail {
            subject: format!("More about your report {}", id),
            body: format!(
                "Dear reporter,\n\n\
                 Your report {id} ({category}) has been handled.\n\n\
                 {}\n\n\
                 Kind regards,\n{org}",
                context
                    .status_text
                    .as_deref()
                    .unwrap_or("No further details were recorded."),
                category = context.sub_category_public_name,
            ),
        },
        TemplateKey::SignalScheduled => RenderedMail {
            subject: format!("More about your report {}", id),
            body: format!(
                "Dear reporter,\n\n\
                 Work on your report {id} has been scheduled.\n\n\
                 Kind regards,\n{org}",
            ),
        },
        TemplateKey::SignalReopened => RenderedMail {
            subject: format!("More about your report {}", id),
            body: format!(
                "Dear reporter,\n\n\
                 Your report {id} has been reopened and will be looked at \
                 again.\n\n\
                 Kind regards,\n{org}",
            ),
        },
        TemplateKey::ReactionRequested => RenderedMail {
            subject: format!("Question about your report {}", id),
            body: format!(
                "Dear reporter,\n\n\
                 We have a question about your report {id}:\n\n\
                 {}\n\n\
                 Kind regards,\n{org}",
                context
                    .status_text
                    .as_deref()
                    .unwrap_or("Please contact us for more information."),
            ),
        },
        TemplateKey::ForwardedToExternal => RenderedMail {
            subject: format!("Request to handle report {}", id),
            body: format!(
                "Dear colleague,\n\n\
                 {org} forwards the following report to you for handling.\n\n\
                 Report number: {id}\n\
                 Category: {category}\n\
                 Description:\n{}\n\n\
                 {}\n\n\
                 Kind regards,\n{org}",
                context.text,
                context
                    .status_text
                    .as_deref()
                    .unwrap_or("No instructions were added."),
                category = context.sub_category_public_name,
            ),
        },
        TemplateKey::StatusChangedOptional => RenderedMail {
            subject: format!("More about your report {}", id),
            body: format!(
                "Dear reporter,\n\n\
                 There is an update on your report {id}:\n\n\
                 {}\n\n\
                 Kind regards,\n{org}",
                context
                    .status_text
                    .as_deref()
                    .unwrap_or("The status of your report changed."),
            ),
        },
    }
}
