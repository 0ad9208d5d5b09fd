//! Integration tests for the reporter mail rule engine.
//!
//! The engine is registered as an event subscriber on the manager's
//! dispatcher, so these tests drive it the way production does: through
//! the actions API.

mod test_utils;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use signalen::actions::SignalManager;
use signalen::actions::inputs::StatusInput;
use signalen::areas::NoopAreaLookup;
use signalen::events::EventDispatcher;
use signalen::mail::{MailRuleEngine, MailSettings, Mailer, OutgoingMail};
use signalen::models::{Note, note};
use signalen::repositories::SignalRepository;
use signalen::workflow::State;

use test_utils::{new_signal_input, seed_category, setup_test_db};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

fn build_manager_with_mail(db: &DatabaseConnection) -> (SignalManager, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::default());
    let settings = MailSettings {
        organization_name: "Gemeente Voorbeeld".to_string(),
        from_email: "noreply@voorbeeld.nl".to_string(),
        max_decode_iterations: 5,
    };
    let engine = MailRuleEngine::new(db.clone(), mailer.clone(), settings);

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(Arc::new(engine));
    let manager = SignalManager::new(
        db.clone(),
        Arc::new(dispatcher),
        Arc::new(NoopAreaLookup),
        3,
        None,
    );
    (manager, mailer)
}

async fn notes_for(db: &DatabaseConnection, signal_id: i64) -> anyhow::Result<Vec<note::Model>> {
    Ok(Note::find()
        .filter(note::Column::SignalId.eq(signal_id))
        .all(db)
        .await?)
}

#[tokio::test]
async fn creation_mail_is_sent_once_with_handling_message() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(
        &db,
        "straatverlichting",
        None,
        Some("Broken street lights are repaired within five working days."),
    )
    .await?;
    let (manager, mailer) = build_manager_with_mail(&db);
    let repo = SignalRepository::new(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["reporter@example.com".to_string()]);
    assert_eq!(sent[0].from_email, "noreply@voorbeeld.nl");
    assert!(sent[0].subject.contains(&format!("SIG-{}", signal.id)));
    assert!(sent[0].body.contains("five working days"));

    let notes = notes_for(&db, signal.id).await?;
    assert_eq!(notes.len(), 1);
    assert!(notes[0].text.contains("confirmation email"));

    // a staff correction back to `reported` must not mail again
    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_status(
            &signal,
            StatusInput {
                state: State::Reported,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(mailer.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn no_mail_without_reporter_email() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, mailer) = build_manager_with_mail(&db);

    let mut input = new_signal_input(category.id);
    input.reporter.email = None;
    let signal = manager.create_initial(input).await?;

    assert!(mailer.sent().is_empty());
    assert!(notes_for(&db, signal.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn child_signals_never_mail_the_reporter() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, mailer) = build_manager_with_mail(&db);

    let parent = manager.create_initial(new_signal_input(category.id)).await?;
    assert_eq!(mailer.sent().len(), 1);

    let mut child_input = new_signal_input(category.id);
    child_input.parent_id = Some(parent.id);
    let child = manager.create_initial(child_input).await?;

    assert_eq!(mailer.sent().len(), 1);
    assert!(notes_for(&db, child.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn handled_mail_skipped_after_reopen_request() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, mailer) = build_manager_with_mail(&db);
    let repo = SignalRepository::new(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;

    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_status(
            &signal,
            StatusInput {
                state: State::Handled,
                text: Some("Resolved.".to_string()),
                ..Default::default()
            },
        )
        .await?;
    // creation mail + handled mail
    assert_eq!(mailer.sent().len(), 2);

    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_status(
            &signal,
            StatusInput {
                state: State::RequestToReopen,
                ..Default::default()
            },
        )
        .await?;
    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_status(
            &signal,
            StatusInput {
                state: State::Handled,
                text: Some("Still resolved.".to_string()),
                ..Default::default()
            },
        )
        .await?;

    // re-handling after a reopen request repeats no mail
    assert_eq!(mailer.sent().len(), 2);
    Ok(())
}

#[tokio::test]
async fn optional_status_mail_requires_send_email_flag() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, mailer) = build_manager_with_mail(&db);
    let repo = SignalRepository::new(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;
    assert_eq!(mailer.sent().len(), 1);

    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_status(
            &signal,
            StatusInput {
                state: State::InTreatment,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(mailer.sent().len(), 1);

    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_status(
            &signal,
            StatusInput {
                state: State::OnHold,
                text: Some("Waiting for parts.".to_string()),
                send_email: true,
                ..Default::default()
            },
        )
        .await?;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].body.contains("Waiting for parts."));
    Ok(())
}

#[tokio::test]
async fn forwarding_mails_the_override_address() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, mailer) = build_manager_with_mail(&db);
    let repo = SignalRepository::new(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;

    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_status(
            &signal,
            StatusInput {
                state: State::ForwardedToExternal,
                text: Some("Please handle this one.".to_string()),
                email_override: Some("contractor@example.org".to_string()),
                ..Default::default()
            },
        )
        .await?;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].to, vec!["contractor@example.org".to_string()]);
    Ok(())
}

#[tokio::test]
async fn suspicious_text_refuses_the_mail_and_records_a_note() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, mailer) = build_manager_with_mail(&db);

    let mut input = new_signal_input(category.id);
    // survives the bounded decode loop, so the engine must refuse it
    input.text = format!("Check this out %{}41", "25".repeat(5));
    let signal = manager.create_initial(input).await?;

    assert!(mailer.sent().is_empty());
    let notes = notes_for(&db, signal.id).await?;
    assert_eq!(notes.len(), 1);
    assert!(notes[0].text.contains("was not sent"));
    Ok(())
}
