//! Integration tests for history reconstruction.

mod test_utils;

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use signalen::actions::inputs::{NoteInput, PriorityInput, StatusInput};
use signalen::models::{note, status};
use signalen::repositories::SignalRepository;
use signalen::workflow::State;

use test_utils::{build_manager, new_signal_input, seed_category, setup_test_db};

#[tokio::test]
async fn history_interleaves_all_sub_entities_in_order() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, _) = build_manager(&db);
    let repo = SignalRepository::new(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;

    manager
        .create_note(
            &signal,
            NoteInput {
                text: "Inspected on site.".to_string(),
                created_by: Some("inspector@example.com".to_string()),
            },
        )
        .await?;

    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_status(
            &signal,
            StatusInput {
                state: State::InTreatment,
                text: Some("Crew dispatched.".to_string()),
                ..Default::default()
            },
        )
        .await?;

    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_priority(
            &signal,
            PriorityInput {
                priority: "high".to_string(),
                created_by: None,
            },
        )
        .await?;

    let entries = repo.history(signal.id).await?;

    // creation wrote one row per initial sub-entity, then the three updates
    let whats: Vec<&str> = entries.iter().map(|e| e.what.as_str()).collect();
    assert_eq!(
        whats.iter().filter(|w| **w == "UPDATE_STATUS").count(),
        2,
        "{:?}",
        whats
    );
    assert_eq!(whats.iter().filter(|w| **w == "UPDATE_PRIORITY").count(), 2);
    assert_eq!(whats.iter().filter(|w| **w == "CREATE_NOTE").count(), 1);
    assert_eq!(whats.iter().filter(|w| **w == "UPDATE_LOCATION").count(), 1);
    assert_eq!(
        whats
            .iter()
            .filter(|w| **w == "UPDATE_CATEGORY_ASSIGNMENT")
            .count(),
        1
    );
    assert_eq!(whats.iter().filter(|w| **w == "UPDATE_TYPE").count(), 1);

    // chronological: the initial status row comes before the note, which
    // comes before the second status row
    let pos = |what: &str, action_contains: &str| {
        entries
            .iter()
            .position(|e| e.what == what && e.action.contains(action_contains))
            .unwrap_or_else(|| panic!("missing {} entry ({})", what, action_contains))
    };
    let initial_status = pos("UPDATE_STATUS", "Reported");
    let note = pos("CREATE_NOTE", "Note added");
    let second_status = pos("UPDATE_STATUS", "In treatment");
    assert!(initial_status < note);
    assert!(note < second_status);

    // identifiers are unique and carry the row id
    let mut identifiers: Vec<&str> = entries.iter().map(|e| e.identifier.as_str()).collect();
    identifiers.sort_unstable();
    identifiers.dedup();
    assert_eq!(identifiers.len(), entries.len());

    // descriptions carry the free text where there is one
    let note_entry = entries.iter().find(|e| e.what == "CREATE_NOTE").unwrap();
    assert_eq!(note_entry.description.as_deref(), Some("Inspected on site."));
    assert_eq!(note_entry.who.as_deref(), Some("inspector@example.com"));
    Ok(())
}

#[tokio::test]
async fn equal_timestamps_sort_by_pipeline_order_then_row_id() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, _) = build_manager(&db);
    let repo = SignalRepository::new(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;

    // rows written in one transaction share a timestamp; pick one past the
    // creation rows and force status row ids into double digits so a
    // lexicographic sort on the identifier would order 10 before 9
    let when = Utc::now() + Duration::hours(1);
    let note = note::ActiveModel {
        signal_id: Set(signal.id),
        text: Set("Batched note.".to_string()),
        created_by: Set(None),
        created_at: Set(when.into()),
        ..Default::default()
    }
    .insert(&db)
    .await?;
    for id in [9, 10] {
        status::ActiveModel {
            id: Set(id),
            signal_id: Set(signal.id),
            state: Set(State::InTreatment),
            text: Set(None),
            send_email: Set(false),
            target_api: Set(None),
            email_override: Set(None),
            created_by: Set(None),
            created_at: Set(when.into()),
        }
        .insert(&db)
        .await?;
    }

    let entries = repo.history(signal.id).await?;
    let tail: Vec<String> = entries
        .iter()
        .skip(entries.len() - 3)
        .map(|e| e.identifier.clone())
        .collect();
    // statuses come before the note regardless of identifier spelling, and
    // equal-timestamp status rows keep their insertion order
    assert_eq!(
        tail,
        vec![
            "UPDATE_STATUS_9".to_string(),
            "UPDATE_STATUS_10".to_string(),
            format!("CREATE_NOTE_{}", note.id),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn history_of_unknown_signal_is_empty() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let repo = SignalRepository::new(&db);
    assert!(repo.history(12345).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn list_paginates_newest_first() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, _) = build_manager(&db);
    let repo = SignalRepository::new(&db);

    let mut ids = Vec::new();
    for _ in 0..5 {
        let signal = manager.create_initial(new_signal_input(category.id)).await?;
        ids.push(signal.id);
    }

    let first_page = repo.list(None, 3).await?;
    assert_eq!(first_page.len(), 3);
    // ids assigned in creation order, listing is newest first
    assert!(first_page[0].id > first_page[1].id);

    let last = first_page.last().unwrap();
    let second_page = repo.list(Some((last.created_at, last.id)), 3).await?;
    assert_eq!(second_page.len(), 2);
    assert!(second_page.iter().all(|s| s.id < last.id));
    Ok(())
}
