//! Integration tests for the signal actions API.
//!
//! These run against an in-memory SQLite database with all migrations
//! applied; the manager dispatches to a recording subscriber so event
//! delivery can be asserted alongside the database effects.

mod test_utils;

use signalen::actions::inputs::{
    AttachmentInput, CategoryAssignmentInput, DepartmentRelation, DepartmentsInput, NoteInput,
    PriorityInput, SignalUpdate, StatusInput, UserAssignmentInput,
};
use signalen::error::ActionError;
use signalen::repositories::SignalRepository;
use signalen::workflow::State;

use test_utils::{build_manager, new_signal_input, seed_category, seed_department, setup_test_db};

#[tokio::test]
async fn create_initial_sets_all_pointers() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let parent_cat = seed_category(&db, "afval", None, None).await?;
    let category = seed_category(
        &db,
        "huisafval",
        Some(parent_cat.id),
        Some("We pick it up within three working days."),
    )
    .await?;
    let (manager, recording) = build_manager(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;

    let aggregate = SignalRepository::new(&db)
        .get_aggregate(signal.id)
        .await?
        .expect("aggregate present");
    let status = aggregate.status.expect("status pointer set");
    assert_eq!(status.state, State::Reported);
    assert_eq!(aggregate.location.expect("location pointer set").lat, 52.37);
    assert_eq!(
        aggregate.priority.expect("priority pointer set").priority,
        "normal"
    );
    assert_eq!(aggregate.r#type.expect("type pointer set").name, "SIG");
    assert_eq!(
        aggregate
            .category_assignment
            .expect("category pointer set")
            .stored_handling_message
            .as_deref(),
        Some("We pick it up within three working days.")
    );
    assert_eq!(
        aggregate.reporter.expect("reporter pointer set").email.as_deref(),
        Some("reporter@example.com")
    );
    assert!(aggregate.directing_departments.is_none());
    assert!(aggregate.user_assignment.is_none());

    assert_eq!(recording.kinds(), vec!["create_initial"]);
    Ok(())
}

#[tokio::test]
async fn blank_text_is_rejected() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, _) = build_manager(&db);

    let mut input = new_signal_input(category.id);
    input.text = "   ".to_string();

    match manager.create_initial(input).await {
        Err(ActionError::Validation(errors)) => assert!(errors.has_field("text")),
        other => panic!("expected validation error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn missing_category_is_rejected() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let (manager, _) = build_manager(&db);

    match manager.create_initial(new_signal_input(9999)).await {
        Err(ActionError::CategoryNotFound(9999)) => {}
        other => panic!("expected CategoryNotFound, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn child_creation_is_bounded() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, recording) = build_manager(&db);

    let parent = manager.create_initial(new_signal_input(category.id)).await?;

    for _ in 0..test_utils::TEST_MAX_CHILDREN {
        let mut input = new_signal_input(category.id);
        input.parent_id = Some(parent.id);
        manager.create_initial(input).await?;
    }

    let mut overflow = new_signal_input(category.id);
    overflow.parent_id = Some(parent.id);
    match manager.create_initial(overflow).await {
        Err(ActionError::Validation(errors)) => assert!(errors.has_field("parent")),
        other => panic!("expected validation error, got {:?}", other),
    }

    let children = SignalRepository::new(&db).children(parent.id).await?;
    assert_eq!(children.len(), test_utils::TEST_MAX_CHILDREN);
    assert_eq!(
        recording.kinds(),
        vec!["create_initial", "create_child", "create_child", "create_child"]
    );
    Ok(())
}

#[tokio::test]
async fn child_of_child_is_rejected() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, _) = build_manager(&db);

    let parent = manager.create_initial(new_signal_input(category.id)).await?;
    let mut child_input = new_signal_input(category.id);
    child_input.parent_id = Some(parent.id);
    let child = manager.create_initial(child_input).await?;

    let mut grandchild = new_signal_input(category.id);
    grandchild.parent_id = Some(child.id);
    match manager.create_initial(grandchild).await {
        Err(ActionError::Validation(errors)) => assert!(errors.has_field("parent")),
        other => panic!("expected validation error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn missing_parent_is_not_found() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, _) = build_manager(&db);

    let mut input = new_signal_input(category.id);
    input.parent_id = Some(4242);
    match manager.create_initial(input).await {
        Err(ActionError::SignalNotFound(4242)) => {}
        other => panic!("expected SignalNotFound, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn status_transitions_follow_the_workflow() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, _) = build_manager(&db);
    let repo = SignalRepository::new(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;

    let status = manager
        .update_status(
            &signal,
            StatusInput {
                state: State::InTreatment,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(status.state, State::InTreatment);

    // handled requires text
    let signal = repo.get(signal.id).await?.unwrap();
    match manager
        .update_status(
            &signal,
            StatusInput {
                state: State::Handled,
                ..Default::default()
            },
        )
        .await
    {
        Err(ActionError::Validation(errors)) => assert!(errors.has_field("text")),
        other => panic!("expected validation error, got {:?}", other),
    }

    // the failed transition rolled back: pointer unchanged
    let signal = repo.get(signal.id).await?.unwrap();
    let aggregate = repo.get_aggregate(signal.id).await?.unwrap();
    assert_eq!(aggregate.status.unwrap().state, State::InTreatment);

    let status = manager
        .update_status(
            &signal,
            StatusInput {
                state: State::Handled,
                text: Some("Fixed the street light.".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(status.state, State::Handled);

    // handled cannot go back to in_treatment directly
    let signal = repo.get(signal.id).await?.unwrap();
    match manager
        .update_status(
            &signal,
            StatusInput {
                state: State::InTreatment,
                ..Default::default()
            },
        )
        .await
    {
        Err(ActionError::Validation(errors)) => assert!(errors.has_field("state")),
        other => panic!("expected validation error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn stale_handle_conflicts() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, _) = build_manager(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;

    manager
        .update_priority(
            &signal,
            PriorityInput {
                priority: "high".to_string(),
                created_by: None,
            },
        )
        .await?;

    // the first update bumped the version; the stale model must lose the claim
    match manager
        .update_priority(
            &signal,
            PriorityInput {
                priority: "low".to_string(),
                created_by: None,
            },
        )
        .await
    {
        Err(ActionError::Conflict { signal_id }) => assert_eq!(signal_id, signal.id),
        other => panic!("expected Conflict, got {:?}", other),
    }

    let aggregate = SignalRepository::new(&db)
        .get_aggregate(signal.id)
        .await?
        .unwrap();
    assert_eq!(aggregate.priority.unwrap().priority, "high");
    Ok(())
}

#[tokio::test]
async fn reassigning_same_category_is_a_noop() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let other = seed_category(&db, "afval", None, None).await?;
    let (manager, recording) = build_manager(&db);
    let repo = SignalRepository::new(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;
    let version_before = repo.get(signal.id).await?.unwrap().version;

    let result = manager
        .update_category_assignment(
            &signal,
            CategoryAssignmentInput {
                category_id: category.id,
                created_by: None,
            },
        )
        .await?;
    assert!(result.is_none());
    assert_eq!(repo.get(signal.id).await?.unwrap().version, version_before);

    let signal = repo.get(signal.id).await?.unwrap();
    let result = manager
        .update_category_assignment(
            &signal,
            CategoryAssignmentInput {
                category_id: other.id,
                created_by: None,
            },
        )
        .await?;
    assert_eq!(result.unwrap().category_id, other.id);

    assert_eq!(
        recording.kinds(),
        vec!["create_initial", "update_category_assignment"]
    );
    Ok(())
}

#[tokio::test]
async fn routing_change_unassigns_the_handler() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let stw = seed_department(&db, "STW").await?;
    let asc = seed_department(&db, "ASC").await?;
    let (manager, _) = build_manager(&db);
    let repo = SignalRepository::new(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;

    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_departments(
            &signal,
            DepartmentRelation::Routing,
            DepartmentsInput {
                department_ids: vec![stw.id],
                created_by: None,
            },
        )
        .await?;

    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_user_assignment(
            &signal,
            UserAssignmentInput {
                user_email: Some("handler@example.com".to_string()),
                created_by: None,
            },
        )
        .await?;

    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_departments(
            &signal,
            DepartmentRelation::Routing,
            DepartmentsInput {
                department_ids: vec![asc.id],
                created_by: None,
            },
        )
        .await?;

    let aggregate = repo.get_aggregate(signal.id).await?.unwrap();
    assert_eq!(
        aggregate.routing_departments.unwrap().department_ids(),
        vec![asc.id]
    );
    assert!(aggregate.user_assignment.unwrap().user_email.is_none());
    Ok(())
}

#[tokio::test]
async fn batched_update_applies_everything_under_one_claim() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let other = seed_category(&db, "afval", None, None).await?;
    let stw = seed_department(&db, "STW").await?;
    let (manager, recording) = build_manager(&db);
    let repo = SignalRepository::new(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;

    // route and assign first, so the category change below has side effects
    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_departments(
            &signal,
            DepartmentRelation::Routing,
            DepartmentsInput {
                department_ids: vec![stw.id],
                created_by: None,
            },
        )
        .await?;
    let signal = repo.get(signal.id).await?.unwrap();
    manager
        .update_user_assignment(
            &signal,
            UserAssignmentInput {
                user_email: Some("handler@example.com".to_string()),
                created_by: None,
            },
        )
        .await?;

    let signal = repo.get(signal.id).await?.unwrap();
    let version_before = signal.version;
    let update = SignalUpdate {
        status: Some(StatusInput {
            state: State::InTreatment,
            ..Default::default()
        }),
        category_assignment: Some(CategoryAssignmentInput {
            category_id: other.id,
            created_by: None,
        }),
        note: Some(NoteInput {
            text: "Re-classified while taking it in treatment.".to_string(),
            created_by: None,
        }),
        priority: Some(PriorityInput {
            priority: "high".to_string(),
            created_by: None,
        }),
        ..Default::default()
    };
    manager.update_multiple(&signal, update).await?;

    let updated = repo.get(signal.id).await?.unwrap();
    assert_eq!(updated.version, version_before + 1);

    let aggregate = repo.get_aggregate(signal.id).await?.unwrap();
    assert_eq!(aggregate.status.unwrap().state, State::InTreatment);
    assert_eq!(
        aggregate.category_assignment.unwrap().category_id,
        other.id
    );
    assert_eq!(aggregate.priority.unwrap().priority, "high");
    // category change cleared routing and unassigned the handler
    assert!(aggregate.routing_departments.is_none());
    assert!(aggregate.user_assignment.unwrap().user_email.is_none());

    let kinds = recording.kinds();
    let batch = &kinds[kinds.len() - 5..];
    assert_eq!(
        batch,
        &[
            "update_status",
            "update_category_assignment",
            "update_user_assignment",
            "create_note",
            "update_priority",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn empty_batched_update_is_rejected() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, _) = build_manager(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;
    match manager.update_multiple(&signal, SignalUpdate::default()).await {
        Err(ActionError::Validation(errors)) => assert!(errors.has_field("update")),
        other => panic!("expected validation error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn notes_and_attachments_skip_the_claim() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, _) = build_manager(&db);
    let repo = SignalRepository::new(&db);

    let signal = manager.create_initial(new_signal_input(category.id)).await?;
    let version_before = repo.get(signal.id).await?.unwrap().version;

    manager
        .create_note(
            &signal,
            NoteInput {
                text: "Called the reporter back.".to_string(),
                created_by: Some("operator@example.com".to_string()),
            },
        )
        .await?;
    manager
        .add_attachment(
            &signal,
            AttachmentInput {
                storage_key: "attachments/2026/08/photo.jpg".to_string(),
                mime_type: Some("image/jpeg".to_string()),
                created_by: None,
            },
        )
        .await?;

    // the same stale model worked twice: no version bump happened
    assert_eq!(repo.get(signal.id).await?.unwrap().version, version_before);
    Ok(())
}

#[tokio::test]
async fn attachments_copy_only_from_own_parent() -> anyhow::Result<()> {
    let db = setup_test_db().await?;
    let category = seed_category(&db, "overig", None, None).await?;
    let (manager, _) = build_manager(&db);

    let parent = manager.create_initial(new_signal_input(category.id)).await?;
    manager
        .add_attachment(
            &parent,
            AttachmentInput {
                storage_key: "attachments/photo-1.jpg".to_string(),
                mime_type: Some("image/jpeg".to_string()),
                created_by: None,
            },
        )
        .await?;
    manager
        .add_attachment(
            &parent,
            AttachmentInput {
                storage_key: "attachments/photo-2.jpg".to_string(),
                mime_type: None,
                created_by: None,
            },
        )
        .await?;

    let mut child_input = new_signal_input(category.id);
    child_input.parent_id = Some(parent.id);
    let child = manager.create_initial(child_input).await?;

    let copies = manager.copy_attachments(&child, &parent).await?;
    assert_eq!(copies.len(), 2);
    assert!(copies.iter().all(|a| a.signal_id == child.id));

    let unrelated = manager.create_initial(new_signal_input(category.id)).await?;
    match manager.copy_attachments(&unrelated, &parent).await {
        Err(ActionError::Validation(errors)) => assert!(errors.has_field("parent")),
        other => panic!("expected validation error, got {:?}", other),
    }
    Ok(())
}
