//! Test utilities for database testing.
//!
//! Sets up in-memory SQLite databases with migrations applied and provides
//! fixture builders for categories, departments and signal creation inputs.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database, DatabaseConnection};

use signalen::actions::SignalManager;
use signalen::actions::inputs::{
    CategoryAssignmentInput, CreateSignal, LocationInput, ReporterInput,
};
use signalen::areas::NoopAreaLookup;
use signalen::events::{EventDispatcher, EventSubscriber, SignalEvent};
use signalen::models::{category, department};

#[allow(dead_code)]
pub const TEST_MAX_CHILDREN: usize = 3;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Records every delivered event kind, in delivery order.
#[derive(Default)]
pub struct RecordingSubscriber {
    seen: Mutex<Vec<String>>,
}

impl RecordingSubscriber {
    #[allow(dead_code)]
    pub fn kinds(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSubscriber for RecordingSubscriber {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn handle(&self, event: &SignalEvent) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(event.kind().to_string());
        Ok(())
    }
}

/// A manager wired to a recording subscriber and no area derivation.
#[allow(dead_code)]
pub fn build_manager(db: &DatabaseConnection) -> (SignalManager, Arc<RecordingSubscriber>) {
    let recording = Arc::new(RecordingSubscriber::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(recording.clone());
    let manager = SignalManager::new(
        db.clone(),
        Arc::new(dispatcher),
        Arc::new(NoopAreaLookup),
        TEST_MAX_CHILDREN,
        None,
    );
    (manager, recording)
}

pub async fn seed_category(
    db: &DatabaseConnection,
    slug: &str,
    parent_id: Option<i64>,
    handling_message: Option<&str>,
) -> Result<category::Model> {
    let created = category::ActiveModel {
        slug: Set(slug.to_string()),
        name: Set(slug.to_string()),
        public_name: Set(None),
        parent_id: Set(parent_id),
        handling_message: Set(handling_message.map(str::to_string)),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created)
}

#[allow(dead_code)]
pub async fn seed_department(db: &DatabaseConnection, code: &str) -> Result<department::Model> {
    let created = department::ActiveModel {
        code: Set(code.to_string()),
        name: Set(format!("Department {}", code)),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created)
}

/// A minimal but complete creation input for the given category.
pub fn new_signal_input(category_id: i64) -> CreateSignal {
    CreateSignal {
        source: "online".to_string(),
        text: "There is a broken street light on the corner.".to_string(),
        text_extra: String::new(),
        incident_date_start: Utc::now().into(),
        incident_date_end: None,
        parent_id: None,
        created_by: None,
        location: LocationInput {
            lon: 4.9,
            lat: 52.37,
            address: None,
            stadsdeel: None,
            area_type_code: None,
            area_code: None,
            area_name: None,
            created_by: None,
        },
        status: None,
        category_assignment: CategoryAssignmentInput {
            category_id,
            created_by: None,
        },
        reporter: ReporterInput {
            email: Some("reporter@example.com".to_string()),
            phone: None,
            sharing_allowed: false,
            created_by: None,
        },
        priority: None,
        r#type: None,
    }
}
