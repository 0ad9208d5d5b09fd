//! # Signal Repository
//!
//! Read-side queries over the signal aggregate: resolve the current pointers
//! into a full view, list signals with cursor pagination and reconstruct the
//! interleaved history from the append-only sub-entity tables.

use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{
    CategoryAssignment, Location, Note, Priority, Reporter, Signal, SignalDepartments, SignalType,
    SignalUser, Status, attachment, category_assignment, location, note, priority, reporter,
    signal, signal_departments, signal_type, signal_user, status,
};

/// A signal with its current sub-entity versions resolved.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignalAggregate {
    pub signal: signal::Model,
    pub location: Option<location::Model>,
    pub status: Option<status::Model>,
    pub category_assignment: Option<category_assignment::Model>,
    pub reporter: Option<reporter::Model>,
    pub priority: Option<priority::Model>,
    pub r#type: Option<signal_type::Model>,
    pub directing_departments: Option<signal_departments::Model>,
    pub routing_departments: Option<signal_departments::Model>,
    pub user_assignment: Option<signal_user::Model>,
}

/// One entry in a signal's reconstructed history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEntry {
    /// Stable identifier, e.g. `UPDATE_STATUS_17`
    pub identifier: String,
    /// Entry kind, e.g. `UPDATE_STATUS`
    pub what: String,
    pub when: DateTime<FixedOffset>,
    /// Human-readable summary of the change
    pub action: String,
    /// Free text carried by the change, when any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub who: Option<String>,
}

/// Repository for signal read operations
pub struct SignalRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SignalRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: i64) -> Result<Option<signal::Model>, DbErr> {
        Signal::find_by_id(id).one(self.db).await
    }

    /// Resolve the aggregate's pointers into a full current-state view.
    pub async fn get_aggregate(&self, id: i64) -> Result<Option<SignalAggregate>, DbErr> {
        let Some(signal) = Signal::find_by_id(id).one(self.db).await? else {
            return Ok(None);
        };

        let location = find_opt::<Location>(self.db, signal.location_id).await?;
        let status = find_opt::<Status>(self.db, signal.status_id).await?;
        let category_assignment =
            find_opt::<CategoryAssignment>(self.db, signal.category_assignment_id).await?;
        let reporter = find_opt::<Reporter>(self.db, signal.reporter_id).await?;
        let priority = find_opt::<Priority>(self.db, signal.priority_id).await?;
        let r#type = find_opt::<SignalType>(self.db, signal.type_id).await?;
        let directing_departments =
            find_opt::<SignalDepartments>(self.db, signal.directing_departments_id).await?;
        let routing_departments =
            find_opt::<SignalDepartments>(self.db, signal.routing_departments_id).await?;
        let user_assignment = find_opt::<SignalUser>(self.db, signal.user_assignment_id).await?;

        Ok(Some(SignalAggregate {
            signal,
            location,
            status,
            category_assignment,
            reporter,
            priority,
            r#type,
            directing_departments,
            routing_departments,
            user_assignment,
        }))
    }

    /// List signals, newest first, with keyset pagination on (created_at, id).
    pub async fn list(
        &self,
        created_before: Option<(DateTime<FixedOffset>, i64)>,
        limit: u64,
    ) -> Result<Vec<signal::Model>, DbErr> {
        let mut query = Signal::find();
        if let Some((created_at, id)) = created_before {
            query = query.filter(
                sea_orm::Condition::any()
                    .add(signal::Column::CreatedAt.lt(created_at))
                    .add(
                        sea_orm::Condition::all()
                            .add(signal::Column::CreatedAt.eq(created_at))
                            .add(signal::Column::Id.lt(id)),
                    ),
            );
        }
        query
            .order_by_desc(signal::Column::CreatedAt)
            .order_by_desc(signal::Column::Id)
            .limit(limit)
            .all(self.db)
            .await
    }

    pub async fn children(&self, parent_id: i64) -> Result<Vec<signal::Model>, DbErr> {
        Signal::find()
            .filter(signal::Column::ParentId.eq(parent_id))
            .order_by_asc(signal::Column::Id)
            .all(self.db)
            .await
    }

    /// Reconstruct the full history of a signal from its sub-entity versions.
    ///
    /// Entries from all tables are interleaved and ordered by creation time;
    /// rows created in the same transaction tie-break on the order the
    /// mutation pipeline writes them, then on their per-table row id, which
    /// preserves insertion order.
    pub async fn history(&self, signal_id: i64) -> Result<Vec<HistoryEntry>, DbErr> {
        // (pipeline rank, row id, entry); the first two only order ties
        const LOCATION: u8 = 0;
        const STATUS: u8 = 1;
        const CATEGORY: u8 = 2;
        const NOTE: u8 = 3;
        const PRIORITY: u8 = 4;
        const TYPE: u8 = 5;
        const DEPARTMENTS: u8 = 6;
        const USER: u8 = 7;
        const ATTACHMENT: u8 = 8;
        let mut entries: Vec<(u8, i64, HistoryEntry)> = Vec::new();

        for row in Status::find()
            .filter(status::Column::SignalId.eq(signal_id))
            .order_by_asc(status::Column::Id)
            .all(self.db)
            .await?
        {
            entries.push((STATUS, row.id, HistoryEntry {
                identifier: format!("UPDATE_STATUS_{}", row.id),
                what: "UPDATE_STATUS".to_string(),
                when: row.created_at,
                action: format!("Status changed to: {}", row.state.label()),
                description: row.text,
                who: row.created_by,
            }));
        }

        for row in Location::find()
            .filter(location::Column::SignalId.eq(signal_id))
            .order_by_asc(location::Column::Id)
            .all(self.db)
            .await?
        {
            let area = row
                .area_name
                .or(row.stadsdeel)
                .unwrap_or_else(|| format!("{:.5}, {:.5}", row.lat, row.lon));
            entries.push((LOCATION, row.id, HistoryEntry {
                identifier: format!("UPDATE_LOCATION_{}", row.id),
                what: "UPDATE_LOCATION".to_string(),
                when: row.created_at,
                action: format!("Location changed to: {}", area),
                description: None,
                who: row.created_by,
            }));
        }

        for row in CategoryAssignment::find()
            .filter(category_assignment::Column::SignalId.eq(signal_id))
            .order_by_asc(category_assignment::Column::Id)
            .all(self.db)
            .await?
        {
            entries.push((CATEGORY, row.id, HistoryEntry {
                identifier: format!("UPDATE_CATEGORY_ASSIGNMENT_{}", row.id),
                what: "UPDATE_CATEGORY_ASSIGNMENT".to_string(),
                when: row.created_at,
                action: format!("Category changed to id: {}", row.category_id),
                description: None,
                who: row.created_by,
            }));
        }

        for row in Priority::find()
            .filter(priority::Column::SignalId.eq(signal_id))
            .order_by_asc(priority::Column::Id)
            .all(self.db)
            .await?
        {
            entries.push((PRIORITY, row.id, HistoryEntry {
                identifier: format!("UPDATE_PRIORITY_{}", row.id),
                what: "UPDATE_PRIORITY".to_string(),
                when: row.created_at,
                action: format!("Priority changed to: {}", row.priority),
                description: None,
                who: row.created_by,
            }));
        }

        for row in SignalType::find()
            .filter(signal_type::Column::SignalId.eq(signal_id))
            .order_by_asc(signal_type::Column::Id)
            .all(self.db)
            .await?
        {
            entries.push((TYPE, row.id, HistoryEntry {
                identifier: format!("UPDATE_TYPE_{}", row.id),
                what: "UPDATE_TYPE".to_string(),
                when: row.created_at,
                action: format!("Type changed to: {}", row.name),
                description: None,
                who: row.created_by,
            }));
        }

        for row in Note::find()
            .filter(note::Column::SignalId.eq(signal_id))
            .order_by_asc(note::Column::Id)
            .all(self.db)
            .await?
        {
            entries.push((NOTE, row.id, HistoryEntry {
                identifier: format!("CREATE_NOTE_{}", row.id),
                what: "CREATE_NOTE".to_string(),
                when: row.created_at,
                action: "Note added".to_string(),
                description: Some(row.text),
                who: row.created_by,
            }));
        }

        for row in SignalDepartments::find()
            .filter(signal_departments::Column::SignalId.eq(signal_id))
            .order_by_asc(signal_departments::Column::Id)
            .all(self.db)
            .await?
        {
            let what = if row.relation_type == signal_departments::REL_DIRECTING {
                "UPDATE_DIRECTING_DEPARTMENTS"
            } else {
                "UPDATE_ROUTING_DEPARTMENTS"
            };
            let ids = row.department_ids();
            entries.push((DEPARTMENTS, row.id, HistoryEntry {
                identifier: format!("{}_{}", what, row.id),
                what: what.to_string(),
                when: row.created_at,
                action: format!("Departments changed to ids: {:?}", ids),
                description: None,
                who: row.created_by,
            }));
        }

        for row in SignalUser::find()
            .filter(signal_user::Column::SignalId.eq(signal_id))
            .order_by_asc(signal_user::Column::Id)
            .all(self.db)
            .await?
        {
            let action = match &row.user_email {
                Some(email) => format!("Assigned to: {}", email),
                None => "Assignment removed".to_string(),
            };
            entries.push((USER, row.id, HistoryEntry {
                identifier: format!("UPDATE_USER_ASSIGNMENT_{}", row.id),
                what: "UPDATE_USER_ASSIGNMENT".to_string(),
                when: row.created_at,
                action,
                description: None,
                who: row.created_by,
            }));
        }

        for row in crate::models::Attachment::find()
            .filter(attachment::Column::SignalId.eq(signal_id))
            .order_by_asc(attachment::Column::Id)
            .all(self.db)
            .await?
        {
            entries.push((ATTACHMENT, row.id, HistoryEntry {
                identifier: format!("ADD_ATTACHMENT_{}", row.id),
                what: "ADD_ATTACHMENT".to_string(),
                when: row.created_at,
                action: format!("Attachment added: {}", row.storage_key),
                description: None,
                who: row.created_by,
            }));
        }

        entries.sort_by_key(|(rank, id, entry)| (entry.when, *rank, *id));
        Ok(entries.into_iter().map(|(_, _, entry)| entry).collect())
    }
}

async fn find_opt<E>(db: &DatabaseConnection, id: Option<i64>) -> Result<Option<E::Model>, DbErr>
where
    E: EntityTrait,
    E::PrimaryKey: sea_orm::PrimaryKeyTrait<ValueType = i64>,
{
    match id {
        Some(id) => E::find_by_id(id).one(db).await,
        None => Ok(None),
    }
}
