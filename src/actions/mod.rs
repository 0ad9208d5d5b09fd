//! Actions API for the signal aggregate.
//!
//! Every mutation of a signal goes through [`SignalManager`]: it claims the
//! aggregate's optimistic lock, appends the new sub-entity version, moves the
//! current pointer and hands the resulting domain events to the dispatcher
//! after the transaction commits. Sub-entity rows are never updated or
//! deleted, so the full history of a signal stays reconstructable.
//!
//! Note and attachment writes skip the claim: they append to their own tables
//! without touching any pointer on the aggregate row.

pub mod inputs;

use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait,
};

use crate::areas::AreaLookup;
use crate::error::ActionError;
use crate::events::{EventDispatcher, SignalEvent};
use crate::models::{
    Attachment, Category, CategoryAssignment, Location, Priority, Reporter, Signal,
    SignalDepartments, SignalType, SignalUser, Status, attachment, category_assignment, location,
    note, priority, reporter, signal, signal_departments, signal_type, signal_user, status,
};
use crate::workflow;

pub use inputs::{
    AttachmentInput, CategoryAssignmentInput, CreateSignal, DepartmentRelation, DepartmentsInput,
    LocationInput, NoteInput, PriorityInput, ReporterInput, SignalUpdate, StatusInput, TypeInput,
    UserAssignmentInput,
};

/// Area type whose code doubles as the borough (`stadsdeel`) of a location.
const STADSDEEL_AREA_TYPE: &str = "stadsdeel";

/// The single entry point for signal mutations.
pub struct SignalManager {
    db: DatabaseConnection,
    dispatcher: Arc<EventDispatcher>,
    areas: Arc<dyn AreaLookup>,
    max_children: usize,
    default_area_type: Option<String>,
}

impl SignalManager {
    pub fn new(
        db: DatabaseConnection,
        dispatcher: Arc<EventDispatcher>,
        areas: Arc<dyn AreaLookup>,
        max_children: usize,
        default_area_type: Option<String>,
    ) -> Self {
        Self {
            db,
            dispatcher,
            areas,
            max_children,
            default_area_type,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create a signal with its first sub-entity versions, atomically.
    ///
    /// When `parent_id` is set a child signal is created instead; children
    /// are limited to one level of nesting and to the configured maximum
    /// per parent.
    pub async fn create_initial(
        &self,
        mut input: CreateSignal,
    ) -> Result<signal::Model, ActionError> {
        input.validate()?;

        let status_input = input.status.take().unwrap_or_default();
        workflow::validate_transition(None, &status_input.proposed())?;

        let mut location_input = input.location.clone();
        self.derive_area(&mut location_input).await;

        let txn = self.db.begin().await?;

        if let Some(parent_id) = input.parent_id {
            let parent = Signal::find_by_id(parent_id)
                .one(&txn)
                .await?
                .ok_or(ActionError::SignalNotFound(parent_id))?;
            if parent.is_child() {
                return Err(ActionError::validation(
                    "parent",
                    "Cannot create a child of a child signal.",
                ));
            }
            let children = Signal::find()
                .filter(signal::Column::ParentId.eq(parent_id))
                .count(&txn)
                .await?;
            if children >= self.max_children as u64 {
                return Err(ActionError::validation(
                    "parent",
                    format!("A signal can have at most {} children.", self.max_children),
                ));
            }
        }

        let category = Category::find_by_id(input.category_assignment.category_id)
            .one(&txn)
            .await?
            .ok_or(ActionError::CategoryNotFound(
                input.category_assignment.category_id,
            ))?;

        let now = Utc::now();
        let signal = signal::ActiveModel {
            id: NotSet,
            parent_id: Set(input.parent_id),
            source: Set(input.source.clone()),
            text: Set(input.text.clone()),
            text_extra: Set(input.text_extra.clone()),
            incident_date_start: Set(input.incident_date_start),
            incident_date_end: Set(input.incident_date_end),
            version: Set(0),
            location_id: Set(None),
            status_id: Set(None),
            category_assignment_id: Set(None),
            reporter_id: Set(None),
            priority_id: Set(None),
            type_id: Set(None),
            directing_departments_id: Set(None),
            routing_departments_id: Set(None),
            user_assignment_id: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let location = insert_location(&txn, signal.id, &location_input).await?;
        let status = insert_status(&txn, signal.id, &status_input).await?;
        let category_assignment = category_assignment::ActiveModel {
            id: NotSet,
            signal_id: Set(signal.id),
            category_id: Set(category.id),
            stored_handling_message: Set(category.handling_message.clone()),
            created_by: Set(input.category_assignment.created_by.clone()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;
        let reporter = reporter::ActiveModel {
            id: NotSet,
            signal_id: Set(signal.id),
            email: Set(input.reporter.email.clone()),
            phone: Set(input.reporter.phone.clone()),
            sharing_allowed: Set(input.reporter.sharing_allowed),
            created_by: Set(input.reporter.created_by.clone()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;
        let priority_input = input.priority.clone().unwrap_or(PriorityInput {
            priority: crate::models::priority::PRIORITY_NORMAL.to_string(),
            created_by: None,
        });
        let priority = priority::ActiveModel {
            id: NotSet,
            signal_id: Set(signal.id),
            priority: Set(priority_input.priority),
            created_by: Set(priority_input.created_by),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;
        let type_input = input.r#type.clone().unwrap_or(TypeInput {
            name: crate::models::signal_type::TYPE_DEFAULT.to_string(),
            created_by: None,
        });
        let r#type = signal_type::ActiveModel {
            id: NotSet,
            signal_id: Set(signal.id),
            name: Set(type_input.name),
            created_by: Set(type_input.created_by),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        let mut active: signal::ActiveModel = signal.into();
        active.location_id = Set(Some(location.id));
        active.status_id = Set(Some(status.id));
        active.category_assignment_id = Set(Some(category_assignment.id));
        active.reporter_id = Set(Some(reporter.id));
        active.priority_id = Set(Some(priority.id));
        active.type_id = Set(Some(r#type.id));
        let signal = active.update(&txn).await?;

        let event = match input.parent_id {
            Some(parent_id) => SignalEvent::ChildCreated {
                signal: signal.clone(),
                parent_id,
            },
            None => SignalEvent::SignalCreated {
                signal: signal.clone(),
            },
        };

        tracing::info!(
            signal_id = signal.id,
            parent_id = ?signal.parent_id,
            source = %signal.source,
            "signal created"
        );
        self.commit_and_dispatch(txn, vec![event]).await?;
        Ok(signal)
    }

    /// Append a location version and move the pointer.
    pub async fn update_location(
        &self,
        signal: &signal::Model,
        mut input: LocationInput,
    ) -> Result<location::Model, ActionError> {
        self.derive_area(&mut input).await;

        let txn = self.db.begin().await?;
        let claimed = self.claim(&txn, signal).await?;
        let (location, _signal, event) = self.location_no_txn(&txn, claimed, &input).await?;
        self.commit_and_dispatch(txn, vec![event]).await?;
        Ok(location)
    }

    /// Append a status version after validating the workflow transition.
    pub async fn update_status(
        &self,
        signal: &signal::Model,
        input: StatusInput,
    ) -> Result<status::Model, ActionError> {
        let txn = self.db.begin().await?;
        let claimed = self.claim(&txn, signal).await?;
        let (status, _signal, event) = self.status_no_txn(&txn, claimed, &input).await?;
        self.commit_and_dispatch(txn, vec![event]).await?;
        Ok(status)
    }

    /// Append a category assignment version.
    ///
    /// Re-assigning the category the signal already has is a no-op: no row,
    /// no version bump, no event, `Ok(None)`.
    pub async fn update_category_assignment(
        &self,
        signal: &signal::Model,
        input: CategoryAssignmentInput,
    ) -> Result<Option<category_assignment::Model>, ActionError> {
        if let Some(current_id) = signal.category_assignment_id {
            let current = CategoryAssignment::find_by_id(current_id).one(&self.db).await?;
            if current.is_some_and(|c| c.category_id == input.category_id) {
                return Ok(None);
            }
        }

        let txn = self.db.begin().await?;
        let claimed = self.claim(&txn, signal).await?;
        match self.category_assignment_no_txn(&txn, claimed, &input).await? {
            Some((assignment, _signal, event)) => {
                self.commit_and_dispatch(txn, vec![event]).await?;
                Ok(Some(assignment))
            }
            // A concurrent mutation already applied this category.
            None => {
                txn.rollback().await?;
                Ok(None)
            }
        }
    }

    /// Append a reporter version and move the pointer.
    pub async fn update_reporter(
        &self,
        signal: &signal::Model,
        input: ReporterInput,
    ) -> Result<reporter::Model, ActionError> {
        let txn = self.db.begin().await?;
        let claimed = self.claim(&txn, signal).await?;

        let prev = find_by_optional_id::<Reporter>(&txn, claimed.reporter_id).await?;
        let reporter = reporter::ActiveModel {
            id: NotSet,
            signal_id: Set(claimed.id),
            email: Set(input.email),
            phone: Set(input.phone),
            sharing_allowed: Set(input.sharing_allowed),
            created_by: Set(input.created_by),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        let mut active: signal::ActiveModel = claimed.into();
        active.reporter_id = Set(Some(reporter.id));
        let signal = active.update(&txn).await?;

        let event = SignalEvent::ReporterUpdated {
            signal,
            reporter: reporter.clone(),
            prev_reporter: prev,
        };
        self.commit_and_dispatch(txn, vec![event]).await?;
        Ok(reporter)
    }

    /// Append a priority version and move the pointer.
    pub async fn update_priority(
        &self,
        signal: &signal::Model,
        input: PriorityInput,
    ) -> Result<priority::Model, ActionError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let claimed = self.claim(&txn, signal).await?;
        let (priority, _signal, event) = self.priority_no_txn(&txn, claimed, &input).await?;
        self.commit_and_dispatch(txn, vec![event]).await?;
        Ok(priority)
    }

    /// Append a note. Notes have no pointer on the aggregate, so no claim.
    pub async fn create_note(
        &self,
        signal: &signal::Model,
        input: NoteInput,
    ) -> Result<note::Model, ActionError> {
        input.validate()?;

        let note = note::ActiveModel {
            id: NotSet,
            signal_id: Set(signal.id),
            text: Set(input.text),
            created_by: Set(input.created_by),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await?;

        let event = SignalEvent::NoteCreated {
            signal: signal.clone(),
            note: note.clone(),
        };
        metrics::counter!("signalen_actions_total", "action" => event.kind()).increment(1);
        self.dispatcher.dispatch(&[event]).await;
        Ok(note)
    }

    /// Append a type version and move the pointer.
    pub async fn update_type(
        &self,
        signal: &signal::Model,
        input: TypeInput,
    ) -> Result<signal_type::Model, ActionError> {
        let txn = self.db.begin().await?;
        let claimed = self.claim(&txn, signal).await?;
        let (r#type, _signal, event) = self.type_no_txn(&txn, claimed, &input).await?;
        self.commit_and_dispatch(txn, vec![event]).await?;
        Ok(r#type)
    }

    /// Append a department-relation version and move the matching pointer.
    ///
    /// A routing change invalidates the current user assignment: when the
    /// routed set actually changes and a user is assigned, an unassignment
    /// version is appended in the same transaction.
    pub async fn update_departments(
        &self,
        signal: &signal::Model,
        relation: DepartmentRelation,
        input: DepartmentsInput,
    ) -> Result<signal_departments::Model, ActionError> {
        let txn = self.db.begin().await?;
        let claimed = self.claim(&txn, signal).await?;
        let (departments, _signal, events) = self
            .departments_no_txn(&txn, claimed, relation, &input)
            .await?;
        self.commit_and_dispatch(txn, events).await?;
        Ok(departments)
    }

    /// Append a user-assignment version and move the pointer.
    pub async fn update_user_assignment(
        &self,
        signal: &signal::Model,
        input: UserAssignmentInput,
    ) -> Result<signal_user::Model, ActionError> {
        let txn = self.db.begin().await?;
        let claimed = self.claim(&txn, signal).await?;
        let (assignment, _signal, event) =
            self.user_assignment_no_txn(&txn, claimed, &input).await?;
        self.commit_and_dispatch(txn, vec![event]).await?;
        Ok(assignment)
    }

    /// Apply several updates under a single claim and commit.
    ///
    /// Events are dispatched in application order after the commit. A
    /// category change resets the routing pointer and unassigns the current
    /// handler, matching what a manual re-classification would require.
    pub async fn update_multiple(
        &self,
        signal: &signal::Model,
        mut update: SignalUpdate,
    ) -> Result<signal::Model, ActionError> {
        if update.is_empty() {
            return Err(ActionError::validation(
                "update",
                "At least one field must be provided.",
            ));
        }
        if let Some(priority) = &update.priority {
            priority.validate()?;
        }
        if let Some(note) = &update.note {
            note.validate()?;
        }
        if let Some(location) = update.location.as_mut() {
            self.derive_area(location).await;
        }

        let txn = self.db.begin().await?;
        let mut current = self.claim(&txn, signal).await?;
        let mut events = Vec::new();

        if let Some(input) = &update.location {
            let (_, signal, event) = self.location_no_txn(&txn, current, input).await?;
            current = signal;
            events.push(event);
        }
        if let Some(input) = &update.status {
            let (_, signal, event) = self.status_no_txn(&txn, current, input).await?;
            current = signal;
            events.push(event);
        }
        if let Some(input) = &update.category_assignment {
            if let Some((_, signal, event)) =
                self.category_assignment_no_txn(&txn, current.clone(), input).await?
            {
                current = signal;
                events.push(event);

                // Re-classification invalidates routing and handler.
                if current.routing_departments_id.is_some() {
                    let mut active: signal::ActiveModel = current.clone().into();
                    active.routing_departments_id = Set(None);
                    current = active.update(&txn).await?;
                }
                let assigned = match current.user_assignment_id {
                    Some(id) => find_by_optional_id::<SignalUser>(&txn, Some(id))
                        .await?
                        .is_some_and(|u| u.user_email.is_some()),
                    None => false,
                };
                if assigned {
                    let unassign = UserAssignmentInput {
                        user_email: None,
                        created_by: input.created_by.clone(),
                    };
                    let (_, signal, event) =
                        self.user_assignment_no_txn(&txn, current, &unassign).await?;
                    current = signal;
                    events.push(event);
                }
            }
        }
        if let Some(input) = &update.note {
            let note = note::ActiveModel {
                id: NotSet,
                signal_id: Set(current.id),
                text: Set(input.text.clone()),
                created_by: Set(input.created_by.clone()),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
            events.push(SignalEvent::NoteCreated {
                signal: current.clone(),
                note,
            });
        }
        if let Some(input) = &update.priority {
            let (_, signal, event) = self.priority_no_txn(&txn, current, input).await?;
            current = signal;
            events.push(event);
        }
        if let Some(input) = &update.r#type {
            let (_, signal, event) = self.type_no_txn(&txn, current, input).await?;
            current = signal;
            events.push(event);
        }
        if let Some(input) = &update.directing_departments {
            let (_, signal, mut dept_events) = self
                .departments_no_txn(&txn, current, DepartmentRelation::Directing, input)
                .await?;
            current = signal;
            events.append(&mut dept_events);
        }
        if let Some(input) = &update.routing_departments {
            let (_, signal, mut dept_events) = self
                .departments_no_txn(&txn, current, DepartmentRelation::Routing, input)
                .await?;
            current = signal;
            events.append(&mut dept_events);
        }
        if let Some(input) = &update.user_assignment {
            let (_, signal, event) = self.user_assignment_no_txn(&txn, current, input).await?;
            current = signal;
            events.push(event);
        }

        tracing::info!(
            signal_id = current.id,
            applied = events.len(),
            "batched signal update applied"
        );
        self.commit_and_dispatch(txn, events).await?;
        Ok(current)
    }

    /// Register an attachment. No pointer on the aggregate, so no claim.
    pub async fn add_attachment(
        &self,
        signal: &signal::Model,
        input: AttachmentInput,
    ) -> Result<attachment::Model, ActionError> {
        input.validate()?;

        let attachment = attachment::ActiveModel {
            id: NotSet,
            signal_id: Set(signal.id),
            storage_key: Set(input.storage_key),
            mime_type: Set(input.mime_type),
            created_by: Set(input.created_by),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await?;

        let event = SignalEvent::AttachmentAdded {
            signal: signal.clone(),
            attachment: attachment.clone(),
        };
        metrics::counter!("signalen_actions_total", "action" => event.kind()).increment(1);
        self.dispatcher.dispatch(&[event]).await;
        Ok(attachment)
    }

    /// Copy every attachment of `source` onto `target`.
    ///
    /// Only valid from a parent to one of its children: a freshly split
    /// child inherits the evidence its parent was reported with.
    pub async fn copy_attachments(
        &self,
        target: &signal::Model,
        source: &signal::Model,
    ) -> Result<Vec<attachment::Model>, ActionError> {
        if target.parent_id != Some(source.id) {
            return Err(ActionError::validation(
                "parent",
                "Attachments can only be copied from a signal's own parent.",
            ));
        }

        let originals = Attachment::find()
            .filter(attachment::Column::SignalId.eq(source.id))
            .all(&self.db)
            .await?;

        let txn = self.db.begin().await?;
        let mut copies = Vec::with_capacity(originals.len());
        let mut events = Vec::with_capacity(originals.len());
        for original in originals {
            let copy = attachment::ActiveModel {
                id: NotSet,
                signal_id: Set(target.id),
                storage_key: Set(original.storage_key),
                mime_type: Set(original.mime_type),
                created_by: Set(original.created_by),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
            events.push(SignalEvent::AttachmentAdded {
                signal: target.clone(),
                attachment: copy.clone(),
            });
            copies.push(copy);
        }
        self.commit_and_dispatch(txn, events).await?;
        Ok(copies)
    }

    /// Claim the aggregate's optimistic lock inside `txn`.
    ///
    /// The claim bumps the version counter only where the caller's view of
    /// the counter is still current. Zero affected rows means either a
    /// concurrent mutation won the race or the signal is gone.
    async fn claim(
        &self,
        txn: &DatabaseTransaction,
        signal: &signal::Model,
    ) -> Result<signal::Model, ActionError> {
        let result = Signal::update_many()
            .col_expr(
                signal::Column::Version,
                Expr::col(signal::Column::Version).add(1),
            )
            .col_expr(signal::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(signal::Column::Id.eq(signal.id))
            .filter(signal::Column::Version.eq(signal.version))
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            let exists = Signal::find_by_id(signal.id).one(txn).await?.is_some();
            return Err(if exists {
                metrics::counter!("signalen_claim_conflicts_total").increment(1);
                ActionError::Conflict {
                    signal_id: signal.id,
                }
            } else {
                ActionError::SignalNotFound(signal.id)
            });
        }

        Signal::find_by_id(signal.id)
            .one(txn)
            .await?
            .ok_or(ActionError::SignalNotFound(signal.id))
    }

    async fn commit_and_dispatch(
        &self,
        txn: DatabaseTransaction,
        events: Vec<SignalEvent>,
    ) -> Result<(), ActionError> {
        txn.commit().await?;
        for event in &events {
            metrics::counter!("signalen_actions_total", "action" => event.kind()).increment(1);
        }
        self.dispatcher.dispatch(&events).await;
        Ok(())
    }

    /// Fill in area fields from the geometry when the caller left them blank.
    ///
    /// Lookup failures are logged and leave the input untouched; a missing
    /// area derivation never blocks a mutation.
    async fn derive_area(&self, input: &mut LocationInput) {
        if input.area_code.is_some() {
            return;
        }
        let Some(area_type) = self.default_area_type.as_deref() else {
            return;
        };
        match self
            .areas
            .find_enclosing(area_type, input.lon, input.lat)
            .await
        {
            Ok(Some(area)) => {
                input.area_type_code = Some(area_type.to_string());
                if area_type == STADSDEEL_AREA_TYPE && input.stadsdeel.is_none() {
                    input.stadsdeel = Some(area.code.clone());
                }
                input.area_code = Some(area.code);
                input.area_name = Some(area.name);
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(%error, "area lookup failed; keeping caller-provided fields");
            }
        }
    }

    async fn location_no_txn(
        &self,
        txn: &DatabaseTransaction,
        claimed: signal::Model,
        input: &LocationInput,
    ) -> Result<(location::Model, signal::Model, SignalEvent), ActionError> {
        let prev = find_by_optional_id::<Location>(txn, claimed.location_id).await?;
        let location = insert_location(txn, claimed.id, input).await?;

        let mut active: signal::ActiveModel = claimed.into();
        active.location_id = Set(Some(location.id));
        let signal = active.update(txn).await?;

        let event = SignalEvent::LocationUpdated {
            signal: signal.clone(),
            location: location.clone(),
            prev_location: prev,
        };
        Ok((location, signal, event))
    }

    async fn status_no_txn(
        &self,
        txn: &DatabaseTransaction,
        claimed: signal::Model,
        input: &StatusInput,
    ) -> Result<(status::Model, signal::Model, SignalEvent), ActionError> {
        let prev = find_by_optional_id::<Status>(txn, claimed.status_id).await?;
        workflow::validate_transition(prev.as_ref().map(|s| s.state), &input.proposed())?;

        let status = insert_status(txn, claimed.id, input).await?;

        let mut active: signal::ActiveModel = claimed.into();
        active.status_id = Set(Some(status.id));
        let signal = active.update(txn).await?;

        tracing::info!(
            signal_id = signal.id,
            state = status.state.code(),
            "status transition applied"
        );
        let event = SignalEvent::StatusUpdated {
            signal: signal.clone(),
            status: status.clone(),
            prev_status: prev,
        };
        Ok((status, signal, event))
    }

    /// Returns `None` when the signal already carries the requested category.
    async fn category_assignment_no_txn(
        &self,
        txn: &DatabaseTransaction,
        claimed: signal::Model,
        input: &CategoryAssignmentInput,
    ) -> Result<Option<(category_assignment::Model, signal::Model, SignalEvent)>, ActionError> {
        let prev = find_by_optional_id::<CategoryAssignment>(txn, claimed.category_assignment_id)
            .await?;
        if prev
            .as_ref()
            .is_some_and(|p| p.category_id == input.category_id)
        {
            return Ok(None);
        }

        let category = Category::find_by_id(input.category_id)
            .one(txn)
            .await?
            .ok_or(ActionError::CategoryNotFound(input.category_id))?;

        let assignment = category_assignment::ActiveModel {
            id: NotSet,
            signal_id: Set(claimed.id),
            category_id: Set(category.id),
            stored_handling_message: Set(category.handling_message),
            created_by: Set(input.created_by.clone()),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await?;

        let mut active: signal::ActiveModel = claimed.into();
        active.category_assignment_id = Set(Some(assignment.id));
        let signal = active.update(txn).await?;

        let event = SignalEvent::CategoryAssignmentUpdated {
            signal: signal.clone(),
            category_assignment: assignment.clone(),
            prev_category_assignment: prev,
        };
        Ok(Some((assignment, signal, event)))
    }

    async fn priority_no_txn(
        &self,
        txn: &DatabaseTransaction,
        claimed: signal::Model,
        input: &PriorityInput,
    ) -> Result<(priority::Model, signal::Model, SignalEvent), ActionError> {
        let prev = find_by_optional_id::<Priority>(txn, claimed.priority_id).await?;
        let priority = priority::ActiveModel {
            id: NotSet,
            signal_id: Set(claimed.id),
            priority: Set(input.priority.clone()),
            created_by: Set(input.created_by.clone()),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await?;

        let mut active: signal::ActiveModel = claimed.into();
        active.priority_id = Set(Some(priority.id));
        let signal = active.update(txn).await?;

        let event = SignalEvent::PriorityUpdated {
            signal: signal.clone(),
            priority: priority.clone(),
            prev_priority: prev,
        };
        Ok((priority, signal, event))
    }

    async fn type_no_txn(
        &self,
        txn: &DatabaseTransaction,
        claimed: signal::Model,
        input: &TypeInput,
    ) -> Result<(signal_type::Model, signal::Model, SignalEvent), ActionError> {
        let prev = find_by_optional_id::<SignalType>(txn, claimed.type_id).await?;
        let r#type = signal_type::ActiveModel {
            id: NotSet,
            signal_id: Set(claimed.id),
            name: Set(input.name.clone()),
            created_by: Set(input.created_by.clone()),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await?;

        let mut active: signal::ActiveModel = claimed.into();
        active.type_id = Set(Some(r#type.id));
        let signal = active.update(txn).await?;

        let event = SignalEvent::TypeUpdated {
            signal: signal.clone(),
            r#type: r#type.clone(),
            prev_type: prev,
        };
        Ok((r#type, signal, event))
    }

    async fn departments_no_txn(
        &self,
        txn: &DatabaseTransaction,
        claimed: signal::Model,
        relation: DepartmentRelation,
        input: &DepartmentsInput,
    ) -> Result<(signal_departments::Model, signal::Model, Vec<SignalEvent>), ActionError> {
        let prev_id = match relation {
            DepartmentRelation::Directing => claimed.directing_departments_id,
            DepartmentRelation::Routing => claimed.routing_departments_id,
        };
        let prev = find_by_optional_id::<SignalDepartments>(txn, prev_id).await?;

        let departments = signal_departments::ActiveModel {
            id: NotSet,
            signal_id: Set(claimed.id),
            relation_type: Set(relation.as_str().to_string()),
            department_ids: Set(serde_json::json!(input.department_ids)),
            created_by: Set(input.created_by.clone()),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await?;

        let mut active: signal::ActiveModel = claimed.into();
        match relation {
            DepartmentRelation::Directing => {
                active.directing_departments_id = Set(Some(departments.id));
            }
            DepartmentRelation::Routing => {
                active.routing_departments_id = Set(Some(departments.id));
            }
        }
        let mut signal = active.update(txn).await?;

        let mut events = vec![SignalEvent::SignalDepartmentsUpdated {
            signal: signal.clone(),
            signal_departments: departments.clone(),
            prev_signal_departments: prev.clone(),
        }];

        // Routing to a different department set invalidates the handler.
        if relation == DepartmentRelation::Routing {
            let routing_changed = prev
                .map(|p| p.department_ids() != input.department_ids)
                .unwrap_or(true);
            let assigned = match signal.user_assignment_id {
                Some(id) => find_by_optional_id::<SignalUser>(txn, Some(id))
                    .await?
                    .is_some_and(|u| u.user_email.is_some()),
                None => false,
            };
            if routing_changed && assigned {
                let unassign = UserAssignmentInput {
                    user_email: None,
                    created_by: input.created_by.clone(),
                };
                let (_, updated, event) =
                    self.user_assignment_no_txn(txn, signal, &unassign).await?;
                signal = updated;
                events.push(event);
            }
        }

        Ok((departments, signal, events))
    }

    async fn user_assignment_no_txn(
        &self,
        txn: &DatabaseTransaction,
        claimed: signal::Model,
        input: &UserAssignmentInput,
    ) -> Result<(signal_user::Model, signal::Model, SignalEvent), ActionError> {
        let prev = find_by_optional_id::<SignalUser>(txn, claimed.user_assignment_id).await?;
        let assignment = signal_user::ActiveModel {
            id: NotSet,
            signal_id: Set(claimed.id),
            user_email: Set(input.user_email.clone()),
            created_by: Set(input.created_by.clone()),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await?;

        let mut active: signal::ActiveModel = claimed.into();
        active.user_assignment_id = Set(Some(assignment.id));
        let signal = active.update(txn).await?;

        let event = SignalEvent::UserAssignmentUpdated {
            signal: signal.clone(),
            user_assignment: assignment.clone(),
            prev_user_assignment: prev,
        };
        Ok((assignment, signal, event))
    }
}

async fn find_by_optional_id<E>(
    txn: &DatabaseTransaction,
    id: Option<i64>,
) -> Result<Option<E::Model>, ActionError>
where
    E: EntityTrait,
    E::PrimaryKey: sea_orm::PrimaryKeyTrait<ValueType = i64>,
{
    match id {
        Some(id) => Ok(E::find_by_id(id).one(txn).await?),
        None => Ok(None),
    }
}

async fn insert_location(
    txn: &DatabaseTransaction,
    signal_id: i64,
    input: &LocationInput,
) -> Result<location::Model, ActionError> {
    Ok(location::ActiveModel {
        id: NotSet,
        signal_id: Set(signal_id),
        lon: Set(input.lon),
        lat: Set(input.lat),
        address: Set(input.address.clone()),
        stadsdeel: Set(input.stadsdeel.clone()),
        area_type_code: Set(input.area_type_code.clone()),
        area_code: Set(input.area_code.clone()),
        area_name: Set(input.area_name.clone()),
        created_by: Set(input.created_by.clone()),
        created_at: Set(Utc::now().into()),
    }
    .insert(txn)
    .await?)
}

async fn insert_status(
    txn: &DatabaseTransaction,
    signal_id: i64,
    input: &StatusInput,
) -> Result<status::Model, ActionError> {
    Ok(status::ActiveModel {
        id: NotSet,
        signal_id: Set(signal_id),
        state: Set(input.state),
        text: Set(input.text.clone()),
        send_email: Set(input.send_email),
        target_api: Set(input.target_api.clone()),
        email_override: Set(input.email_override.clone()),
        created_by: Set(input.created_by.clone()),
        created_at: Set(Utc::now().into()),
    }
    .insert(txn)
    .await?)
}
