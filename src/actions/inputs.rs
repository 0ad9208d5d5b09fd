//! Typed inputs for the actions API.
//!
//! Every operation takes an explicit input struct with named fields instead
//! of an untyped mapping; construction-time validation covers the invariants
//! that do not need database state (the workflow and the manager handle the
//! rest).

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::error::ValidationErrors;
use crate::models::priority::{PRIORITY_HIGH, PRIORITY_LOW, PRIORITY_NORMAL};
use crate::workflow::{ProposedStatus, State};

/// Everything needed to create a signal with its first sub-entity versions.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSignal {
    /// Channel the report came in through
    #[serde(default = "default_source")]
    pub source: String,
    pub text: String,
    #[serde(default)]
    pub text_extra: String,
    pub incident_date_start: DateTime<FixedOffset>,
    #[serde(default)]
    pub incident_date_end: Option<DateTime<FixedOffset>>,
    /// Set to create a child of an existing signal
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub created_by: Option<String>,

    pub location: LocationInput,
    /// Defaults to a bare `reported` status
    #[serde(default)]
    pub status: Option<StatusInput>,
    pub category_assignment: CategoryAssignmentInput,
    pub reporter: ReporterInput,
    #[serde(default)]
    pub priority: Option<PriorityInput>,
    #[serde(default)]
    pub r#type: Option<TypeInput>,
}

fn default_source() -> String {
    "online".to_string()
}

impl CreateSignal {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.text.trim().is_empty() {
            errors.add("text", "This field may not be blank.");
        }
        if let Some(priority) = &self.priority
            && let Err(priority_errors) = priority.validate()
        {
            for field_error in priority_errors.fields() {
                errors.add(format!("priority.{}", field_error.field), field_error.message.clone());
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LocationInput {
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub address: Option<JsonValue>,
    /// Borough; derived from the geometry when not supplied
    #[serde(default)]
    pub stadsdeel: Option<String>,
    #[serde(default)]
    pub area_type_code: Option<String>,
    #[serde(default)]
    pub area_code: Option<String>,
    #[serde(default)]
    pub area_name: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusInput {
    pub state: State,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub send_email: bool,
    #[serde(default)]
    pub target_api: Option<String>,
    #[serde(default)]
    pub email_override: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl StatusInput {
    /// The workflow's view of this input.
    pub fn proposed(&self) -> ProposedStatus<'_> {
        ProposedStatus {
            state: self.state,
            text: self.text.as_deref(),
            target_api: self.target_api.as_deref(),
            email_override: self.email_override.as_deref(),
        }
    }
}

impl Default for StatusInput {
    fn default() -> Self {
        Self {
            state: State::Reported,
            text: None,
            send_email: false,
            target_api: None,
            email_override: None,
            created_by: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CategoryAssignmentInput {
    pub category_id: i64,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReporterInput {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub sharing_allowed: bool,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PriorityInput {
    pub priority: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl PriorityInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self.priority.as_str() {
            PRIORITY_LOW | PRIORITY_NORMAL | PRIORITY_HIGH => Ok(()),
            other => Err(ValidationErrors::single(
                "priority",
                format!("`{}` is not a valid priority.", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TypeInput {
    pub name: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NoteInput {
    pub text: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl NoteInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        if self.text.trim().is_empty() {
            return Err(ValidationErrors::single("text", "This field may not be blank."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttachmentInput {
    /// Key of the uploaded file in the storage backend
    pub storage_key: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl AttachmentInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        if self.storage_key.trim().is_empty() {
            return Err(ValidationErrors::single(
                "storage_key",
                "This field may not be blank.",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DepartmentsInput {
    pub department_ids: Vec<i64>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserAssignmentInput {
    /// None records an explicit unassignment
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Batched update applied under a single aggregate claim and commit.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SignalUpdate {
    #[serde(default)]
    pub location: Option<LocationInput>,
    #[serde(default)]
    pub status: Option<StatusInput>,
    #[serde(default)]
    pub category_assignment: Option<CategoryAssignmentInput>,
    #[serde(default)]
    pub priority: Option<PriorityInput>,
    #[serde(default)]
    pub note: Option<NoteInput>,
    #[serde(default)]
    pub r#type: Option<TypeInput>,
    #[serde(default)]
    pub directing_departments: Option<DepartmentsInput>,
    #[serde(default)]
    pub routing_departments: Option<DepartmentsInput>,
    #[serde(default)]
    pub user_assignment: Option<UserAssignmentInput>,
}

impl SignalUpdate {
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.status.is_none()
            && self.category_assignment.is_none()
            && self.priority.is_none()
            && self.note.is_none()
            && self.r#type.is_none()
            && self.directing_departments.is_none()
            && self.routing_departments.is_none()
            && self.user_assignment.is_none()
    }
}

/// Which department relation an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartmentRelation {
    Directing,
    Routing,
}

impl DepartmentRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepartmentRelation::Directing => crate::models::signal_departments::REL_DIRECTING,
            DepartmentRelation::Routing => crate::models::signal_departments::REL_ROUTING,
        }
    }
}
