//! # Data Models
//!
//! SeaORM entity models for the signal aggregate, its versioned sub-entities
//! and the reference tables.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod area;
pub mod attachment;
pub mod category;
pub mod category_assignment;
pub mod department;
pub mod location;
pub mod note;
pub mod priority;
pub mod reporter;
pub mod signal;
pub mod signal_departments;
pub mod signal_type;
pub mod signal_user;
pub mod status;

pub use area::Entity as Area;
pub use attachment::Entity as Attachment;
pub use category::Entity as Category;
pub use category_assignment::Entity as CategoryAssignment;
pub use department::Entity as Department;
pub use location::Entity as Location;
pub use note::Entity as Note;
pub use priority::Entity as Priority;
pub use reporter::Entity as Reporter;
pub use signal::Entity as Signal;
pub use signal_departments::Entity as SignalDepartments;
pub use signal_type::Entity as SignalType;
pub use signal_user::Entity as SignalUser;
pub use status::Entity as Status;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "signalen".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
