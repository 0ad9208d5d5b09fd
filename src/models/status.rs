//! Status entity model
//!
//! One row per status transition of a signal, append-only. The `state`
//! column uses the workflow [`State`] enum; transition legality is enforced
//! by the actions API before a row is written, never here.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use utoipa::ToSchema;

use crate::workflow::State;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[schema(as = Status)]
#[sea_orm(table_name = "statuses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning signal
    pub signal_id: i64,

    /// Workflow state this row put the signal in
    pub state: State,

    /// Free text accompanying the transition (required for handled/reopened)
    pub text: Option<String>,

    /// Staff-requested reporter email for this transition
    pub send_email: bool,

    /// Hand-off target, set only for the ready_to_send state
    pub target_api: Option<String>,

    /// Recipient override for forwarding to an external party
    pub email_override: Option<String>,

    /// Who recorded this transition
    pub created_by: Option<String>,

    pub created_at: DateTime<FixedOffset>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::signal::Entity",
        from = "Column::SignalId",
        to = "super::signal::Column::Id"
    )]
    Signal,
}

impl Related<super::signal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Signal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
