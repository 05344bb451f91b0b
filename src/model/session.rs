//! Session types: the unit of work in plcgen.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::PipelineState;

/// One user session: an id, when it started, and everything produced in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub state: PipelineState,
}

impl Session {
    /// A fresh session with empty pipeline state.
    pub fn start() -> Self {
        let now = Timestamp::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            state: PipelineState::default(),
        }
    }

    /// The first eight characters of the id, for display.
    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }
}
