//! Driver domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A driver, optionally assigned to a single vehicle by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub licence_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<Uuid>,
}
