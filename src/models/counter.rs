use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::default_true;

pub const COLLECTION: &str = "counters";

fn default_location() -> String {
    "Main Store".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterStatus {
    Active,
    Inactive,
    UnderMaintenance,
}

impl Default for CounterStatus {
    fn default() -> Self {
        CounterStatus::Active
    }
}

/// A physical sales counter on the shop floor, bound to the categories it
/// serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub counter_number: i64,
    pub counter_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<ObjectId>,
    #[serde(default)]
    pub status: CounterStatus,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        let s = serde_json::to_string(&CounterStatus::UnderMaintenance).unwrap();
        assert_eq!(s, "\"under_maintenance\"");
        let s: CounterStatus = serde_json::from_str("\"inactive\"").unwrap();
        assert_eq!(s, CounterStatus::Inactive);
    }
}
