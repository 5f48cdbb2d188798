use chrono::{Duration, Utc};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::{default_true, LocalizedText, StoredMedia};

pub const COLLECTION: &str = "reviews";

/// Window within which a non-privileged owner may edit or delete their
/// own review.
pub const EDIT_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub product_id: ObjectId,
    pub user_id: ObjectId,
    pub rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub review_content: LocalizedText,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub media: Vec<StoredMedia>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_verified_purchase: bool,
    #[serde(default)]
    pub helpful_count: i64,
    #[serde(default)]
    pub helpful_by: Vec<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Review {
    pub fn within_edit_window(&self) -> bool {
        let age = Utc::now() - self.created_at.to_chrono();
        age < Duration::hours(EDIT_WINDOW_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_created_hours_ago(hours: i64) -> Review {
        let created = Utc::now() - Duration::hours(hours);
        Review {
            id: Some(ObjectId::new()),
            product_id: ObjectId::new(),
            user_id: ObjectId::new(),
            rating: 4,
            title: None,
            review_content: LocalizedText::default(),
            is_active: true,
            is_deleted: false,
            media: vec![],
            is_approved: false,
            is_verified_purchase: false,
            helpful_count: 0,
            helpful_by: vec![],
            created_at: DateTime::from_chrono(created),
            updated_at: DateTime::from_chrono(created),
        }
    }

    #[test]
    fn edit_window_is_twenty_four_hours() {
        assert!(review_created_hours_ago(1).within_edit_window());
        assert!(review_created_hours_ago(23).within_edit_window());
        assert!(!review_created_hours_ago(25).within_edit_window());
    }
}
