use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::default_true;

pub const COLLECTION: &str = "wishlists";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub product_id: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub added_at: DateTime,
}

/// One wishlist per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(default)]
    pub items: Vec<WishlistItem>,
    #[serde(default)]
    pub total_items: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_shape_is_camel_case() {
        let wishlist = Wishlist {
            id: None,
            user_id: ObjectId::new(),
            items: vec![WishlistItem {
                product_id: ObjectId::new(),
                variant: Some("Large".to_string()),
                added_at: DateTime::now(),
            }],
            total_items: 1,
            is_active: true,
            is_deleted: false,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };

        let doc = mongodb::bson::to_document(&wishlist).unwrap();
        assert!(doc.contains_key("userId"));
        assert!(doc.contains_key("totalItems"));
        assert_eq!(
            doc.get_array("items").unwrap().len(),
            1
        );
    }
}
