use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Standing filter: every default read excludes soft-deleted documents.
/// Callers opt in to seeing deleted documents explicitly (restore,
/// hard-delete, admin `includeDeleted` listings).
pub fn scoped(mut filter: Document, include_deleted: bool) -> Document {
    if !include_deleted {
        filter.insert("isDeleted", doc! { "$ne": true });
    }
    filter
}

pub fn parse_object_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::validation("Invalid ID format"))
}

/// Common list-endpoint query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl Pagination {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    pub fn skip(&self) -> u64 {
        ((self.page() - 1) * self.limit()) as u64
    }

    pub fn sort(&self, default_field: &str) -> Document {
        let field = self.sort_by.as_deref().unwrap_or(default_field);
        let order = match self.sort_order.as_deref() {
            Some("asc") => 1,
            _ => -1,
        };
        doc! { field: order }
    }

    pub fn find_options(&self, default_sort: &str) -> FindOptions {
        FindOptions::builder()
            .skip(self.skip())
            .limit(self.limit())
            .sort(self.sort(default_sort))
            .build()
    }
}

/// Standard paginated response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub success: bool,
    pub page: i64,
    pub total_pages: i64,
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(pagination: &Pagination, total: u64, items: Vec<T>) -> Self {
        let limit = pagination.limit();
        Page {
            success: true,
            page: pagination.page(),
            total_pages: (total as i64 + limit - 1) / limit,
            total,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_excludes_deleted_by_default() {
        let filter = scoped(doc! { "category": "x" }, false);
        assert_eq!(filter.get_document("isDeleted").unwrap(), &doc! { "$ne": true });

        let filter = scoped(doc! {}, true);
        assert!(filter.get("isDeleted").is_none());
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        let p = Pagination::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 10);
        assert_eq!(p.skip(), 0);

        let p = Pagination {
            page: Some(3),
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(p.limit(), 100);
        assert_eq!(p.skip(), 200);
    }

    #[test]
    fn page_envelope_rounds_total_pages_up() {
        let p = Pagination {
            limit: Some(10),
            ..Default::default()
        };
        let page: Page<i32> = Page::new(&p, 21, vec![]);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total, 21);
    }

    #[test]
    fn sort_direction_defaults_to_descending() {
        let p = Pagination {
            sort_by: Some("price".to_string()),
            sort_order: Some("asc".to_string()),
            ..Default::default()
        };
        assert_eq!(p.sort("createdAt"), doc! { "price": 1 });

        let p = Pagination::default();
        assert_eq!(p.sort("createdAt"), doc! { "createdAt": -1 });
    }
}
