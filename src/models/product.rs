use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::{default_true, LocalizedText, StoredMedia};
use crate::error::ApiError;

pub const COLLECTION: &str = "products";

fn default_low_stock_alert() -> i64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub price_modifier: f64,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specification {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: LocalizedText,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: LocalizedText,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<f64>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_low_stock_alert")]
    pub low_stock_alert: i64,
    pub category: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<ObjectId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<StoredMedia>,
    /// Derived from the approved, non-deleted review set; never written
    /// directly by a client.
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub total_reviews: i64,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub views_count: i64,
    #[serde(default)]
    pub sold_count: i64,
    #[serde(default)]
    pub specifications: Vec<Specification>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Product {
    pub fn variant_stock_total(&self) -> i64 {
        self.variants.iter().map(|v| v.stock).sum()
    }

    /// Business invariants checked immediately before every persist; a
    /// violation rejects the write.
    pub fn validate_invariants(&self) -> Result<(), ApiError> {
        if let Some(discount) = self.discount_price {
            if discount > self.price {
                return Err(ApiError::validation(
                    "Discount price cannot be greater than price",
                ));
            }
        }
        if self.variant_stock_total() > self.stock {
            return Err(ApiError::validation(
                "Total stock of variants cannot exceed overall product stock",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocalizedText;

    fn sample() -> Product {
        Product {
            id: None,
            name: LocalizedText {
                english: "Brass Diya".to_string(),
                hindi: "पीतल दीया".to_string(),
            },
            slug: "brass-diya".to_string(),
            description: LocalizedText::default(),
            price: 100.0,
            discount_price: None,
            stock: 10,
            low_stock_alert: 5,
            category: ObjectId::new(),
            brand: None,
            tags: vec![],
            images: vec![],
            average_rating: 0.0,
            total_reviews: 0,
            is_featured: false,
            is_active: true,
            is_deleted: false,
            meta_title: None,
            meta_description: None,
            keywords: vec![],
            variants: vec![],
            views_count: 0,
            sold_count: 0,
            specifications: vec![],
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    #[test]
    fn discount_must_not_exceed_price() {
        let mut p = sample();
        p.discount_price = Some(100.0);
        assert!(p.validate_invariants().is_ok());

        p.discount_price = Some(100.01);
        assert!(p.validate_invariants().is_err());
    }

    #[test]
    fn variant_stock_must_not_exceed_total() {
        let mut p = sample();
        p.variants = vec![
            Variant {
                name: "Small".to_string(),
                options: vec![],
                price_modifier: 0.0,
                stock: 6,
            },
            Variant {
                name: "Large".to_string(),
                options: vec![],
                price_modifier: 0.0,
                stock: 4,
            },
        ];
        assert_eq!(p.variant_stock_total(), 10);
        assert!(p.validate_invariants().is_ok());

        p.stock = 9;
        assert!(p.validate_invariants().is_err());
    }

    #[test]
    fn bson_fields_stay_camel_case() {
        let p = sample();
        let doc = mongodb::bson::to_document(&p).unwrap();
        assert!(doc.contains_key("isDeleted"));
        assert!(doc.contains_key("averageRating"));
        assert!(doc.contains_key("lowStockAlert"));
    }
}
