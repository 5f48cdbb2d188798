use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::default_true;

pub const COLLECTION: &str = "carts";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ObjectId,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<f64>,
    pub added_at: DateTime,
}

/// One cart per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub total_discount: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Cart {
    pub fn recalculate_totals(&mut self) {
        self.total_amount = self
            .items
            .iter()
            .map(|i| i.price * i.quantity as f64)
            .sum();
        self.total_discount = self
            .items
            .iter()
            .map(|i| i.discount_price.unwrap_or(0.0) * i.quantity as f64)
            .sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_over_items() {
        let mut cart = Cart {
            id: None,
            user_id: ObjectId::new(),
            items: vec![
                CartItem {
                    product_id: ObjectId::new(),
                    quantity: 2,
                    variant: None,
                    price: 50.0,
                    discount_price: Some(45.0),
                    added_at: DateTime::now(),
                },
                CartItem {
                    product_id: ObjectId::new(),
                    quantity: 1,
                    variant: None,
                    price: 30.0,
                    discount_price: None,
                    added_at: DateTime::now(),
                },
            ],
            total_amount: 0.0,
            total_discount: 0.0,
            is_active: true,
            is_deleted: false,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };

        cart.recalculate_totals();
        assert_eq!(cart.total_amount, 130.0);
        assert_eq!(cart.total_discount, 90.0);
    }
}
