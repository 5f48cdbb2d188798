//! Derived-field recomputation: product rating aggregates and variant
//! stock reconciliation.

use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;
use tracing::debug;

use crate::error::ApiError;
use crate::models::product::{self, Variant};
use crate::models::review::{self, Review};

/// Mean rating rounded to one decimal; 0.0 for an empty set.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let mean = ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Shrinks per-variant stock proportionally when the new total is below the
/// current variant sum, flooring each result so the "variant sum never
/// exceeds total stock" invariant holds after the write. A new total at or
/// above the current sum leaves variants untouched, and an empty variant
/// sum skips reconciliation entirely.
pub fn reconcile_variant_stock(new_total: i64, variants: &mut [Variant]) {
    let current: i64 = variants.iter().map(|v| v.stock).sum();
    if current == 0 || new_total >= current {
        return;
    }
    let ratio = new_total as f64 / current as f64;
    for variant in variants.iter_mut() {
        variant.stock = (variant.stock as f64 * ratio).floor() as i64;
    }
}

/// Filter selecting the reviews that count toward a product's aggregates.
pub fn counted_reviews(product_id: ObjectId, exclude: Option<ObjectId>) -> Document {
    let mut filter = doc! {
        "productId": product_id,
        "isApproved": true,
        "isDeleted": { "$ne": true },
    };
    if let Some(id) = exclude {
        filter.insert("_id", doc! { "$ne": id });
    }
    filter
}

/// Recomputes `averageRating` and `totalReviews` from a single snapshot
/// read of the approved, non-deleted review set and persists both onto the
/// product. `exclude` drops the review currently being hard-deleted so the
/// recomputation never reads its own doomed write. Persistence failures
/// propagate; the caller's request fails as a whole.
pub async fn recompute_product_rating(
    db: &Database,
    product_id: ObjectId,
    exclude: Option<ObjectId>,
) -> Result<(), ApiError> {
    let reviews = db.collection::<Review>(review::COLLECTION);

    let mut ratings = Vec::new();
    let mut cursor = reviews.find(counted_reviews(product_id, exclude), None).await?;
    while let Some(r) = cursor.try_next().await? {
        ratings.push(r.rating);
    }

    let total = ratings.len() as i64;
    let average = average_rating(&ratings);
    debug!("product {} aggregates: avg={} total={}", product_id, average, total);

    db.collection::<Document>(product::COLLECTION)
        .update_one(
            doc! { "_id": product_id },
            doc! { "$set": { "averageRating": average, "totalReviews": total } },
            None,
        )
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(stock: i64) -> Variant {
        Variant {
            name: format!("v{}", stock),
            options: vec![],
            price_modifier: 0.0,
            stock,
        }
    }

    #[test]
    fn average_of_empty_set_is_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        assert_eq!(average_rating(&[5]), 5.0);
        assert_eq!(average_rating(&[5, 3]), 4.0);
        assert_eq!(average_rating(&[5, 4, 4]), 4.3);
        assert_eq!(average_rating(&[1, 2]), 1.5);
    }

    #[test]
    fn review_scenario_from_zero_reviews() {
        // First review (rating 5) -> 5.0/1; second (rating 3) -> 4.0/2;
        // drop the first -> 3.0/1.
        assert_eq!(average_rating(&[5]), 5.0);
        assert_eq!(average_rating(&[5, 3]), 4.0);
        assert_eq!(average_rating(&[3]), 3.0);
    }

    #[test]
    fn shrink_scales_variants_by_ratio_with_floor() {
        let mut variants = vec![variant(4), variant(4)];
        reconcile_variant_stock(4, &mut variants);
        assert_eq!(variants[0].stock, 2);
        assert_eq!(variants[1].stock, 2);
    }

    #[test]
    fn flooring_keeps_sum_at_or_below_total() {
        let mut variants = vec![variant(3), variant(3), variant(3)];
        reconcile_variant_stock(7, &mut variants);
        let sum: i64 = variants.iter().map(|v| v.stock).sum();
        assert!(sum <= 7);
        // 3 * 7/9 = 2.33 floors to 2.
        assert!(variants.iter().all(|v| v.stock == 2));
    }

    #[test]
    fn no_rebalance_when_total_covers_variants() {
        let mut variants = vec![variant(4), variant(4)];
        reconcile_variant_stock(8, &mut variants);
        assert_eq!(variants[0].stock, 4);

        reconcile_variant_stock(20, &mut variants);
        assert_eq!(variants[1].stock, 4);
    }

    #[test]
    fn zero_variant_sum_skips_reconciliation() {
        let mut variants = vec![variant(0), variant(0)];
        reconcile_variant_stock(3, &mut variants);
        assert!(variants.iter().all(|v| v.stock == 0));

        let mut empty: Vec<Variant> = vec![];
        reconcile_variant_stock(3, &mut empty);
    }

    #[test]
    fn counted_reviews_filter_shape() {
        let pid = ObjectId::new();
        let rid = ObjectId::new();

        let filter = counted_reviews(pid, None);
        assert_eq!(filter.get_bool("isApproved").unwrap(), true);
        assert!(filter.get("_id").is_none());

        let filter = counted_reviews(pid, Some(rid));
        assert_eq!(filter.get_document("_id").unwrap(), &doc! { "$ne": rid });
    }
}
