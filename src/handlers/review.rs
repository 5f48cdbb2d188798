use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::Collection;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::aggregate::{average_rating, counted_reviews, recompute_product_rating};
use crate::auth::{require_admin, AuthUser};
use crate::config::{MongoConfig, Settings};
use crate::error::ApiError;
use crate::media::{self, MediaStore};
use crate::models::product::{self, Product};
use crate::models::review::{self, Review};
use crate::models::LocalizedText;
use crate::repo::{parse_object_id, scoped, Page, Pagination};
use crate::upload::read_multipart;

const MEDIA_FOLDER: &str = "review_images";
const MAX_MEDIA: usize = 3;

fn collection(db: &MongoConfig) -> Collection<Review> {
    db.database.collection(review::COLLECTION)
}

async fn find_review(
    db: &MongoConfig,
    id: &str,
    include_deleted: bool,
) -> Result<Review, ApiError> {
    let object_id = parse_object_id(id)?;
    collection(db)
        .find_one(scoped(doc! { "_id": object_id }, include_deleted), None)
        .await?
        .ok_or_else(|| ApiError::not_found("Review not found"))
}

/// Owners may touch their review inside the 24-hour window; admins always
/// may.
fn check_ownership(review: &Review, user: &AuthUser) -> Result<(), ApiError> {
    if user.role.is_elevated() {
        return Ok(());
    }
    if review.user_id != user.id {
        return Err(ApiError::forbidden(
            "You can only modify your own reviews",
        ));
    }
    if !review.within_edit_window() {
        return Err(ApiError::forbidden(
            "Reviews can only be changed within 24 hours of posting",
        ));
    }
    Ok(())
}

/// One review per (product, user), counting soft-deleted reviews too: a
/// user who removed their review cannot post a second one.
fn duplicate_review_filter(product_id: ObjectId, user_id: ObjectId) -> Document {
    doc! { "productId": product_id, "userId": user_id }
}

fn validate_rating(rating: i32) -> Result<(), ApiError> {
    if (1..=5).contains(&rating) {
        return Ok(());
    }
    Err(ApiError::validation("Rating must be between 1 and 5"))
}

pub async fn create_review(
    db: web::Data<MongoConfig>,
    settings: web::Data<Settings>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let form = read_multipart(payload, &settings.upload_dir).await?;

    let product_id = parse_object_id(form.require_text("productId")?)?;
    let rating: i32 = form
        .parsed("rating")?
        .ok_or_else(|| ApiError::validation("rating is required"))?;
    validate_rating(rating)?;

    let review_content: LocalizedText = form.json_field("reviewContent")?.ok_or_else(|| {
        ApiError::validation("reviewContent (english or hindi) is required")
    })?;
    if review_content.english.trim().is_empty() && review_content.hindi.trim().is_empty() {
        return Err(ApiError::validation(
            "reviewContent (english or hindi) is required",
        ));
    }

    let products: Collection<Product> = db.database.collection(product::COLLECTION);
    if products
        .find_one(scoped(doc! { "_id": product_id }, false), None)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Product not found"));
    }

    let already = collection(&db)
        .count_documents(duplicate_review_filter(product_id, user.id), None)
        .await?;
    if already > 0 {
        return Err(ApiError::validation(
            "You have already reviewed this product",
        ));
    }

    let media_files = form.files_for("media");
    if media_files.len() > MAX_MEDIA {
        return Err(ApiError::validation(format!(
            "A maximum of {} media files is allowed",
            MAX_MEDIA
        )));
    }
    let media = media::upload_all(store.get_ref(), &media_files, MEDIA_FOLDER).await?;

    let now = DateTime::now();
    let mut new_review = Review {
        id: None,
        product_id,
        user_id: user.id,
        rating,
        title: form.text("title").map(str::to_string),
        review_content,
        is_active: true,
        is_deleted: false,
        media,
        is_approved: false,
        is_verified_purchase: false,
        helpful_count: 0,
        helpful_by: vec![],
        created_at: now,
        updated_at: now,
    };

    let result = collection(&db).insert_one(&new_review, None).await?;
    new_review.id = result.inserted_id.as_object_id();

    recompute_product_rating(&db.database, product_id, None).await?;

    info!("review created for product {}", product_id);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Review submitted and pending approval",
        "review": new_review,
    })))
}

pub async fn update_review(
    db: web::Data<MongoConfig>,
    settings: web::Data<Settings>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    id: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut existing = find_review(&db, &id, false).await?;
    check_ownership(&existing, &user)?;

    let form = read_multipart(payload, &settings.upload_dir).await?;

    if let Some(rating) = form.parsed::<i32>("rating")? {
        validate_rating(rating)?;
        existing.rating = rating;
    }
    if let Some(title) = form.text("title") {
        existing.title = Some(title.to_string());
    }
    if let Some(content) = form.json_field::<LocalizedText>("reviewContent")? {
        if !content.english.is_empty() {
            existing.review_content.english = content.english;
        }
        if !content.hindi.is_empty() {
            existing.review_content.hindi = content.hindi;
        }
    }

    let media_files = form.files_for("media");
    if !media_files.is_empty() {
        if media_files.len() > MAX_MEDIA {
            return Err(ApiError::validation(format!(
                "A maximum of {} media files is allowed",
                MAX_MEDIA
            )));
        }
        let uploaded = media::upload_all(store.get_ref(), &media_files, MEDIA_FOLDER).await?;
        let previous = std::mem::replace(&mut existing.media, uploaded);
        media::delete_all(store.get_ref(), &previous).await;
    }

    existing.updated_at = DateTime::now();

    collection(&db)
        .replace_one(doc! { "_id": existing.id }, &existing, None)
        .await?;

    recompute_product_rating(&db.database, existing.product_id, None).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Review updated successfully",
        "review": existing,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub rating: Option<i32>,
}

impl ReviewListQuery {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        }
    }
}

async fn paged_reviews(
    db: &MongoConfig,
    filter: mongodb::bson::Document,
    pagination: &Pagination,
) -> Result<Page<Review>, ApiError> {
    let coll = collection(db);
    let total = coll.count_documents(filter.clone(), None).await?;
    let mut cursor = coll
        .find(filter, pagination.find_options("createdAt"))
        .await?;

    let mut items = Vec::new();
    while let Some(r) = cursor.try_next().await? {
        items.push(r);
    }
    Ok(Page::new(pagination, total, items))
}

/// Public listing: only approved, active reviews of the product.
pub async fn product_reviews(
    db: web::Data<MongoConfig>,
    product_id: web::Path<String>,
    query: web::Query<ReviewListQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut filter = scoped(
        doc! {
            "productId": parse_object_id(&product_id)?,
            "isApproved": true,
            "isActive": true,
        },
        false,
    );
    if let Some(rating) = query.rating {
        filter.insert("rating", rating);
    }
    let page = paged_reviews(&db, filter, &query.pagination()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn my_reviews(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    query: web::Query<ReviewListQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = scoped(doc! { "userId": user.id }, false);
    let page = paged_reviews(&db, filter, &query.pagination()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReviewQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub product_id: Option<String>,
    pub user_id: Option<String>,
    pub rating: Option<i32>,
    pub is_approved: Option<bool>,
    pub include_deleted: Option<bool>,
}

/// Full moderation view over the review set.
pub async fn list_reviews(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    query: web::Query<AdminReviewQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
        sort_by: query.sort_by.clone(),
        sort_order: query.sort_order.clone(),
    };

    let mut filter = scoped(doc! {}, query.include_deleted.unwrap_or(false));
    if let Some(product_id) = &query.product_id {
        filter.insert("productId", parse_object_id(product_id)?);
    }
    if let Some(user_id) = &query.user_id {
        filter.insert("userId", parse_object_id(user_id)?);
    }
    if let Some(rating) = query.rating {
        filter.insert("rating", rating);
    }
    if let Some(approved) = query.is_approved {
        filter.insert("isApproved", approved);
    }

    let page = paged_reviews(&db, filter, &pagination).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Moderation queue: reviews awaiting approval.
pub async fn unapproved_reviews(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    query: web::Query<ReviewListQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;
    let filter = scoped(doc! { "isApproved": false }, false);
    let page = paged_reviews(&db, filter, &query.pagination()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_review(
    db: web::Data<MongoConfig>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let found = find_review(&db, &id, false).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "review": found,
    })))
}

/// Flips approval. Both directions recompute the product aggregates since
/// only approved reviews count toward them.
pub async fn toggle_approval(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_review(&db, &id, false).await?;
    let next = !found.is_approved;
    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! { "$set": { "isApproved": next, "updatedAt": DateTime::now() } },
            None,
        )
        .await?;

    recompute_product_rating(&db.database, found.product_id, None).await?;

    let message = if next {
        "Review approved"
    } else {
        "Review approval revoked"
    };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
    })))
}

pub async fn verify_purchase(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_review(&db, &id, false).await?;
    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! { "$set": { "isVerifiedPurchase": true, "updatedAt": DateTime::now() } },
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Review marked as verified purchase",
    })))
}

/// One tap adds the caller to `helpfulBy`; a second removes them. The
/// counter moves with a matching `$inc` computed from a pre-update read,
/// so racing toggles from the same user can skew it against the set.
pub async fn toggle_helpful(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let found = find_review(&db, &id, false).await?;

    let already_voted = found.helpful_by.contains(&user.id);
    let update = if already_voted {
        doc! {
            "$pull": { "helpfulBy": user.id },
            "$inc": { "helpfulCount": -1 },
        }
    } else {
        doc! {
            "$addToSet": { "helpfulBy": user.id },
            "$inc": { "helpfulCount": 1 },
        }
    };

    collection(&db)
        .update_one(doc! { "_id": found.id }, update, None)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "helpful": !already_voted,
        "helpfulCount": found.helpful_count + if already_voted { -1 } else { 1 },
    })))
}

/// Star breakdown plus average for one product's approved reviews.
pub async fn product_review_summary(
    db: web::Data<MongoConfig>,
    product_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let product_id = parse_object_id(&product_id)?;

    let mut ratings = Vec::new();
    let mut cursor = collection(&db)
        .find(counted_reviews(product_id, None), None)
        .await?;
    while let Some(r) = cursor.try_next().await? {
        ratings.push(r.rating);
    }

    let mut breakdown = [0u64; 5];
    for rating in &ratings {
        if (1..=5).contains(rating) {
            breakdown[(*rating - 1) as usize] += 1;
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "productId": product_id,
        "totalReviews": ratings.len(),
        "averageRating": average_rating(&ratings),
        "breakdown": {
            "1": breakdown[0],
            "2": breakdown[1],
            "3": breakdown[2],
            "4": breakdown[3],
            "5": breakdown[4],
        },
    })))
}

pub async fn soft_delete_review(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let found = find_review(&db, &id, false).await?;
    check_ownership(&found, &user)?;

    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! { "$set": { "isDeleted": true, "isActive": false, "updatedAt": DateTime::now() } },
            None,
        )
        .await?;

    recompute_product_rating(&db.database, found.product_id, None).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Review deleted successfully",
    })))
}

/// Removes the document and its media. Aggregates are recomputed with this
/// review excluded before the delete so the product never reads a stale
/// count.
pub async fn hard_delete_review(
    db: web::Data<MongoConfig>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_review(&db, &id, true).await?;
    media::delete_all(store.get_ref(), &found.media).await;

    recompute_product_rating(&db.database, found.product_id, found.id).await?;

    collection(&db)
        .delete_one(doc! { "_id": found.id }, None)
        .await?;

    info!("review hard deleted: {:?}", found.id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Review permanently deleted",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::{Duration, Utc};
    use mongodb::bson::oid::ObjectId;

    fn review_by(user_id: ObjectId, hours_old: i64) -> Review {
        let created = Utc::now() - Duration::hours(hours_old);
        Review {
            id: Some(ObjectId::new()),
            product_id: ObjectId::new(),
            user_id,
            rating: 4,
            title: None,
            review_content: LocalizedText::default(),
            is_active: true,
            is_deleted: false,
            media: vec![],
            is_approved: true,
            is_verified_purchase: false,
            helpful_count: 0,
            helpful_by: vec![],
            created_at: DateTime::from_chrono(created),
            updated_at: DateTime::from_chrono(created),
        }
    }

    fn caller(id: ObjectId, role: Role) -> AuthUser {
        AuthUser {
            id,
            name: "n".to_string(),
            email: "n@x.com".to_string(),
            role,
        }
    }

    #[test]
    fn owner_inside_window_may_modify() {
        let uid = ObjectId::new();
        let review = review_by(uid, 2);
        assert!(check_ownership(&review, &caller(uid, Role::User)).is_ok());
    }

    #[test]
    fn owner_outside_window_is_rejected() {
        let uid = ObjectId::new();
        let review = review_by(uid, 30);
        let err = check_ownership(&review, &caller(uid, Role::User)).unwrap_err();
        assert!(err.to_string().contains("24 hours"));
    }

    #[test]
    fn admin_bypasses_window_and_ownership() {
        let review = review_by(ObjectId::new(), 100);
        assert!(check_ownership(&review, &caller(ObjectId::new(), Role::Admin)).is_ok());
    }

    #[test]
    fn stranger_is_rejected() {
        let review = review_by(ObjectId::new(), 1);
        let err = check_ownership(&review, &caller(ObjectId::new(), Role::User)).unwrap_err();
        assert!(err.to_string().contains("own reviews"));
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn duplicate_check_matches_soft_deleted_reviews() {
        let filter = duplicate_review_filter(ObjectId::new(), ObjectId::new());
        assert!(filter.contains_key("productId"));
        assert!(filter.contains_key("userId"));
        assert!(!filter.contains_key("isDeleted"));
    }
}
