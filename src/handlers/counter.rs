use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::Collection;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::{require_admin, AuthUser};
use crate::config::MongoConfig;
use crate::error::ApiError;
use crate::models::category::{self, Category};
use crate::models::counter::{self, Counter, CounterStatus};
use crate::repo::{parse_object_id, scoped, Page, Pagination};

fn collection(db: &MongoConfig) -> Collection<Counter> {
    db.database.collection(counter::COLLECTION)
}

async fn find_counter(
    db: &MongoConfig,
    id: &str,
    include_deleted: bool,
) -> Result<Counter, ApiError> {
    let object_id = parse_object_id(id)?;
    collection(db)
        .find_one(scoped(doc! { "_id": object_id }, include_deleted), None)
        .await?
        .ok_or_else(|| ApiError::not_found("Counter not found"))
}

async fn ensure_unique_number(
    db: &MongoConfig,
    counter_number: i64,
    exclude: Option<&ObjectId>,
) -> Result<(), ApiError> {
    let mut filter = scoped(doc! { "counterNumber": counter_number }, false);
    if let Some(id) = exclude {
        filter.insert("_id", doc! { "$ne": id });
    }
    if collection(db).count_documents(filter, None).await? > 0 {
        return Err(ApiError::validation(format!(
            "Counter number {} is already in use",
            counter_number
        )));
    }
    Ok(())
}

/// Every referenced category must exist and be live.
async fn validate_categories(db: &MongoConfig, ids: &[ObjectId]) -> Result<(), ApiError> {
    if ids.is_empty() {
        return Ok(());
    }
    let categories: Collection<Category> = db.database.collection(category::COLLECTION);
    let found = categories
        .count_documents(scoped(doc! { "_id": { "$in": ids.to_vec() } }, false), None)
        .await?;
    if found as usize != ids.len() {
        return Err(ApiError::validation(
            "One or more categories are invalid or deleted",
        ));
    }
    Ok(())
}

fn parse_category_ids(raw: &[String]) -> Result<Vec<ObjectId>, ApiError> {
    raw.iter().map(|id| parse_object_id(id)).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCounterRequest {
    pub counter_number: i64,
    pub counter_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub status: Option<CounterStatus>,
    pub location: Option<String>,
}

pub async fn create_counter(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    body: web::Json<CreateCounterRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let body = body.into_inner();
    if body.counter_name.trim().is_empty() {
        return Err(ApiError::validation("counterName is required"));
    }
    if body.counter_number <= 0 {
        return Err(ApiError::validation(
            "counterNumber must be a positive number",
        ));
    }
    ensure_unique_number(&db, body.counter_number, None).await?;

    let categories = parse_category_ids(&body.categories)?;
    validate_categories(&db, &categories).await?;

    let now = DateTime::now();
    let mut new_counter = Counter {
        id: None,
        counter_number: body.counter_number,
        counter_name: body.counter_name.trim().to_string(),
        description: body.description,
        categories,
        status: body.status.unwrap_or_default(),
        location: body.location.unwrap_or_else(|| "Main Store".to_string()),
        is_active: true,
        is_deleted: false,
        created_by: Some(user.id),
        updated_by: None,
        created_at: now,
        updated_at: now,
    };

    let result = collection(&db).insert_one(&new_counter, None).await?;
    new_counter.id = result.inserted_id.as_object_id();

    info!("counter {} created", new_counter.counter_number);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Counter created successfully",
        "counter": new_counter,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCounterRequest {
    pub counter_number: Option<i64>,
    pub counter_name: Option<String>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub status: Option<CounterStatus>,
    pub location: Option<String>,
}

pub async fn update_counter(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
    body: web::Json<UpdateCounterRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let mut existing = find_counter(&db, &id, false).await?;
    let body = body.into_inner();

    if let Some(number) = body.counter_number {
        if number <= 0 {
            return Err(ApiError::validation(
                "counterNumber must be a positive number",
            ));
        }
        if number != existing.counter_number {
            ensure_unique_number(&db, number, existing.id.as_ref()).await?;
            existing.counter_number = number;
        }
    }
    if let Some(name) = body.counter_name {
        if name.trim().is_empty() {
            return Err(ApiError::validation("counterName cannot be empty"));
        }
        existing.counter_name = name.trim().to_string();
    }
    if let Some(description) = body.description {
        existing.description = Some(description);
    }
    if let Some(raw) = body.categories {
        let categories = parse_category_ids(&raw)?;
        validate_categories(&db, &categories).await?;
        existing.categories = categories;
    }
    if let Some(status) = body.status {
        existing.status = status;
    }
    if let Some(location) = body.location {
        existing.location = location;
    }

    existing.updated_by = Some(user.id);
    existing.updated_at = DateTime::now();

    collection(&db)
        .replace_one(doc! { "_id": existing.id }, &existing, None)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Counter updated successfully",
        "counter": existing,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub search: Option<String>,
    pub status: Option<CounterStatus>,
    pub category: Option<String>,
    pub include_deleted: Option<bool>,
}

pub async fn list_counters(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    query: web::Query<CounterListQuery>,
) -> Result<HttpResponse, ApiError> {
    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
        sort_by: query.sort_by.clone(),
        sort_order: query.sort_order.clone(),
    };

    // Only privileged callers may widen the view to deleted counters.
    let include_deleted = query.include_deleted.unwrap_or(false) && user.role.is_elevated();
    let mut filter = scoped(doc! {}, include_deleted);

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        filter.insert(
            "counterName",
            doc! { "$regex": regex::escape(search), "$options": "i" },
        );
    }
    if let Some(status) = query.status {
        filter.insert(
            "status",
            mongodb::bson::to_bson(&status)
                .map_err(|e| ApiError::internal(format!("Status encoding failed: {}", e)))?,
        );
    }
    if let Some(category) = &query.category {
        filter.insert("categories", parse_object_id(category)?);
    }

    let coll = collection(&db);
    let total = coll.count_documents(filter.clone(), None).await?;
    let mut cursor = coll
        .find(filter, pagination.find_options("counterNumber"))
        .await?;

    let mut items = Vec::new();
    while let Some(c) = cursor.try_next().await? {
        items.push(c);
    }

    Ok(HttpResponse::Ok().json(Page::new(&pagination, total, items)))
}

pub async fn get_counter(
    db: web::Data<MongoConfig>,
    _user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let found = find_counter(&db, &id, false).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "counter": found,
    })))
}

/// The live categories this counter serves.
pub async fn counter_categories(
    db: web::Data<MongoConfig>,
    _user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let found = find_counter(&db, &id, false).await?;

    let categories: Collection<Category> = db.database.collection(category::COLLECTION);
    let mut cursor = categories
        .find(
            scoped(doc! { "_id": { "$in": found.categories.clone() } }, false),
            None,
        )
        .await?;

    let mut items = Vec::new();
    while let Some(c) = cursor.try_next().await? {
        items.push(c);
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "counterId": found.id,
        "counterNumber": found.counter_number,
        "categories": items,
    })))
}

pub async fn toggle_active(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_counter(&db, &id, false).await?;
    let next = !found.is_active;
    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! { "$set": {
                "isActive": next,
                "updatedBy": user.id,
                "updatedAt": DateTime::now(),
            } },
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Counter isActive set to {}", next),
    })))
}

#[derive(Debug, Deserialize)]
pub struct CounterStatusRequest {
    pub status: CounterStatus,
}

pub async fn update_status(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
    body: web::Json<CounterStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_counter(&db, &id, false).await?;
    let status = mongodb::bson::to_bson(&body.status)
        .map_err(|e| ApiError::internal(format!("Status encoding failed: {}", e)))?;

    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! { "$set": {
                "status": status,
                "updatedBy": user.id,
                "updatedAt": DateTime::now(),
            } },
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Counter status updated successfully",
    })))
}

pub async fn soft_delete_counter(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_counter(&db, &id, true).await?;
    if found.is_deleted {
        return Err(ApiError::validation("Counter already deleted"));
    }

    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! { "$set": {
                "isDeleted": true,
                "isActive": false,
                "updatedBy": user.id,
                "updatedAt": DateTime::now(),
            } },
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Counter soft deleted successfully",
    })))
}

/// Brings a soft-deleted counter back into service.
pub async fn restore_counter(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_counter(&db, &id, true).await?;
    if !found.is_deleted {
        return Err(ApiError::validation("Counter is not deleted"));
    }
    ensure_unique_number(&db, found.counter_number, found.id.as_ref()).await?;

    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! { "$set": {
                "isDeleted": false,
                "isActive": true,
                "updatedBy": user.id,
                "updatedAt": DateTime::now(),
            } },
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Counter restored successfully",
    })))
}

pub async fn hard_delete_counter(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_counter(&db, &id, true).await?;
    collection(&db)
        .delete_one(doc! { "_id": found.id }, None)
        .await?;

    info!("counter hard deleted: {:?}", found.id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Counter permanently deleted",
    })))
}
