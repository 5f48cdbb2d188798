use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime};
use mongodb::Collection;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::{require_admin, AuthUser};
use crate::config::{MongoConfig, Settings};
use crate::error::ApiError;
use crate::media::{self, MediaStore};
use crate::models::product::{self, Product};
use crate::models::product_description::{self, ProductDescription};
use crate::repo::{parse_object_id, scoped, Page, Pagination};
use crate::upload::read_multipart;

const MEDIA_FOLDER: &str = "product_description_media";
const MAX_MEDIA: usize = 5;

fn collection(db: &MongoConfig) -> Collection<ProductDescription> {
    db.database.collection(product_description::COLLECTION)
}

async fn require_product(
    db: &MongoConfig,
    product_id: mongodb::bson::oid::ObjectId,
) -> Result<(), ApiError> {
    let products: Collection<Product> = db.database.collection(product::COLLECTION);
    if products
        .find_one(scoped(doc! { "_id": product_id }, false), None)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Product not found"));
    }
    Ok(())
}

/// A product carries at most one description document.
pub async fn create_description(
    db: web::Data<MongoConfig>,
    settings: web::Data<Settings>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let form = read_multipart(payload, &settings.upload_dir).await?;
    let product_id = parse_object_id(form.require_text("productId")?)?;
    require_product(&db, product_id).await?;

    let existing = collection(&db)
        .count_documents(scoped(doc! { "productId": product_id }, false), None)
        .await?;
    if existing > 0 {
        return Err(ApiError::validation(
            "Product already has a description. Update it instead.",
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
    let mut description = ProductDescription {
        id: None,
        product_id,
        highlights: form.json_field("highlights")?.unwrap_or_default(),
        product_description: form.text("productDescription").map(str::to_string),
        weight: form.text("weight").map(str::to_string),
        volume: form.text("volume").map(str::to_string),
        dimensions: form.text("dimensions").map(str::to_string),
        material: form.text("material").map(str::to_string),
        color: form.text("color").map(str::to_string),
        flavour: form.text("flavour").map(str::to_string),
        scent: form.text("scent").map(str::to_string),
        additional_info: form.text("additionalInfo").map(str::to_string),
        media,
        is_active: true,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    };

    let result = collection(&db).insert_one(&description, None).await?;
    description.id = result.inserted_id.as_object_id();

    info!("description created for product {}", product_id);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Product description created successfully",
        "description": description,
    })))
}

pub async fn update_description(
    db: web::Data<MongoConfig>,
    settings: web::Data<Settings>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    product_id: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let product_id = parse_object_id(&product_id)?;
    let mut existing = collection(&db)
        .find_one(scoped(doc! { "productId": product_id }, false), None)
        .await?
        .ok_or_else(|| ApiError::not_found("Product description not found"))?;

    let form = read_multipart(payload, &settings.upload_dir).await?;

    if let Some(highlights) = form.json_field("highlights")? {
        existing.highlights = highlights;
    }
    if let Some(v) = form.text("productDescription") {
        existing.product_description = Some(v.to_string());
    }
    if let Some(v) = form.text("weight") {
        existing.weight = Some(v.to_string());
    }
    if let Some(v) = form.text("volume") {
        existing.volume = Some(v.to_string());
    }
    if let Some(v) = form.text("dimensions") {
        existing.dimensions = Some(v.to_string());
    }
    if let Some(v) = form.text("material") {
        existing.material = Some(v.to_string());
    }
    if let Some(v) = form.text("color") {
        existing.color = Some(v.to_string());
    }
    if let Some(v) = form.text("flavour") {
        existing.flavour = Some(v.to_string());
    }
    if let Some(v) = form.text("scent") {
        existing.scent = Some(v.to_string());
    }
    if let Some(v) = form.text("additionalInfo") {
        existing.additional_info = Some(v.to_string());
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

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Product description updated successfully",
        "description": existing,
    })))
}

pub async fn get_description(
    db: web::Data<MongoConfig>,
    product_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let product_id = parse_object_id(&product_id)?;
    let found = collection(&db)
        .find_one(scoped(doc! { "productId": product_id }, false), None)
        .await?
        .ok_or_else(|| ApiError::not_found("Product description not found"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "description": found,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub include_deleted: Option<bool>,
}

pub async fn list_descriptions(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    query: web::Query<DescriptionListQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
        sort_by: query.sort_by.clone(),
        sort_order: query.sort_order.clone(),
    };
    let filter = scoped(doc! {}, query.include_deleted.unwrap_or(false));

    let coll = collection(&db);
    let total = coll.count_documents(filter.clone(), None).await?;
    let mut cursor = coll
        .find(filter, pagination.find_options("createdAt"))
        .await?;

    let mut items = Vec::new();
    while let Some(d) = cursor.try_next().await? {
        items.push(d);
    }

    Ok(HttpResponse::Ok().json(Page::new(&pagination, total, items)))
}

pub async fn toggle_active(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    product_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let product_id = parse_object_id(&product_id)?;
    let found = collection(&db)
        .find_one(scoped(doc! { "productId": product_id }, false), None)
        .await?
        .ok_or_else(|| ApiError::not_found("Product description not found"))?;

    let next = !found.is_active;
    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! { "$set": { "isActive": next, "updatedAt": DateTime::now() } },
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Product description isActive set to {}", next),
    })))
}

pub async fn soft_delete_description(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    product_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let product_id = parse_object_id(&product_id)?;
    let found = collection(&db)
        .find_one(scoped(doc! { "productId": product_id }, true), None)
        .await?
        .ok_or_else(|| ApiError::not_found("Product description not found"))?;
    if found.is_deleted {
        return Err(ApiError::validation("Product description already deleted"));
    }

    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! { "$set": { "isDeleted": true, "isActive": false, "updatedAt": DateTime::now() } },
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Product description soft deleted successfully",
    })))
}

pub async fn hard_delete_description(
    db: web::Data<MongoConfig>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    product_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let product_id = parse_object_id(&product_id)?;
    let found = collection(&db)
        .find_one(scoped(doc! { "productId": product_id }, true), None)
        .await?
        .ok_or_else(|| ApiError::not_found("Product description not found"))?;

    media::delete_all(store.get_ref(), &found.media).await;
    collection(&db)
        .delete_one(doc! { "_id": found.id }, None)
        .await?;

    info!("description hard deleted for product {}", product_id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Product description permanently deleted",
    })))
}
