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
use crate::models::brand::{self, Brand};
use crate::models::product::{self, Product};
use crate::repo::{parse_object_id, scoped, Page, Pagination};
use crate::slug::{slugify, unique_slug};
use crate::upload::read_multipart;

const LOGO_FOLDER: &str = "brand_logos";

fn collection(db: &MongoConfig) -> Collection<Brand> {
    db.database.collection(brand::COLLECTION)
}

async fn find_brand(db: &MongoConfig, id: &str, include_deleted: bool) -> Result<Brand, ApiError> {
    let object_id = parse_object_id(id)?;
    collection(db)
        .find_one(scoped(doc! { "_id": object_id }, include_deleted), None)
        .await?
        .ok_or_else(|| ApiError::not_found("Brand not found"))
}

async fn ensure_unique_name(
    db: &MongoConfig,
    name: &str,
    exclude: Option<&mongodb::bson::oid::ObjectId>,
) -> Result<(), ApiError> {
    let mut filter = scoped(
        doc! { "name": { "$regex": format!("^{}$", regex::escape(name)), "$options": "i" } },
        false,
    );
    if let Some(id) = exclude {
        filter.insert("_id", doc! { "$ne": id });
    }
    if collection(db).count_documents(filter, None).await? > 0 {
        return Err(ApiError::validation("Brand with this name already exists"));
    }
    Ok(())
}

pub async fn create_brand(
    db: web::Data<MongoConfig>,
    settings: web::Data<Settings>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let form = read_multipart(payload, &settings.upload_dir).await?;
    let name = form.require_text("name")?.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("name is required"));
    }
    ensure_unique_name(&db, &name, None).await?;

    let logo = match form.files_for("logo").first() {
        Some(file) => Some(
            store
                .get_ref()
                .upload(file.path(), LOGO_FOLDER)
                .await
                .map_err(ApiError::from)?,
        ),
        None => None,
    };

    let now = DateTime::now();
    let mut new_brand = Brand {
        id: None,
        slug: unique_slug(&db.database, brand::COLLECTION, &slugify(&name), None).await?,
        name,
        description: form.text("description").map(str::to_string),
        logo,
        is_active: true,
        is_deleted: false,
        meta_title: form.text("metaTitle").map(str::to_string),
        meta_description: form.text("metaDescription").map(str::to_string),
        keywords: form.json_field("keywords")?.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    let result = collection(&db).insert_one(&new_brand, None).await?;
    new_brand.id = result.inserted_id.as_object_id();

    info!("brand created: {}", new_brand.slug);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Brand created successfully",
        "brand": new_brand,
    })))
}

pub async fn update_brand(
    db: web::Data<MongoConfig>,
    settings: web::Data<Settings>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    id: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let mut existing = find_brand(&db, &id, false).await?;
    let form = read_multipart(payload, &settings.upload_dir).await?;

    if let Some(name) = form.text("name") {
        let name = name.trim();
        if !name.is_empty() && name != existing.name {
            ensure_unique_name(&db, name, existing.id.as_ref()).await?;
            existing.slug = unique_slug(
                &db.database,
                brand::COLLECTION,
                &slugify(name),
                existing.id.as_ref(),
            )
            .await?;
            existing.name = name.to_string();
        }
    }
    if let Some(description) = form.text("description") {
        existing.description = Some(description.to_string());
    }
    if let Some(title) = form.text("metaTitle") {
        existing.meta_title = Some(title.to_string());
    }
    if let Some(desc) = form.text("metaDescription") {
        existing.meta_description = Some(desc.to_string());
    }
    if let Some(keywords) = form.json_field("keywords")? {
        existing.keywords = keywords;
    }

    if let Some(file) = form.files_for("logo").first() {
        let uploaded = store
            .get_ref()
            .upload(file.path(), LOGO_FOLDER)
            .await
            .map_err(ApiError::from)?;
        if let Some(old) = existing.logo.replace(uploaded) {
            media::delete_all(store.get_ref(), &[old]).await;
        }
    }

    existing.updated_at = DateTime::now();
    collection(&db)
        .replace_one(doc! { "_id": existing.id }, &existing, None)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Brand updated successfully",
        "brand": existing,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub search: Option<String>,
}

pub async fn list_brands(
    db: web::Data<MongoConfig>,
    query: web::Query<BrandListQuery>,
) -> Result<HttpResponse, ApiError> {
    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
        sort_by: query.sort_by.clone(),
        sort_order: query.sort_order.clone(),
    };

    let mut filter = scoped(doc! {}, false);
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        filter.insert(
            "name",
            doc! { "$regex": regex::escape(search), "$options": "i" },
        );
    }

    let coll = collection(&db);
    let total = coll.count_documents(filter.clone(), None).await?;
    let mut cursor = coll.find(filter, pagination.find_options("name")).await?;

    let mut items = Vec::new();
    while let Some(b) = cursor.try_next().await? {
        items.push(b);
    }

    Ok(HttpResponse::Ok().json(Page::new(&pagination, total, items)))
}

pub async fn get_brand(
    db: web::Data<MongoConfig>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let found = find_brand(&db, &id, false).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "brand": found,
    })))
}

pub async fn get_brand_by_slug(
    db: web::Data<MongoConfig>,
    slug: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let found = collection(&db)
        .find_one(scoped(doc! { "slug": slug.as_str() }, false), None)
        .await?
        .ok_or_else(|| ApiError::not_found("Brand not found"))?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "brand": found,
    })))
}

pub async fn toggle_active(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_brand(&db, &id, false).await?;
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
        "message": format!("Brand isActive set to {}", next),
    })))
}

pub async fn soft_delete_brand(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_brand(&db, &id, true).await?;
    if found.is_deleted {
        return Err(ApiError::validation("Brand already deleted"));
    }

    let products: Collection<Product> = db.database.collection(product::COLLECTION);
    let in_use = products
        .count_documents(scoped(doc! { "brand": found.id }, false), None)
        .await?;
    if in_use > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete brand: {} product(s) still use it",
            in_use
        )));
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
        "message": "Brand soft deleted successfully",
    })))
}

pub async fn hard_delete_brand(
    db: web::Data<MongoConfig>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_brand(&db, &id, true).await?;

    let products: Collection<Product> = db.database.collection(product::COLLECTION);
    let in_use = products
        .count_documents(scoped(doc! { "brand": found.id }, false), None)
        .await?;
    if in_use > 0 {
        return Err(ApiError::validation(format!(
            "Cannot delete brand: {} product(s) still use it",
            in_use
        )));
    }

    if let Some(logo) = &found.logo {
        media::delete_all(store.get_ref(), std::slice::from_ref(logo)).await;
    }
    collection(&db)
        .delete_one(doc! { "_id": found.id }, None)
        .await?;

    info!("brand hard deleted: {:?}", found.id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Brand permanently deleted",
    })))
}
