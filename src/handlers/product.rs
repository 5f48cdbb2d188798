use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::aggregate::{average_rating, counted_reviews, reconcile_variant_stock};
use crate::auth::{require_admin, AuthUser};
use crate::config::{MongoConfig, Settings};
use crate::error::ApiError;
use crate::media::{self, MediaStore};
use crate::models::category::{self, Category};
use crate::models::product::{self, Product, Specification, Variant};
use crate::models::review::{self, Review};
use crate::models::LocalizedText;
use crate::repo::{parse_object_id, scoped, Page, Pagination};
use crate::slug::{slugify, unique_slug};
use crate::upload::read_multipart;

const IMAGE_FOLDER: &str = "product_images";
const MAX_IMAGES: usize = 5;

fn collection(db: &MongoConfig) -> Collection<Product> {
    db.database.collection(product::COLLECTION)
}

/// Variant fields as clients send them; unnamed variants get a positional
/// placeholder name.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantInput {
    name: Option<String>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    price_modifier: f64,
    #[serde(default)]
    stock: i64,
}

fn normalize_variants(inputs: Vec<VariantInput>) -> Vec<Variant> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(idx, v)| Variant {
            name: v.name.unwrap_or_else(|| format!("Variant {}", idx + 1)),
            options: v.options,
            price_modifier: v.price_modifier,
            stock: v.stock,
        })
        .collect()
}

async fn find_product(
    db: &MongoConfig,
    id: &str,
    include_deleted: bool,
) -> Result<Product, ApiError> {
    let object_id = parse_object_id(id)?;
    collection(db)
        .find_one(scoped(doc! { "_id": object_id }, include_deleted), None)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))
}

async fn require_category(db: &MongoConfig, category_id: ObjectId) -> Result<(), ApiError> {
    let categories: Collection<Category> = db.database.collection(category::COLLECTION);
    if categories
        .find_one(scoped(doc! { "_id": category_id }, false), None)
        .await?
        .is_none()
    {
        return Err(ApiError::validation("Category is invalid or deleted"));
    }
    Ok(())
}

pub async fn create_product(
    db: web::Data<MongoConfig>,
    settings: web::Data<Settings>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let form = read_multipart(payload, &settings.upload_dir).await?;

    let name: LocalizedText = form.json_field("name")?.ok_or_else(|| {
        ApiError::validation("Name (english & hindi), price, and category are required")
    })?;
    if name.english.trim().is_empty() || name.hindi.trim().is_empty() {
        return Err(ApiError::validation(
            "Name (english & hindi), price, and category are required",
        ));
    }

    let price: f64 = form.parsed("price")?.ok_or_else(|| {
        ApiError::validation("Name (english & hindi), price, and category are required")
    })?;
    if price < 0.0 {
        return Err(ApiError::validation("Price must be a non-negative number"));
    }

    let category_id = parse_object_id(form.require_text("category")?)?;
    require_category(&db, category_id).await?;

    let brand = match form.text("brand") {
        Some(raw) => Some(parse_object_id(raw)?),
        None => None,
    };

    let description: LocalizedText = form.json_field("description")?.unwrap_or_default();
    let tags: Vec<String> = form.json_field("tags")?.unwrap_or_default();
    let variants = normalize_variants(form.json_field("variants")?.unwrap_or_default());
    let specifications: Vec<Specification> = form.json_field("specifications")?.unwrap_or_default();

    let image_files = form.files_for("images");
    if image_files.len() > MAX_IMAGES {
        return Err(ApiError::validation(format!(
            "A maximum of {} images is allowed",
            MAX_IMAGES
        )));
    }
    let images = media::upload_all(store.get_ref(), &image_files, IMAGE_FOLDER).await?;

    let now = DateTime::now();
    let slug = unique_slug(&db.database, product::COLLECTION, &slugify(&name.english), None).await?;

    let mut new_product = Product {
        id: None,
        name: LocalizedText {
            english: name.english.trim().to_string(),
            hindi: name.hindi.trim().to_string(),
        },
        slug,
        description,
        price,
        discount_price: form.parsed("discountPrice")?,
        stock: form.parsed("stock")?.unwrap_or(0),
        low_stock_alert: form.parsed("lowStockAlert")?.unwrap_or(5),
        category: category_id,
        brand,
        tags,
        images,
        average_rating: 0.0,
        total_reviews: 0,
        is_featured: false,
        is_active: true,
        is_deleted: false,
        meta_title: form.text("metaTitle").map(str::to_string),
        meta_description: form.text("metaDescription").map(str::to_string),
        keywords: form.json_field("keywords")?.unwrap_or_default(),
        variants,
        views_count: 0,
        sold_count: 0,
        specifications,
        created_at: now,
        updated_at: now,
    };
    new_product.validate_invariants()?;

    let result = collection(&db).insert_one(&new_product, None).await?;
    new_product.id = result.inserted_id.as_object_id();

    info!("product created: {:?}", new_product.id);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Product created successfully",
        "product": new_product,
    })))
}

pub async fn update_product(
    db: web::Data<MongoConfig>,
    settings: web::Data<Settings>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    id: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let mut existing = find_product(&db, &id, false).await?;
    let form = read_multipart(payload, &settings.upload_dir).await?;

    if let Some(name) = form.json_field::<LocalizedText>("name")? {
        if !name.english.trim().is_empty() && name.english.trim() != existing.name.english {
            existing.slug = unique_slug(
                &db.database,
                product::COLLECTION,
                &slugify(name.english.trim()),
                existing.id.as_ref(),
            )
            .await?;
            existing.name.english = name.english.trim().to_string();
        }
        if !name.hindi.trim().is_empty() {
            existing.name.hindi = name.hindi.trim().to_string();
        }
    }
    if let Some(description) = form.json_field::<LocalizedText>("description")? {
        if !description.english.is_empty() {
            existing.description.english = description.english;
        }
        if !description.hindi.is_empty() {
            existing.description.hindi = description.hindi;
        }
    }
    if let Some(price) = form.parsed::<f64>("price")? {
        if price < 0.0 {
            return Err(ApiError::validation("Price must be a non-negative number"));
        }
        existing.price = price;
    }
    if let Some(discount) = form.parsed::<f64>("discountPrice")? {
        existing.discount_price = Some(discount);
    }
    if let Some(stock) = form.parsed::<i64>("stock")? {
        existing.stock = stock;
    }
    if let Some(alert) = form.parsed::<i64>("lowStockAlert")? {
        existing.low_stock_alert = alert;
    }
    if let Some(raw) = form.text("category") {
        let category_id = parse_object_id(raw)?;
        require_category(&db, category_id).await?;
        existing.category = category_id;
    }
    if let Some(raw) = form.text("brand") {
        existing.brand = Some(parse_object_id(raw)?);
    }
    if let Some(tags) = form.json_field::<Vec<String>>("tags")? {
        existing.tags = tags;
    }
    if let Some(variants) = form.json_field::<Vec<VariantInput>>("variants")? {
        existing.variants = normalize_variants(variants);
    }
    if let Some(specs) = form.json_field::<Vec<Specification>>("specifications")? {
        existing.specifications = specs;
    }
    if let Some(title) = form.text("metaTitle") {
        existing.meta_title = Some(title.to_string());
    }
    if let Some(desc) = form.text("metaDescription") {
        existing.meta_description = Some(desc.to_string());
    }
    if let Some(keywords) = form.json_field::<Vec<String>>("keywords")? {
        existing.keywords = keywords;
    }

    // New images replace the old set; old assets are only deleted after
    // every new upload has succeeded.
    let image_files = form.files_for("images");
    if !image_files.is_empty() {
        if image_files.len() > MAX_IMAGES {
            return Err(ApiError::validation(format!(
                "A maximum of {} images is allowed",
                MAX_IMAGES
            )));
        }
        let uploaded = media::upload_all(store.get_ref(), &image_files, IMAGE_FOLDER).await?;
        let previous = std::mem::replace(&mut existing.images, uploaded);
        media::delete_all(store.get_ref(), &previous).await;
    }

    existing.updated_at = DateTime::now();
    existing.validate_invariants()?;

    collection(&db)
        .replace_one(doc! { "_id": existing.id }, &existing, None)
        .await?;

    info!("product updated: {:?}", existing.id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Product updated successfully",
        "product": existing,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl ProductListQuery {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        }
    }

    fn filter(&self) -> Result<Document, ApiError> {
        let mut filter = scoped(doc! {}, false);
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = regex::escape(search);
            filter.insert(
                "$or",
                vec![
                    doc! { "name.english": { "$regex": &pattern, "$options": "i" } },
                    doc! { "name.hindi": { "$regex": &pattern, "$options": "i" } },
                    doc! { "tags": { "$regex": &pattern, "$options": "i" } },
                ],
            );
        }
        if let Some(category) = &self.category {
            filter.insert("category", parse_object_id(category)?);
        }
        if let Some(brand) = &self.brand {
            filter.insert("brand", parse_object_id(brand)?);
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            let mut range = doc! {};
            if let Some(min) = self.min_price {
                range.insert("$gte", min);
            }
            if let Some(max) = self.max_price {
                range.insert("$lte", max);
            }
            filter.insert("price", range);
        }
        Ok(filter)
    }
}

async fn paged_products(
    db: &MongoConfig,
    filter: Document,
    pagination: &Pagination,
) -> Result<Page<Product>, ApiError> {
    let coll = collection(db);
    let total = coll.count_documents(filter.clone(), None).await?;
    let mut cursor = coll
        .find(filter, pagination.find_options("createdAt"))
        .await?;

    let mut items = Vec::new();
    while let Some(p) = cursor.try_next().await? {
        items.push(p);
    }

    Ok(Page::new(pagination, total, items))
}

pub async fn list_products(
    db: web::Data<MongoConfig>,
    query: web::Query<ProductListQuery>,
) -> Result<HttpResponse, ApiError> {
    debug!("listing products: {:?}", query);
    let page = paged_products(&db, query.filter()?, &query.pagination()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn products_by_category(
    db: web::Data<MongoConfig>,
    category_id: web::Path<String>,
    query: web::Query<ProductListQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut filter = query.filter()?;
    filter.insert("category", parse_object_id(&category_id)?);
    let page = paged_products(&db, filter, &query.pagination()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn products_by_brand(
    db: web::Data<MongoConfig>,
    brand_id: web::Path<String>,
    query: web::Query<ProductListQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut filter = query.filter()?;
    filter.insert("brand", parse_object_id(&brand_id)?);
    let page = paged_products(&db, filter, &query.pagination()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_product(
    db: web::Data<MongoConfig>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let found = find_product(&db, &id, false).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "product": found,
    })))
}

/// Admin stock/rating snapshot, recounted live from the approved review
/// set rather than the stored aggregates.
pub async fn product_summary(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_product(&db, &id, false).await?;
    let product_id = found.id.ok_or_else(|| ApiError::internal("Product without id"))?;

    let reviews: Collection<Review> = db.database.collection(review::COLLECTION);
    let mut ratings = Vec::new();
    let mut cursor = reviews.find(counted_reviews(product_id, None), None).await?;
    while let Some(r) = cursor.try_next().await? {
        ratings.push(r.rating);
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "productId": product_id,
        "name": found.name,
        "stock": found.stock,
        "lowStockAlert": found.low_stock_alert,
        "totalReviews": ratings.len(),
        "averageRating": average_rating(&ratings),
        "category": found.category,
        "brand": found.brand,
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub stock: i64,
}

pub async fn update_stock(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
    body: web::Json<UpdateStockRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    if body.stock < 0 {
        return Err(ApiError::validation("Stock must be a non-negative number"));
    }

    let mut found = find_product(&db, &id, false).await?;
    reconcile_variant_stock(body.stock, &mut found.variants);
    found.stock = body.stock;
    found.updated_at = DateTime::now();
    found.validate_invariants()?;

    collection(&db)
        .replace_one(doc! { "_id": found.id }, &found, None)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Product stock updated successfully",
        "stock": found.stock,
        "variants": found.variants,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePriceRequest {
    pub price: f64,
    pub discount_price: Option<f64>,
}

pub async fn update_price(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
    body: web::Json<UpdatePriceRequest>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    if body.price < 0.0 {
        return Err(ApiError::validation("Price must be a non-negative number"));
    }
    if let Some(discount) = body.discount_price {
        if discount < 0.0 {
            return Err(ApiError::validation(
                "Discount price must be a non-negative number",
            ));
        }
        if discount > body.price {
            return Err(ApiError::validation(
                "Discount price cannot be greater than price",
            ));
        }
    }

    let mut found = find_product(&db, &id, false).await?;
    found.price = body.price;
    if body.discount_price.is_some() {
        found.discount_price = body.discount_price;
    }
    found.updated_at = DateTime::now();
    found.validate_invariants()?;

    collection(&db)
        .replace_one(doc! { "_id": found.id }, &found, None)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Product price updated successfully",
        "price": found.price,
        "discountPrice": found.discount_price,
    })))
}

pub async fn toggle_active(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_product(&db, &id, false).await?;
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
        "message": format!("Product isActive set to {}", next),
    })))
}

pub async fn toggle_featured(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_product(&db, &id, false).await?;
    let next = !found.is_featured;
    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! { "$set": { "isFeatured": next, "updatedAt": DateTime::now() } },
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Product isFeatured set to {}", next),
    })))
}

pub async fn soft_delete_product(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_product(&db, &id, true).await?;
    if found.is_deleted {
        return Err(ApiError::validation("Product already deleted"));
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
        "message": "Product soft deleted successfully",
    })))
}

pub async fn hard_delete_product(
    db: web::Data<MongoConfig>,
    store: web::Data<dyn MediaStore>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = find_product(&db, &id, true).await?;
    media::delete_all(store.get_ref(), &found.images).await;

    collection(&db)
        .delete_one(doc! { "_id": found.id }, None)
        .await?;

    info!("product hard deleted: {:?}", found.id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Product permanently deleted",
    })))
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub limit: Option<i64>,
}

pub async fn trending_products(
    db: web::Data<MongoConfig>,
    query: web::Query<TrendingQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let options = FindOptions::builder()
        .sort(doc! { "soldCount": -1, "viewsCount": -1 })
        .limit(limit)
        .build();

    let mut cursor = collection(&db)
        .find(scoped(doc! { "isActive": true }, false), options)
        .await?;
    let mut items = Vec::new();
    while let Some(p) = cursor.try_next().await? {
        items.push(p);
    }

    if items.is_empty() {
        return Err(ApiError::not_found("No trending products found"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "total": items.len(),
        "products": items,
    })))
}

pub async fn low_stock_products(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    query: web::Query<ProductListQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let mut filter = scoped(doc! { "isActive": true }, false);
    filter.insert("$expr", doc! { "$lt": ["$stock", "$lowStockAlert"] });

    let page = paged_products(&db, filter, &query.pagination()).await?;
    Ok(HttpResponse::Ok().json(page))
}
