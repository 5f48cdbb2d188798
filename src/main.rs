mod aggregate;
mod audit;
mod auth;
mod config;
mod error;
mod handlers;
mod media;
mod models;
mod repo;
mod slug;
mod upload;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use crate::config::{MongoConfig, Settings};
use crate::handlers::{brand, category, counter, product, product_description, review, user};
use crate::media::{MediaStore, MemoryMediaStore, RemoteMediaStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("pooja_path_api=debug".parse().unwrap()),
        )
        .init();

    let settings = Settings::from_env();
    info!("starting server on {}", settings.bind_addr);

    let mongo_config = MongoConfig::init(&settings)
        .await
        .expect("Failed to initialize MongoDB");
    info!("MongoDB connection established: {}", settings.database_name);

    let store: Arc<dyn MediaStore> = match &settings.media_base_url {
        Some(base_url) => {
            info!("using remote media store at {}", base_url);
            Arc::new(RemoteMediaStore::new(
                base_url.clone(),
                settings.media_api_key.clone(),
                settings.media_upload_preset.clone(),
            ))
        }
        None => {
            info!("MEDIA_BASE_URL not set, using in-memory media store");
            Arc::new(MemoryMediaStore::new())
        }
    };

    let bind_addr = settings.bind_addr.clone();
    let settings_data = web::Data::new(settings);
    let db_data = web::Data::new(mongo_config);
    let store_data: web::Data<dyn MediaStore> = web::Data::from(store);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin_fn(|_, _| true)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .app_data(settings_data.clone())
            .app_data(db_data.clone())
            .app_data(store_data.clone())
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(user::register))
                            .route("/login", web::post().to(user::login))
                            .route("/refresh-token", web::post().to(user::refresh_token))
                            .route("/forgot-password", web::post().to(user::forgot_password))
                            .route("/reset-password", web::post().to(user::reset_password))
                            .route("/logout", web::post().to(user::logout)),
                    )
                    .service(
                        web::scope("/me")
                            .route("", web::get().to(user::get_profile))
                            .route("", web::put().to(user::update_profile))
                            .route("/password", web::put().to(user::change_password))
                            .route("/reviews", web::get().to(review::my_reviews)),
                    )
                    .service(
                        web::scope("/users")
                            .route("", web::get().to(user::list_users))
                            .route("/audit-logs", web::get().to(user::list_audit_logs))
                            .route("/{id}", web::get().to(user::get_user))
                            .route("/{id}/block", web::patch().to(user::block_user))
                            .route("/{id}/unblock", web::patch().to(user::unblock_user))
                            .route("/{id}/role", web::patch().to(user::update_role))
                            .route("/{id}", web::delete().to(user::soft_delete_user)),
                    )
                    .service(
                        web::scope("/products")
                            .route("", web::post().to(product::create_product))
                            .route("", web::get().to(product::list_products))
                            .route("/trending", web::get().to(product::trending_products))
                            .route("/low-stock", web::get().to(product::low_stock_products))
                            .route(
                                "/category/{categoryId}",
                                web::get().to(product::products_by_category),
                            )
                            .route("/brand/{brandId}", web::get().to(product::products_by_brand))
                            .route("/{id}", web::get().to(product::get_product))
                            .route("/{id}", web::put().to(product::update_product))
                            .route("/{id}/summary", web::get().to(product::product_summary))
                            .route("/{id}/stock", web::patch().to(product::update_stock))
                            .route("/{id}/price", web::patch().to(product::update_price))
                            .route("/{id}/toggle-active", web::patch().to(product::toggle_active))
                            .route(
                                "/{id}/toggle-featured",
                                web::patch().to(product::toggle_featured),
                            )
                            .route("/{id}", web::delete().to(product::soft_delete_product))
                            .route("/{id}/hard", web::delete().to(product::hard_delete_product)),
                    )
                    .service(
                        web::scope("/product-descriptions")
                            .route("", web::post().to(product_description::create_description))
                            .route("", web::get().to(product_description::list_descriptions))
                            .route(
                                "/{productId}",
                                web::get().to(product_description::get_description),
                            )
                            .route(
                                "/{productId}/toggle-active",
                                web::patch().to(product_description::toggle_active),
                            )
                            .route(
                                "/{productId}",
                                web::put().to(product_description::update_description),
                            )
                            .route(
                                "/{productId}",
                                web::delete().to(product_description::soft_delete_description),
                            )
                            .route(
                                "/{productId}/hard",
                                web::delete().to(product_description::hard_delete_description),
                            ),
                    )
                    .service(
                        web::scope("/categories")
                            .route("", web::post().to(category::create_category))
                            .route("", web::get().to(category::list_categories))
                            .route("/slug/{slug}", web::get().to(category::get_category_by_slug))
                            .route("/{id}", web::get().to(category::get_category))
                            .route("/{id}", web::put().to(category::update_category))
                            .route("/{id}/toggle-active", web::patch().to(category::toggle_active))
                            .route("/{id}", web::delete().to(category::soft_delete_category))
                            .route("/{id}/hard", web::delete().to(category::hard_delete_category)),
                    )
                    .service(
                        web::scope("/brands")
                            .route("", web::post().to(brand::create_brand))
                            .route("", web::get().to(brand::list_brands))
                            .route("/slug/{slug}", web::get().to(brand::get_brand_by_slug))
                            .route("/{id}", web::get().to(brand::get_brand))
                            .route("/{id}", web::put().to(brand::update_brand))
                            .route("/{id}/toggle-active", web::patch().to(brand::toggle_active))
                            .route("/{id}", web::delete().to(brand::soft_delete_brand))
                            .route("/{id}/hard", web::delete().to(brand::hard_delete_brand)),
                    )
                    .service(
                        web::scope("/counters")
                            .route("", web::post().to(counter::create_counter))
                            .route("", web::get().to(counter::list_counters))
                            .route("/{id}", web::get().to(counter::get_counter))
                            .route("/{id}", web::put().to(counter::update_counter))
                            .route("/{id}/categories", web::get().to(counter::counter_categories))
                            .route("/{id}/status", web::patch().to(counter::update_status))
                            .route("/{id}/toggle-active", web::patch().to(counter::toggle_active))
                            .route("/{id}/restore", web::patch().to(counter::restore_counter))
                            .route("/{id}", web::delete().to(counter::soft_delete_counter))
                            .route("/{id}/hard", web::delete().to(counter::hard_delete_counter)),
                    )
                    .service(
                        web::scope("/reviews")
                            .route("", web::post().to(review::create_review))
                            .route("", web::get().to(review::list_reviews))
                            .route("/unapproved", web::get().to(review::unapproved_reviews))
                            .route("/product/{productId}", web::get().to(review::product_reviews))
                            .route(
                                "/product/{productId}/summary",
                                web::get().to(review::product_review_summary),
                            )
                            .route("/{id}", web::get().to(review::get_review))
                            .route("/{id}", web::put().to(review::update_review))
                            .route("/{id}/approve", web::patch().to(review::toggle_approval))
                            .route(
                                "/{id}/verify-purchase",
                                web::patch().to(review::verify_purchase),
                            )
                            .route("/{id}/helpful", web::patch().to(review::toggle_helpful))
                            .route("/{id}", web::delete().to(review::soft_delete_review))
                            .route("/{id}/hard", web::delete().to(review::hard_delete_review)),
                    ),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
