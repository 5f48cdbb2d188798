pub mod audit;
pub mod brand;
pub mod cart;
pub mod category;
pub mod counter;
pub mod product;
pub mod product_description;
pub mod review;
pub mod user;
pub mod wishlist;

use serde::{Deserialize, Serialize};

/// Bilingual text, stored and served under both language keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocalizedText {
    #[serde(default)]
    pub english: String,
    #[serde(default)]
    pub hindi: String,
}

/// A handle onto the remote image store: the durable URL plus the opaque
/// identifier needed to delete the asset later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    pub url: String,
    pub media_id: String,
}

pub(crate) fn default_true() -> bool {
    true
}
