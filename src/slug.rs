use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;
use regex::Regex;

use crate::error::ApiError;

/// Lowercase, ASCII-only slug: non-alphanumeric runs collapse to a single
/// hyphen, leading/trailing hyphens stripped.
pub fn slugify(input: &str) -> String {
    let re = Regex::new(r"[^a-z0-9]+").unwrap();
    let lowered = input.to_lowercase();
    re.replace_all(&lowered, "-").trim_matches('-').to_string()
}

/// Probes the collection for slug collisions and disambiguates with a
/// numeric suffix (`base`, `base-1`, `base-2`, ...). `exclude` skips the
/// document being updated so it does not collide with itself.
pub async fn unique_slug(
    db: &Database,
    collection: &str,
    base: &str,
    exclude: Option<&ObjectId>,
) -> Result<String, ApiError> {
    let coll = db.collection::<Document>(collection);
    let mut candidate = base.to_string();
    let mut suffix = 1;

    loop {
        let mut filter = doc! { "slug": &candidate };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id });
        }
        if coll.count_documents(filter, None).await? == 0 {
            return Ok(candidate);
        }
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Brass Diya (Large)"), "brass-diya-large");
        assert_eq!(slugify("  Agarbatti -- Sandalwood  "), "agarbatti-sandalwood");
        assert_eq!(slugify("Om"), "om");
    }

    #[test]
    fn slugify_drops_non_ascii() {
        // Devanagari names slug to whatever ASCII remains.
        assert_eq!(slugify("पूजा थाली Set"), "set");
    }
}
