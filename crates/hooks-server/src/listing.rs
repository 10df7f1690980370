//! Listing enrichment for the shop collection.

use hooks_core::Record;

pub const SHOP_COLLECTION: &str = "Shop";

const IMAGE_FIELDS: [&str; 4] = ["image1", "image2", "image3", "image4"];

/// Replace stored file names with absolute download URLs.
///
/// Empty fields and values that are already URLs are left alone.
pub fn expand_image_urls(record: &mut Record, base_url: &str) {
    let base_url = base_url.trim_end_matches('/');

    for field in IMAGE_FIELDS {
        let file = record.get_string(field);
        if file.is_empty() || file.starts_with("http://") || file.starts_with("https://") {
            continue;
        }

        let url = format!("{base_url}/api/files/{}/{}/{file}", record.collection, record.id);
        record.set(field, url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_filled_fields_only() {
        let mut record = Record::new(SHOP_COLLECTION)
            .with_id("p1")
            .with_field("image1", "cake.png")
            .with_field("image2", "")
            .with_field("image3", "https://cdn.test/x.png");

        expand_image_urls(&mut record, "https://api.shop.test/");

        assert_eq!(
            record.get_string("image1"),
            "https://api.shop.test/api/files/Shop/p1/cake.png"
        );
        assert_eq!(record.get_string("image2"), "");
        assert_eq!(record.get_string("image3"), "https://cdn.test/x.png");
        assert!(record.get("image4").is_none());
    }
}
