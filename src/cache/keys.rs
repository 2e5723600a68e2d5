//! Cache key layout.
//!
//! Keys are `{namespace}:{entity}:{kind}:{detail}`. The namespace is added by
//! the [`Cache`](super::Cache) facade; the builders here produce the rest.
//! Every product key starts with [`PRODUCTS_PREFIX`] and every blog key with
//! [`BLOG_PREFIX`], so one `clear_prefix` call invalidates a whole entity.

use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::application::repos::{BlogQueryFilter, ProductQueryFilter};

pub const PRODUCTS_PREFIX: &str = "products:";
pub const BLOG_PREFIX: &str = "blog:";

pub fn product_list(filter: &ProductQueryFilter) -> String {
    format!("{PRODUCTS_PREFIX}list:{}", digest(&filter.normalized()))
}

pub fn product_by_id(id: Uuid) -> String {
    format!("{PRODUCTS_PREFIX}id:{id}")
}

pub fn blog_list(filter: &BlogQueryFilter) -> String {
    format!("{BLOG_PREFIX}list:{}", digest(&filter.normalized()))
}

pub fn blog_by_slug(slug: &str) -> String {
    format!("{BLOG_PREFIX}slug:{slug}")
}

fn digest<T: Serialize>(value: &T) -> String {
    // Serializing plain structs of strings/bools cannot fail.
    let encoded = serde_json::to_vec(value).unwrap_or_default();
    let hash = Sha256::digest(&encoded);
    hex::encode(&hash[..8])
}
