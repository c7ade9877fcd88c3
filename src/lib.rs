//! # Catalog (Product Catalog Backend)
//!
//! `catalog` serves CRUD endpoints over a four-level entity hierarchy:
//! `Category → SubCategory → Brand → Product`. Every entity carries one or
//! more images held in an external object store.
//!
//! ## Identity
//!
//! - **Slugs:** derived from display names (lowercase, separators collapsed to `_`).
//!   Slugs are a lookup convenience and are regenerated on rename; they are not unique.
//! - **Short IDs:** short random tokens assigned once at creation. They are the only
//!   stable component of an asset path, so image replacement anchors on them.
//!
//! ## Asset Paths
//!
//! Asset folders mirror the hierarchy:
//! `{root}/Categories/{c}/SubCategories/{s}/Brands/{b}/Products/{p}`.
//! Deleting a folder prefix removes every asset beneath it, which is how a cascade
//! delete cleans a whole subtree with one call.
//!
//! ## Cascade Delete
//!
//! Deleting a parent removes its own row, then its asset folder (best-effort), then
//! the dependent rows the protocol covers. Products are never removed by a parent
//! delete; the dangling references are reported as integrity gaps instead.
//!
//! ## Pricing
//!
//! `applied_price` is always derived from `price` and `discount` and clamped at zero.

pub mod api;
pub mod catalog;
pub mod cli;
pub mod objects;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
