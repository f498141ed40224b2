//! Catalog API client module

pub mod client;
pub mod models;
pub mod resolve;

pub use client::{AppCredentials, CatalogClient};
pub use resolve::{ItemKind, canonical_url, parse_item_url};
