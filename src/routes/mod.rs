/// Router Module Index
///
/// Splits the routing table by access level. Authentication is attached per module with
/// layers, never repeated inside handlers.

/// Routes open to any visitor: health, sign-in/out, content reads, the contact form.
pub mod public;

/// Routes behind the `require_session` layer: every content write, uploads, contact inbox.
pub mod authenticated;

/// The admin UI pages, gated in front of the router by `admin_page_filter`.
pub mod admin;

use crate::models::Resource;

/// `/api/{collection}`
pub fn collection_path<R: Resource>() -> String {
    format!("/api/{}", R::COLLECTION)
}

/// `/api/{collection}/{id}`
pub fn item_path<R: Resource>() -> String {
    format!("/api/{}/{{id}}", R::COLLECTION)
}
