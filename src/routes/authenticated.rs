use crate::{
    AppState, handlers,
    models::{Article, Banner, Committee, Contact, Content, Gallery, News, Resource, Video},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use super::{collection_path, item_path};

/// Authenticated Router Module
///
/// Every route here relies on the `require_session` route layer applied in
/// `create_router`; handlers never check the session themselves.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /api/session
        // Who is signed in and when the session expires.
        .route("/api/session", get(handlers::session_info))
        // POST /api/upload
        // Multipart image upload forwarded to object storage, recorded as a gallery item.
        .route(
            "/api/upload",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(handlers::UPLOAD_LIMIT_BYTES)),
        )
        // POST /api/{collection}, PUT/DELETE /api/{collection}/{id}
        .merge(writable::<Article>())
        .merge(writable::<Banner>())
        .merge(writable::<Committee>())
        .merge(writable::<Content>())
        .merge(writable::<News>())
        .merge(writable::<Video>())
        .merge(writable::<Gallery>())
        // --- Contact Inbox ---
        // Messages are read and deleted by the admin, never edited.
        .route(&collection_path::<Contact>(), get(handlers::list_documents::<Contact>))
        .route(
            &item_path::<Contact>(),
            get(handlers::get_document::<Contact>).delete(handlers::delete_document::<Contact>),
        )
}

fn writable<R: Resource>() -> Router<AppState> {
    Router::new()
        .route(&collection_path::<R>(), post(handlers::create_document::<R>))
        .route(
            &item_path::<R>(),
            put(handlers::update_document::<R>).delete(handlers::delete_document::<R>),
        )
}
