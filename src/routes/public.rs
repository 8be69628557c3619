use crate::{
    AppState, handlers,
    models::{Article, Banner, Committee, Contact, Content, Gallery, News, Resource, Video},
};
use axum::{
    Router,
    routing::{get, post},
};

use super::{collection_path, item_path};

/// Public Router Module
///
/// Endpoints reachable without a session. Content is read-only here; the one public
/// write is the contact form.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // POST /api/login
        // Verifies the admin credential pair and sets the `token` cookie.
        .route("/api/login", post(handlers::login))
        // POST /api/logout
        // Clears the `token` cookie. Tokens already copied elsewhere stay valid until expiry.
        .route("/api/logout", post(handlers::logout))
        // GET /api/{collection} and GET /api/{collection}/{id} for the site's content.
        .merge(readable::<Article>())
        .merge(readable::<Banner>())
        .merge(readable::<Committee>())
        .merge(readable::<Content>())
        .merge(readable::<News>())
        .merge(readable::<Video>())
        .merge(readable::<Gallery>())
        // POST /api/contacts
        // Visitors submit the contact form; reading the inbox requires a session.
        .route(&collection_path::<Contact>(), post(handlers::create_document::<Contact>))
}

fn readable<R: Resource>() -> Router<AppState> {
    Router::new()
        .route(&collection_path::<R>(), get(handlers::list_documents::<R>))
        .route(&item_path::<R>(), get(handlers::get_document::<R>))
}
