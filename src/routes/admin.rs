use crate::AppState;
use axum::Router;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

use crate::auth::{ADMIN_LOGIN_PATH, ADMIN_PREFIX};

/// Admin Router Module
///
/// Serves the static admin UI from `admin_dir`. The login page is `login.html`; everything
/// else under `/admin` maps onto the directory (with `index.html` for directories).
///
/// Access Control:
/// These pages are only reached after `admin_page_filter` has let the request through.
/// The data they load comes from the session-guarded API routes.
pub fn admin_routes(admin_dir: &str) -> Router<AppState> {
    let login_page = Path::new(admin_dir).join("login.html");

    Router::new()
        .route_service(ADMIN_LOGIN_PATH, ServeFile::new(login_page))
        .nest_service(
            ADMIN_PREFIX,
            ServeDir::new(admin_dir).append_index_html_on_directories(true),
        )
}
