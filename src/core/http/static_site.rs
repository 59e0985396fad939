//! Static file server with single-page-app fallback.
//!
//! Files under the root are served as-is. A request that matches no file
//! and has no `.` in its path is treated as a client-side route and gets the
//! root `index.html`; a missing asset (path with a `.`) stays a 404.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::error;

struct SiteState {
    dir: ServeDir,
    index: PathBuf,
}

pub fn router(root: &Path) -> Router {
    let state = Arc::new(SiteState {
        dir: ServeDir::new(root),
        index: root.join("index.html"),
    });

    Router::new()
        .fallback(serve_site)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Paths without a dot look like client-side routes rather than assets.
pub fn is_route_like(path: &str) -> bool {
    !path.contains('.')
}

async fn serve_site(State(site): State<Arc<SiteState>>, req: Request) -> Response {
    let retry = if is_route_like(req.uri().path()) {
        Some(request_head(&req))
    } else {
        None
    };

    let response = match site.dir.clone().oneshot(req).await {
        Ok(res) => res.into_response(),
        Err(err) => {
            error!(error = %err, "static file lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match retry {
        Some(head) if response.status() == StatusCode::NOT_FOUND => {
            match ServeFile::new(&site.index).oneshot(head).await {
                Ok(res) => res.into_response(),
                Err(err) => {
                    error!(error = %err, "index fallback failed");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        _ => response,
    }
}

/// Copy of the request line and headers; GET and HEAD carry no body.
fn request_head(req: &Request) -> Request {
    let mut head = Request::new(Body::empty());
    *head.method_mut() = req.method().clone();
    *head.uri_mut() = req.uri().clone();
    *head.headers_mut() = req.headers().clone();
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{self, header};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn site() -> TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("game/TetrisGame")).unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.path().join("app.css"), "body{}").unwrap();
        fs::write(dir.path().join("game/TetrisGame/index.html"), "<canvas>").unwrap();
        dir
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let res = app
            .oneshot(http::Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    #[test]
    fn route_detection_uses_dot() {
        assert!(is_route_like("/about"));
        assert!(is_route_like("/projects/tetris"));
        assert!(!is_route_like("/missing.png"));
        assert!(!is_route_like("/assets/app.js"));
    }

    #[tokio::test]
    async fn serves_existing_files() {
        let dir = site();
        let (status, body) = get(router(dir.path()), "/app.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body{}");
    }

    #[tokio::test]
    async fn serves_nested_game_index() {
        let dir = site();
        let (status, body) = get(router(dir.path()), "/game/TetrisGame/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<canvas>");
    }

    #[tokio::test]
    async fn unknown_route_falls_back_to_index() {
        let dir = site();
        let (status, body) = get(router(dir.path()), "/about").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>home</h1>");
    }

    #[tokio::test]
    async fn missing_asset_is_not_found() {
        let dir = site();
        let (status, _) = get(router(dir.path()), "/missing.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn fallback_is_served_as_html() {
        let dir = site();
        let res = router(dir.path())
            .oneshot(http::Request::get("/contact").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let content_type = res.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/html"));
    }
}
