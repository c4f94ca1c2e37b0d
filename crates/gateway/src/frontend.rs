//! The chat page, compiled into the binary so `haru serve` needs no asset
//! directory.

use axum::{
    Router,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};

struct Asset {
    route: &'static str,
    content_type: &'static str,
    body: &'static str,
}

static ASSETS: [Asset; 3] = [
    Asset {
        route: "/",
        content_type: "text/html; charset=utf-8",
        body: include_str!("../../../frontend/index.html"),
    },
    Asset {
        route: "/static/style.css",
        content_type: "text/css; charset=utf-8",
        body: include_str!("../../../frontend/style.css"),
    },
    Asset {
        route: "/static/app.js",
        content_type: "application/javascript; charset=utf-8",
        body: include_str!("../../../frontend/app.js"),
    },
];

/// Routes for the page and its static files.
pub fn frontend_router() -> Router {
    ASSETS.iter().fold(Router::new(), |router, asset| {
        router.route(asset.route, get(move || async move { serve(asset) }))
    })
}

fn serve(asset: &Asset) -> Response {
    (
        [
            (header::CONTENT_TYPE, asset.content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        asset.body,
    )
        .into_response()
}
