//! API docs: the OpenAPI document and a Swagger UI page that renders it.

use crate::openapi::ApiDoc;
use crate::state::AppState;
use axum::{response::Html, routing::get, Json, Router};
use utoipa::OpenApi;

const SWAGGER_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Vaccine Booking API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js" crossorigin></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: "/api-docs/openapi.json", dom_id: "#swagger-ui" });
    };
  </script>
</body>
</html>
"##;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn swagger_ui() -> Html<&'static str> {
    Html(SWAGGER_PAGE)
}

/// GET /api-docs (UI) and GET /api-docs/openapi.json.
pub fn docs_routes() -> Router<AppState> {
    Router::new()
        .route("/api-docs", get(swagger_ui))
        .route("/api-docs/openapi.json", get(openapi_json))
}
