use actix_files::Files;
use actix_web::{web, HttpResponse};

use super::handlers;
use super::state::ApiState;

/// Register the service's routes.
///
/// `POST /convert` and `GET /health` are matched first; every other path
/// falls through to the public asset directory when it exists.
pub fn configure_routes(state: web::Data<ApiState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let public_dir = state.config.public_dir.clone();

        cfg.app_data(state)
            .route("/convert", web::post().to(handlers::convert))
            .route("/health", web::get().to(health_check));

        if public_dir.is_dir() {
            cfg.service(Files::new("/", public_dir).index_file("index.html"));
        } else {
            tracing::debug!(
                "Public directory {} not found; static files disabled",
                public_dir.display()
            );
        }
    }
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}
