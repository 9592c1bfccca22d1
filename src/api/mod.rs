pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::configure_routes;
pub use state::ApiState;

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;

/// Create the temporary directories and bind the HTTP server.
///
/// The returned [`Server`] is not yet running; await it to serve.
pub async fn build_server(state: ApiState) -> std::io::Result<Server> {
    tokio::fs::create_dir_all(&state.config.upload_dir).await?;
    tokio::fs::create_dir_all(&state.config.output_dir).await?;

    let host = state.config.host.clone();
    let port = state.config.port;
    let state = web::Data::new(state);

    tracing::info!("Starting server on http://{}:{}", host, port);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .configure(configure_routes(state.clone()))
    })
    .bind((host.as_str(), port))?
    .run();

    Ok(server)
}
