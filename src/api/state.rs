use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::pipeline::render::PageRenderer;

/// Everything a request handler needs, injected through `web::Data`.
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<ServiceConfig>,
    pub renderer: Arc<dyn PageRenderer>,
}

impl ApiState {
    pub fn new(config: ServiceConfig, renderer: Arc<dyn PageRenderer>) -> Self {
        ApiState {
            config: Arc::new(config),
            renderer,
        }
    }
}

impl std::fmt::Debug for ApiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiState")
            .field("config", &self.config)
            .field("renderer", &"<dyn PageRenderer>")
            .finish()
    }
}
