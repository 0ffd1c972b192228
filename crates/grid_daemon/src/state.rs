use std::sync::Arc;

use grid_control::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Year used when a request names none.
    pub fn year_or_default(&self, year: Option<String>) -> String {
        year.unwrap_or_else(|| self.pipeline.default_year().to_string())
    }
}
