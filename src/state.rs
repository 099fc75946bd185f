use crate::extraction::Extractor;
use crate::rate_limit::AdmissionController;
use std::sync::Arc;
use std::time::Duration;

// app's shared state
pub struct AppState {
    pub extractor: Arc<dyn Extractor>,
    pub admission: AdmissionController,
    pub rate_limit: u32,                      // max batches allowed per window
    pub rate_window: Duration,                // Duration of rate limit
    pub extraction_timeout: Option<Duration>, // per image, None waits forever
}

impl AppState {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        rate_limit: u32,
        rate_window: Duration,
        extraction_timeout: Option<Duration>,
    ) -> Self {
        Self {
            extractor,
            admission: AdmissionController::new(),
            rate_limit,
            rate_window,
            extraction_timeout,
        }
    }
}
