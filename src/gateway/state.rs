use std::sync::Arc;

use crate::pipeline::MarketingPipeline;

#[derive(Clone)]
pub struct HandlerState {
    pub pipeline: Arc<MarketingPipeline>,
}

impl HandlerState {
    pub fn new(pipeline: Arc<MarketingPipeline>) -> Self {
        Self { pipeline }
    }
}
