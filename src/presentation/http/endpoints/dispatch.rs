use std::sync::Arc;

use poem_openapi::{OpenApi, payload::Json};

use crate::presentation::http::{
    endpoints::root::{ApiState, EndpointsTags},
    responses::DispatchRunResponseDto,
};

#[derive(Clone)]
pub struct DispatchEndpoints {
    state: Arc<ApiState>,
}

impl DispatchEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl DispatchEndpoints {
    /// Runs one dispatch pass over the outbound queue. Failures are reported
    /// in the body rather than via HTTP status, as the external scheduler
    /// only inspects the JSON summary.
    #[oai(path = "/dispatch/run", method = "post", tag = EndpointsTags::Dispatch)]
    pub async fn run(&self) -> Json<DispatchRunResponseDto> {
        let cancel = self.state.shutdown.child_token();
        match self.state.dispatcher.run_once(cancel).await {
            Ok(summary) => Json(DispatchRunResponseDto::ok(summary)),
            Err(err) => {
                tracing::error!(error = %err, "dispatch run failed");
                Json(DispatchRunResponseDto::err(err.to_string()))
            }
        }
    }
}
