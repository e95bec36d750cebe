use std::sync::Arc;

use poem_openapi::{OpenApi, payload::Json};

use crate::presentation::http::{
    endpoints::root::{ApiState, EndpointsTags},
    responses::FollowupRunResponseDto,
};

#[derive(Clone)]
pub struct FollowupEndpoints {
    state: Arc<ApiState>,
}

impl FollowupEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl FollowupEndpoints {
    /// Runs one follow-up sweep over unanswered broadcast conversations.
    #[oai(path = "/followups/run", method = "post", tag = EndpointsTags::Followups)]
    pub async fn run(&self) -> Json<FollowupRunResponseDto> {
        let cancel = self.state.shutdown.child_token();
        match self.state.followup_scheduler.run_once(cancel).await {
            Ok(summary) => Json(FollowupRunResponseDto::ok(summary)),
            Err(err) => {
                tracing::error!(error = %err, "follow-up run failed");
                Json(FollowupRunResponseDto::err(err.to_string()))
            }
        }
    }
}
