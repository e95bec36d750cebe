use std::sync::Arc;

use poem_openapi::{OpenApi, payload::Json};

use crate::presentation::http::{
    endpoints::root::{ApiState, EndpointsTags},
    requests::ValidatePhonesRequestDto,
    responses::ValidationRunResponseDto,
};

#[derive(Clone)]
pub struct ValidationEndpoints {
    state: Arc<ApiState>,
}

impl ValidationEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl ValidationEndpoints {
    /// Validates a batch of raw phone numbers ahead of a broadcast,
    /// optionally writing the summary back onto the owning list.
    #[oai(path = "/validation/run", method = "post", tag = EndpointsTags::Validation)]
    pub async fn run(&self, request: Json<ValidatePhonesRequestDto>) -> Json<ValidationRunResponseDto> {
        let ValidatePhonesRequestDto {
            phones,
            broadcast_list_id,
        } = request.0;
        match self.state.phone_validator.run(phones, broadcast_list_id).await {
            Ok((_, summary)) => Json(ValidationRunResponseDto::ok(summary)),
            Err(err) => {
                tracing::error!(error = %err, "phone validation run failed");
                Json(ValidationRunResponseDto::err(err.to_string()))
            }
        }
    }
}
