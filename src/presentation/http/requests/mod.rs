use poem_openapi::Object;
use uuid::Uuid;

#[derive(Object)]
pub struct ValidatePhonesRequestDto {
    pub phones: Vec<String>,
    pub broadcast_list_id: Option<Uuid>,
}
