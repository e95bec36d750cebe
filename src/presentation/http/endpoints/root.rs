use std::sync::Arc;

use poem_openapi::Tags;
use tokio_util::sync::CancellationToken;

use crate::application::handlers::{
    dispatcher::Dispatcher, followup_scheduler::FollowupScheduler, phone_validator::PhoneValidator,
};

#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Arc<Dispatcher>,
    pub followup_scheduler: Arc<FollowupScheduler>,
    pub phone_validator: Arc<PhoneValidator>,
    /// Root token for the whole process; each run gets a child so an
    /// operator abort never tears down the server itself.
    pub shutdown: CancellationToken,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Dispatch,
    Followups,
    Validation,
}

pub struct Endpoints;
