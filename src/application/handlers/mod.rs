pub mod dispatcher;
pub mod followup_scheduler;
pub mod phone_validator;
