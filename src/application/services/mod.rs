pub mod business_hours;
pub mod gateway;
pub mod instance_pool;
pub mod message_mutator;
pub mod pacing;
