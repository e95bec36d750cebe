pub mod dispatch;
pub mod followups;
pub mod health;
pub mod root;
pub mod validation;
