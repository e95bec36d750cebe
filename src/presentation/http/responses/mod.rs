use poem_openapi::Object;

use crate::application::handlers::{
    dispatcher::DispatchSummary, followup_scheduler::FollowupSummary,
};
use crate::domain::models::ValidationSummary;

#[derive(Object)]
pub struct DispatchRunResponseDto {
    pub success: bool,
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    pub error: Option<String>,
}

impl DispatchRunResponseDto {
    pub fn ok(summary: DispatchSummary) -> Self {
        Self {
            success: true,
            sent: summary.sent,
            failed: summary.failed,
            skipped: summary.skipped,
            error: None,
        }
    }

    pub fn err(error: String) -> Self {
        Self {
            success: false,
            sent: 0,
            failed: 0,
            skipped: 0,
            error: Some(error),
        }
    }
}

#[derive(Object)]
pub struct FollowupRunResponseDto {
    pub success: bool,
    pub processed: u64,
    pub sent: u64,
    pub skipped: u64,
    pub error: Option<String>,
}

impl FollowupRunResponseDto {
    pub fn ok(summary: FollowupSummary) -> Self {
        Self {
            success: true,
            processed: summary.processed,
            sent: summary.sent,
            skipped: summary.skipped,
            error: None,
        }
    }

    pub fn err(error: String) -> Self {
        Self {
            success: false,
            processed: 0,
            sent: 0,
            skipped: 0,
            error: Some(error),
        }
    }
}

#[derive(Object)]
pub struct ValidationRunResponseDto {
    pub success: bool,
    pub checked: u64,
    pub valid: u64,
    pub invalid: u64,
    pub landline: u64,
    pub error: Option<String>,
}

impl ValidationRunResponseDto {
    pub fn ok(summary: ValidationSummary) -> Self {
        Self {
            success: true,
            checked: summary.total,
            valid: summary.valid,
            invalid: summary.invalid,
            landline: summary.landline,
            error: None,
        }
    }

    pub fn err(error: String) -> Self {
        Self {
            success: false,
            checked: 0,
            valid: 0,
            invalid: 0,
            landline: 0,
            error: Some(error),
        }
    }
}
