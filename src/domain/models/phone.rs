use serde::{Deserialize, Serialize};

/// Outcome of checking a single raw phone number, either via the landline
/// heuristic (no gateway call) or the gateway's existence endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneValidationResult {
    pub phone: String,
    pub exists: bool,
    pub formatted_number: Option<String>,
    pub is_landline_heuristic: bool,
    pub error: Option<String>,
}

impl PhoneValidationResult {
    pub fn landline(phone: String) -> Self {
        Self {
            phone,
            exists: false,
            formatted_number: None,
            is_landline_heuristic: true,
            error: None,
        }
    }

    pub fn invalid(phone: String, error: String) -> Self {
        Self {
            phone,
            exists: false,
            formatted_number: None,
            is_landline_heuristic: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total: u64,
    pub valid: u64,
    pub invalid: u64,
    pub landline: u64,
}

impl ValidationSummary {
    pub fn from_results(results: &[PhoneValidationResult]) -> Self {
        let mut summary = Self {
            total: results.len() as u64,
            ..Self::default()
        };
        for result in results {
            if result.exists {
                summary.valid += 1;
            } else {
                summary.invalid += 1;
            }
            if result.is_landline_heuristic {
                summary.landline += 1;
            }
        }
        summary
    }
}
