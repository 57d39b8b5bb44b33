use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::form::FormType;

/// Wizard progress saved while the client fills the form
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Draft {
    pub draft_id: String,
    pub form_type: FormType,
    pub current_step: usize,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SaveDraftRequest {
    pub form_type: FormType,
    #[serde(default = "first_step")]
    pub current_step: usize,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

fn first_step() -> usize {
    1
}
