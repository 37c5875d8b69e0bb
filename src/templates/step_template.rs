use askama::Template;

use crate::models::{FieldView, StepNavView, SummaryRow};

#[derive(Template)]
#[template(path = "step.html")]
pub struct StepTemplate {
    pub api_hostname: String,
    pub base_url: String,
    pub notices: Vec<String>,
    pub has_notices: bool,
    pub session_id: String,
    pub flow_title: String,
    pub step_id: String,
    pub step_title: String,
    pub steps: Vec<StepNavView>,
    pub fields: Vec<FieldView>,
    /// Shown on the last step only.
    pub summary: Vec<SummaryRow>,
    pub is_first: bool,
    pub is_last: bool,
    pub can_advance: bool,
    pub submitting: bool,
    pub submission_error: String,
    pub has_submission_error: bool,
}
