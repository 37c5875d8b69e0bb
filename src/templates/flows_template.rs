use askama::Template;

use crate::models::FlowView;

#[derive(Template)]
#[template(path = "flows.html")]
pub struct FlowsTemplate {
    pub api_hostname: String,
    pub base_url: String,
    pub notices: Vec<String>,
    pub has_notices: bool,
    pub flows: Vec<FlowView>,
}
