use askama::Template;

use crate::models::SummaryRow;

#[derive(Template)]
#[template(path = "result.html")]
pub struct ResultTemplate {
    pub api_hostname: String,
    pub base_url: String,
    pub notices: Vec<String>,
    pub has_notices: bool,
    pub flow_title: String,
    pub resource_id: String,
    pub resource_href: String,
    pub summary: Vec<SummaryRow>,
}
