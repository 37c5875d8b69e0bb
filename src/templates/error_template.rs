use askama::Template;

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub api_hostname: String,
    pub base_url: String,
    pub notices: Vec<String>,
    pub has_notices: bool,
    pub status_code: u16,
    pub message: String,
}
