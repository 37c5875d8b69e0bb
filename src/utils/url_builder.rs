/// Join a path onto the public base URL. An empty base keeps paths relative,
/// which is what the server renders when `PUBLIC_BASE_URL` is unset.
pub fn absolute_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return if base.is_empty() { "/".into() } else { base.to_string() };
    }
    format!("{}/{}", base, path)
}
