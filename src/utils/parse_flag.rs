/// Parse a checkbox or CLI flag value. Empty input falls back to `default`.
pub fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value {
        Some(v) => {
            let t = v.trim().to_lowercase();
            if t.is_empty() {
                default
            } else {
                matches!(t.as_str(), "1" | "true" | "yes" | "on")
            }
        }
        None => default,
    }
}
