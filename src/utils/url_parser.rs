/// Host part of a URL, without scheme, credentials or path. Shown in page headers
/// so users can tell which API the console talks to.
pub fn hostname_from_url(u: &str) -> String {
    let s = u.trim();
    let s = s.split_once("://").map(|(_, rest)| rest).unwrap_or(s);
    let authority = s.split(['/', '?', '#']).next().unwrap_or(s);
    let host = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    host.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scheme_path_and_credentials() {
        assert_eq!(hostname_from_url("https://api.example.com/api/clusters_mgmt"), "api.example.com");
        assert_eq!(hostname_from_url("http://user:pw@localhost:8000?x=1"), "localhost:8000");
        assert_eq!(hostname_from_url(""), "");
    }
}
