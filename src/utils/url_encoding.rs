use std::collections::HashMap;

/// Parse a URL-encoded form body. Repeated keys keep every value in order.
pub fn parse_urlencoded_body(body: &[u8]) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    let raw = String::from_utf8_lossy(body);
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key_enc, val_enc) = pair.split_once('=').unwrap_or((pair, ""));
        map.entry(decode_component(key_enc))
            .or_default()
            .push(decode_component(val_enc));
    }
    map
}

/// Forms encode spaces as `+`, which `urlencoding` leaves alone.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}
