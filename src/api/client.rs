use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use yansi::Paint;

use super::error::ApiError;
use crate::config::Config;
use crate::wizard::{SubmitMethod, SubmittedResource};

static SILENT: AtomicBool = AtomicBool::new(false);

/// Suppress curl-style request logging (`--silent`).
pub fn set_silent(silent: bool) {
    SILENT.store(silent, Ordering::Relaxed);
}

fn log_output(msg: String) {
    if !SILENT.load(Ordering::Relaxed) {
        tracing::debug!(target: "clusterwiz::api", "{}", msg);
    }
}

/// Render a request as a copy-pasteable curl command. The token is redacted.
pub fn curl_command(method: &str, url: &str, has_token: bool, body: Option<&Value>) -> String {
    let mut parts = Vec::new();
    parts.push(Paint::new("curl").fg(yansi::Color::Green).bold().to_string());
    parts.push(format!("-X {}", Paint::new(method).fg(yansi::Color::Yellow).bold()));
    parts.push(format!("'{}'", Paint::new(url).fg(yansi::Color::Cyan)));
    if has_token {
        parts.push(format!(
            "{} {}",
            Paint::new("-H").fg(yansi::Color::Magenta),
            Paint::new("'Authorization: Bearer ***'").fg(yansi::Color::Magenta)
        ));
    }
    if let Some(d) = body {
        let json_str = serde_json::to_string(d).unwrap_or_default();
        let escaped_json = json_str.replace('\'', "'\\''");
        parts.push(format!(
            "{} {} {}",
            Paint::new("-H").fg(yansi::Color::Magenta),
            Paint::new("'Content-Type: application/json'").fg(yansi::Color::Magenta),
            Paint::new(format!("-d '{}'", escaped_json)).fg(yansi::Color::Blue)
        ));
    }
    parts.join(" ")
}

/// Client for the cluster management API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("clusterwiz/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(config.api_base_url.clone(), config.api_token.clone(), config.submit_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a wizard's final payload.
    pub async fn submit(
        &self,
        method: SubmitMethod,
        endpoint: &str,
        payload: &Value,
    ) -> Result<SubmittedResource, ApiError> {
        let body = self.send(method.as_str(), endpoint, Some(payload), &[]).await?;
        Ok(SubmittedResource::from_body(body))
    }

    pub async fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.send("GET", endpoint, None, params).await
    }

    async fn send(
        &self,
        method: &str,
        endpoint: &str,
        body: Option<&Value>,
        params: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut url_for_log = url.clone();
        if !params.is_empty() {
            let query_string = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<String>>()
                .join("&");
            url_for_log = format!("{}?{}", url_for_log, query_string);
        }
        log_output(format!(
            "Request:\n{}",
            curl_command(method, &url_for_log, !self.token.is_empty(), body)
        ));

        let mut req = match method {
            "POST" => self.http.post(&url),
            "PUT" => self.http.put(&url),
            "PATCH" => self.http.patch(&url),
            "DELETE" => self.http.delete(&url),
            _ => self.http.get(&url),
        };
        if !self.token.is_empty() {
            req = req.bearer_auth(&self.token);
        }
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await.map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| ApiError::Network(e.to_string()))?;
        let parsed: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?
        };
        log_output(format!(
            "Response {}:\n{}",
            status.as_u16(),
            Paint::new(serde_json::to_string(&parsed).unwrap_or_default()).rgb(100, 100, 100)
        ));

        if status.is_success() {
            Ok(parsed)
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                message: error_reason(&parsed).unwrap_or_else(|| status.to_string()),
            })
        }
    }
}

/// Human-readable reason from an API error body.
pub fn error_reason(body: &Value) -> Option<String> {
    ["reason", "detail", "message"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_reason_prefers_reason() {
        let body = json!({"kind": "Error", "reason": "Machine pool name already taken", "message": "x"});
        assert_eq!(error_reason(&body), Some("Machine pool name already taken".into()));
        assert_eq!(error_reason(&json!({"detail": "nope"})), Some("nope".into()));
        assert_eq!(error_reason(&json!({})), None);
    }

    #[test]
    fn test_curl_command_redacts_token() {
        yansi::disable();
        let cmd = curl_command("POST", "http://api/x", true, Some(&json!({"a": "it's"})));
        assert!(cmd.contains("Bearer ***"));
        assert!(cmd.contains(r#"-d '{"a":"it'\''s"}'"#));
    }
}
