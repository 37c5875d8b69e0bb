//! Cluster-wide proxy editing
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::wizard::{
    Condition, DefinitionError, FieldDefinition, FieldKind, FormValues, Rule, StepDefinition, SubmitMethod,
    WizardDefinition,
};

pub const NAME: &str = "cluster-proxy";

static NO_PROXY_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*|\.?[A-Za-z0-9]([-A-Za-z0-9]*[A-Za-z0-9])?(\.[A-Za-z0-9]([-A-Za-z0-9]*[A-Za-z0-9])?)*|\d{1,3}(\.\d{1,3}){3}(/\d{1,2})?)$")
        .expect("no-proxy entry pattern")
});

const AT_LEAST_ONE: &str = "Configure at least one of the HTTP proxy URL, HTTPS proxy URL or additional trust bundle";

pub fn definition() -> Result<WizardDefinition, DefinitionError> {
    WizardDefinition::builder(NAME, "Edit cluster-wide proxy")
        .description("Route cluster egress through an HTTP or HTTPS proxy and trust its certificate.")
        .field(super::cluster_id_field())
        .field(
            FieldDefinition::new("http_proxy", "HTTP proxy URL", FieldKind::Text)
                .with_rule(Rule::at_least_one_of(&["https_proxy", "additional_trust_bundle"], AT_LEAST_ONE))
                .with_rule(Rule::pattern(
                    r"^http://\S+$",
                    "The URL should include the scheme prefix (http://)",
                )),
        )
        .field(
            FieldDefinition::new("https_proxy", "HTTPS proxy URL", FieldKind::Text)
                .with_rule(Rule::pattern(
                    r"^https?://\S+$",
                    "The URL should include the scheme prefix (http:// or https://)",
                )),
        )
        .field(
            FieldDefinition::new("no_proxy", "No proxy domains", FieldKind::TextList)
                .applies_when(Condition::Any(vec![
                    Condition::is_set("http_proxy"),
                    Condition::is_set("https_proxy"),
                ]))
                .with_rule(Rule::custom(&[], no_proxy_entries))
                .with_help("Comma separated domains, IP addresses or CIDR ranges that bypass the proxy."),
        )
        .field(
            FieldDefinition::new("additional_trust_bundle", "Additional trust bundle", FieldKind::Multiline)
                .with_rule(Rule::pattern(
                    r"(?s)^-----BEGIN CERTIFICATE-----.+-----END CERTIFICATE-----$",
                    "The trust bundle must be PEM encoded X.509 certificate data",
                )),
        )
        .step(StepDefinition::new("cluster", "Cluster").with_fields(["cluster_id"]))
        .step(
            StepDefinition::new("proxy", "Proxy")
                .with_fields(["http_proxy", "https_proxy", "no_proxy", "additional_trust_bundle"]),
        )
        .step(StepDefinition::new("review", "Review"))
        .submit_to(SubmitMethod::Patch, endpoint)
        .payload(payload)
        .build()
}

fn no_proxy_entries(key: &str, values: &FormValues, _: &crate::wizard::RemoteLookups) -> Option<String> {
    values
        .get(key)?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .find(|entry| !NO_PROXY_ENTRY.is_match(entry))
        .map(|entry| format!("`{}` is not a domain, IP address or CIDR range", entry))
}

fn endpoint(values: &FormValues) -> String {
    format!("/api/clusters_mgmt/v1/clusters/{}", values.text("cluster_id").unwrap_or_default())
}

fn payload(values: &FormValues, applicable: &IndexSet<String>) -> Value {
    let mut proxy = Map::new();
    for key in ["http_proxy", "https_proxy"] {
        proxy.insert(key.into(), json!(values.text(key).unwrap_or("")));
    }
    if applicable.contains("no_proxy") {
        let entries: Vec<&str> = values
            .get("no_proxy")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        proxy.insert("no_proxy".into(), json!(entries.join(",")));
    }
    json!({
        "proxy": Value::Object(proxy),
        "additional_trust_bundle": values.text("additional_trust_bundle").unwrap_or(""),
    })
}
