use serde_json::Value;

use super::client::ApiClient;
use super::error::ApiError;
use crate::wizard::{LookupSource, RemoteLookups};

/// Fetch one option list. Items are read from `items`, the API's list envelope.
pub async fn load_lookup_list(client: &ApiClient, source: &LookupSource) -> Result<Vec<String>, ApiError> {
    let payload = client.get_json(&source.endpoint, &[("size", "500")]).await?;
    Ok(extract_ids(&payload, &source.id_field))
}

pub fn extract_ids(payload: &Value, id_field: &str) -> Vec<String> {
    payload
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(id_field).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Fetch every lookup a wizard declares. A list that fails to load is left out
/// so rules depending on it are skipped instead of blocking the user.
pub async fn load_remote_lookups(client: &ApiClient, sources: &[LookupSource]) -> RemoteLookups {
    let mut lookups = RemoteLookups::new();
    for source in sources {
        match load_lookup_list(client, source).await {
            Ok(items) => {
                tracing::debug!(list = %source.name, count = items.len(), "Loaded lookup list");
                lookups.insert_list(source.name.clone(), items);
            }
            Err(e) => {
                tracing::warn!(list = %source.name, endpoint = %source.endpoint, %e, "Failed to load lookup list");
            }
        }
    }
    lookups
}
