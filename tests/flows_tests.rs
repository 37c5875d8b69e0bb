use chrono::{TimeZone, Utc};
use clusterwiz::flows::{cluster_proxy, machine_pool, upgrade_policy, FlowCatalog};
use clusterwiz::wizard::{FormValues, RemoteLookups, SubmitMethod, WizardDefinition};
use serde_json::{json, Value};

fn flow(name: &str) -> std::sync::Arc<WizardDefinition> {
    FlowCatalog::builtin().unwrap().get(name).unwrap()
}

/// Defaults overlaid with `overrides`.
fn values(def: &WizardDefinition, overrides: Value) -> FormValues {
    let extra = overrides.as_object().cloned().unwrap_or_default();
    def.default_values()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .chain(extra)
        .collect()
}

#[test]
fn test_builtin_catalog() {
    let catalog = FlowCatalog::builtin().expect("built-in flows are valid");
    assert_eq!(
        catalog.names(),
        vec![machine_pool::NAME, cluster_proxy::NAME, upgrade_policy::NAME]
    );
    assert!(catalog.get("nope").is_none());
    for def in catalog.iter() {
        assert!(!def.steps().is_empty());
        // Every predicate and rule only reads registered fields.
        for reads in def.registry().dependency_graph().values() {
            assert!(reads.iter().all(|k| def.field(k).is_some()));
        }
    }
}

#[test]
fn test_machine_pool_dependency_graph() {
    let def = flow(machine_pool::NAME);
    let graph = def.registry().dependency_graph();
    assert!(graph["max_nodes"].contains("min_nodes"));
    assert!(graph["max_nodes"].contains("autoscaling"));
    assert!(graph["capacity_reservation_id"].contains("capacity_reservation_preference"));
    assert!(graph["name"].is_empty());
}

#[test]
fn test_machine_pool_autoscaling_payload() {
    let def = flow(machine_pool::NAME);
    let lookups = RemoteLookups::new().with_list(machine_pool::MACHINE_TYPES, ["m5.xlarge"]);
    let v = values(
        &def,
        json!({
            "cluster_id": "prod-1",
            "name": "gpu",
            "instance_type": "m5.xlarge",
            "autoscaling": true,
            "min_nodes": 1,
            "max_nodes": 6,
            "capacity_reservation_preference": machine_pool::CR_ONLY,
            "capacity_reservation_id": "cr-0123456789abcdef0",
            "use_spot_instances": true,
            "spot_max_price": 0.25,
            "node_labels": [{"key": "gpu", "value": "true"}],
            "secure_boot": true,
        }),
    );
    let (applicability, validation) = def.validate(&v, &lookups);
    assert!(validation.is_valid(), "unexpected errors: {:?}", validation);

    let payload = def.payload(&v, &applicability.fields);
    assert_eq!(
        payload,
        json!({
            "id": "gpu",
            "instance_type": "m5.xlarge",
            "autoscaling": {"min_replicas": 1, "max_replicas": 6},
            "labels": {"gpu": "true"},
            "aws": {
                "capacity_reservation": {"preference": machine_pool::CR_ONLY, "id": "cr-0123456789abcdef0"},
                "spot_market_options": {"max_price": 0.25},
            },
        })
    );
    assert_eq!(def.method(), SubmitMethod::Post);
}

#[test]
fn test_machine_pool_gcp_payload_drops_aws_options() {
    let def = flow(machine_pool::NAME);
    let v = values(
        &def,
        json!({
            "cluster_id": "prod-1",
            "name": "pool",
            "cloud_provider": "gcp",
            "instance_type": "n2-standard-4",
            "use_spot_instances": true,
            "secure_boot": true,
        }),
    );
    // No lookup list loaded: the lookup rule is skipped.
    let (applicability, validation) = def.validate(&v, &RemoteLookups::new());
    assert!(validation.is_valid());
    let payload = def.payload(&v, &applicability.fields);
    assert!(payload.get("aws").is_none());
    assert_eq!(payload["gcp"], json!({"secure_boot": true}));
    assert_eq!(payload["replicas"], json!(2));
}

#[test]
fn test_proxy_requires_one_setting() {
    let def = flow(cluster_proxy::NAME);
    let v = values(&def, json!({"cluster_id": "prod-1"}));
    let (applicability, validation) = def.validate(&v, &RemoteLookups::new());
    assert!(validation.error("http_proxy").is_some());
    assert!(!applicability.is_field_applicable("no_proxy"));

    let v = values(&def, json!({"cluster_id": "prod-1", "https_proxy": "https://proxy.corp:3128"}));
    let (applicability, validation) = def.validate(&v, &RemoteLookups::new());
    assert!(validation.is_valid());
    assert!(applicability.is_field_applicable("no_proxy"));
}

#[test]
fn test_proxy_rejects_bad_urls_and_no_proxy_entries() {
    let def = flow(cluster_proxy::NAME);
    let v = values(
        &def,
        json!({
            "cluster_id": "prod-1",
            "http_proxy": "proxy.corp:3128",
            "no_proxy": ["example.com", "10.0.0.0/16", "not a domain"],
        }),
    );
    let (_, validation) = def.validate(&v, &RemoteLookups::new());
    assert_eq!(
        validation.error("http_proxy"),
        Some("The URL should include the scheme prefix (http://)")
    );
    assert!(validation.error("no_proxy").unwrap().contains("not a domain"));
}

#[test]
fn test_proxy_payload() {
    let def = flow(cluster_proxy::NAME);
    let v = values(
        &def,
        json!({
            "cluster_id": "prod-1",
            "http_proxy": "http://proxy.corp:3128",
            "no_proxy": [".corp", "10.0.0.0/16"],
        }),
    );
    let (applicability, validation) = def.validate(&v, &RemoteLookups::new());
    assert!(validation.is_valid());
    assert_eq!(def.method(), SubmitMethod::Patch);
    assert_eq!(def.endpoint(&v), "/api/clusters_mgmt/v1/clusters/prod-1");
    assert_eq!(
        def.payload(&v, &applicability.fields),
        json!({
            "proxy": {"http_proxy": "http://proxy.corp:3128", "https_proxy": "", "no_proxy": ".corp,10.0.0.0/16"},
            "additional_trust_bundle": "",
        })
    );
}

#[test]
fn test_upgrade_manual_start_must_be_in_future() {
    let def = flow(upgrade_policy::NAME);
    let lookups = RemoteLookups::new()
        .with_list(upgrade_policy::UPGRADE_VERSIONS, ["4.16.3"])
        .at(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
    let mut overrides = json!({
        "cluster_id": "prod-1",
        "version": "4.16.3",
        "start_at": "2026-01-01T00:00:00Z",
        "acknowledge": true,
    });
    let (_, validation) = def.validate(&values(&def, overrides.clone()), &lookups);
    assert_eq!(validation.error("start_at"), Some("Start time must be in the future"));

    overrides["start_at"] = json!("2026-06-02T03:00:00Z");
    let v = values(&def, overrides);
    let (applicability, validation) = def.validate(&v, &lookups);
    assert!(validation.is_valid());
    assert_eq!(
        applicability.steps,
        vec!["strategy", "version", "draining", "confirm"]
    );
    let payload = def.payload(&v, &applicability.fields);
    assert_eq!(payload["schedule_type"], json!("manual"));
    assert_eq!(payload["next_run"], json!("2026-06-02T03:00:00Z"));
    assert_eq!(payload["node_drain_grace_period"], json!({"value": 60, "unit": "minutes"}));
}

#[test]
fn test_upgrade_automatic_hides_version_step() {
    let def = flow(upgrade_policy::NAME);
    let v = values(
        &def,
        json!({"cluster_id": "prod-1", "schedule_type": "automatic", "day": "wed", "hour": 4}),
    );
    let (applicability, validation) = def.validate(&v, &RemoteLookups::new());
    assert!(!applicability.is_field_applicable("version"));
    assert!(validation.error("version").is_none());
    assert!(validation.error("start_at").is_none());
    assert_eq!(
        validation.error("acknowledge"),
        Some("Acknowledge the upgrade impact to continue")
    );

    let payload = def.payload(&v, &applicability.fields);
    assert_eq!(payload["schedule"], json!("00 4 * * 3"));
}

#[test]
fn test_upgrade_hour_out_of_range() {
    let def = flow(upgrade_policy::NAME);
    let v = values(&def, json!({"cluster_id": "prod-1", "schedule_type": "automatic", "hour": 24}));
    let (_, validation) = def.validate(&v, &RemoteLookups::new());
    assert!(validation.error("hour").is_some());
}
