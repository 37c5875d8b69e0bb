//! Machine pool creation
use indexmap::IndexSet;
use serde_json::{json, Map, Value};

use crate::wizard::{
    Condition, DefinitionError, FieldDefinition, FieldKind, FormValues, Rule, StepDefinition, SubmitMethod,
    WizardDefinition,
};

pub const NAME: &str = "machine-pool";

/// Lookup list holding the machine types offered by the API.
pub const MACHINE_TYPES: &str = "machine_types";

pub const CR_NONE: &str = "none";
pub const CR_OPEN: &str = "open";
pub const CR_ONLY: &str = "capacity-reservations-only";

const MAX_NODES: f64 = 500.0;

pub fn definition() -> Result<WizardDefinition, DefinitionError> {
    WizardDefinition::builder(NAME, "Add machine pool")
        .description("Create a machine pool with fixed or autoscaled nodes on an existing cluster.")
        .field(super::cluster_id_field())
        .field(
            FieldDefinition::new("name", "Machine pool name", FieldKind::Text)
                .required()
                .with_rule(Rule::MaxLength(30))
                .with_rule(Rule::pattern(
                    r"^[a-z]([-a-z0-9]*[a-z0-9])?$",
                    "Name must consist of lower-case alphanumeric characters or '-', start with a letter, and end with an alphanumeric character",
                )),
        )
        .field(
            FieldDefinition::new(
                "cloud_provider",
                "Cloud provider",
                FieldKind::select([("aws", "Amazon Web Services"), ("gcp", "Google Cloud")]),
            )
            .with_default("aws")
            .required(),
        )
        .field(
            FieldDefinition::new("instance_type", "Compute node instance type", FieldKind::lookup_select(MACHINE_TYPES))
                .required()
                .with_rule(Rule::in_lookup(MACHINE_TYPES)),
        )
        .field(
            FieldDefinition::new("autoscaling", "Enable autoscaling", FieldKind::Toggle)
                .with_help("Let the cluster scale the pool between a minimum and maximum node count."),
        )
        .field(
            FieldDefinition::new("replicas", "Compute node count", FieldKind::Number { integer: true })
                .with_default(2)
                .applies_when(Condition::truthy("autoscaling").negate())
                .required()
                .with_rule(Rule::range(0.0, MAX_NODES)),
        )
        .field(
            FieldDefinition::new("min_nodes", "Minimum node count", FieldKind::Number { integer: true })
                .with_default(2)
                .applies_when(Condition::truthy("autoscaling"))
                .required()
                .with_rule(Rule::range(0.0, MAX_NODES)),
        )
        .field(
            FieldDefinition::new("max_nodes", "Maximum node count", FieldKind::Number { integer: true })
                .with_default(4)
                .applies_when(Condition::truthy("autoscaling"))
                .required()
                .with_rule(Rule::range(1.0, MAX_NODES))
                .with_rule(Rule::greater_or_equal(
                    "min_nodes",
                    "Max nodes must be greater than or equal to min nodes",
                )),
        )
        .field(
            FieldDefinition::new(
                "capacity_reservation_preference",
                "Capacity reservation preference",
                FieldKind::select([(CR_NONE, "None"), (CR_OPEN, "Open"), (CR_ONLY, "CR only")]),
            )
            .with_default(CR_NONE),
        )
        .field(
            FieldDefinition::new("capacity_reservation_id", "Reservation ID", FieldKind::Text)
                .applies_when(Condition::equals("capacity_reservation_preference", CR_ONLY))
                .required()
                .with_rule(Rule::pattern(
                    r"^cr-[0-9a-f]{17}$",
                    "Reservation ID must look like cr-0123456789abcdef0",
                )),
        )
        .field(FieldDefinition::new("use_spot_instances", "Use Amazon EC2 Spot Instances", FieldKind::Toggle))
        .field(
            FieldDefinition::new("spot_max_price", "Maximum hourly price (USD)", FieldKind::Number { integer: false })
                .applies_when(Condition::truthy("use_spot_instances"))
                .with_rule(Rule::range(0.001, None))
                .with_help("Leave empty to cap at the on-demand price."),
        )
        .field(FieldDefinition::new("secure_boot", "Enable Secure Boot", FieldKind::Toggle))
        .field(
            FieldDefinition::new("node_labels", "Node labels", FieldKind::LabelList)
                .with_rule(Rule::LabelFormat)
                .with_rule(Rule::UniqueLabelKeys)
                .with_help("One key=value pair per line."),
        )
        .step(StepDefinition::new("details", "Details").with_fields(["cluster_id", "name", "cloud_provider", "instance_type"]))
        .step(StepDefinition::new("scaling", "Scaling").with_fields(["autoscaling", "replicas", "min_nodes", "max_nodes"]))
        .step(
            StepDefinition::new("aws", "AWS options")
                .with_fields(["capacity_reservation_preference", "capacity_reservation_id", "use_spot_instances", "spot_max_price"])
                .applies_when(Condition::equals("cloud_provider", "aws")),
        )
        .step(
            StepDefinition::new("gcp", "Google Cloud options")
                .with_fields(["secure_boot"])
                .applies_when(Condition::equals("cloud_provider", "gcp")),
        )
        .step(StepDefinition::new("labels", "Labels").with_fields(["node_labels"]))
        .step(StepDefinition::new("review", "Review"))
        .submit_to(SubmitMethod::Post, endpoint)
        .payload(payload)
        .lookup(MACHINE_TYPES, "/api/clusters_mgmt/v1/machine_types", "id")
        .build()
}

fn endpoint(values: &FormValues) -> String {
    format!(
        "/api/clusters_mgmt/v1/clusters/{}/machine_pools",
        values.text("cluster_id").unwrap_or_default()
    )
}

fn payload(values: &FormValues, applicable: &IndexSet<String>) -> Value {
    let applies = |key: &str| applicable.contains(key);
    let mut body = Map::new();
    body.insert("id".into(), json!(values.text("name")));
    body.insert("instance_type".into(), json!(values.text("instance_type")));
    if applies("min_nodes") {
        body.insert(
            "autoscaling".into(),
            json!({
                "min_replicas": values.integer("min_nodes"),
                "max_replicas": values.integer("max_nodes"),
            }),
        );
    } else {
        body.insert("replicas".into(), json!(values.integer("replicas")));
    }

    let labels: Map<String, Value> = values
        .get("node_labels")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let key = item.get("key")?.as_str()?;
                    let value = item.get("value").and_then(Value::as_str).unwrap_or("");
                    Some((key.to_string(), json!(value)))
                })
                .collect()
        })
        .unwrap_or_default();
    if !labels.is_empty() {
        body.insert("labels".into(), Value::Object(labels));
    }

    if applies("capacity_reservation_preference") {
        let mut aws = Map::new();
        let preference = values.text("capacity_reservation_preference").unwrap_or(CR_NONE);
        if preference != CR_NONE {
            let mut reservation = json!({ "preference": preference });
            if applies("capacity_reservation_id") {
                reservation["id"] = json!(values.text("capacity_reservation_id"));
            }
            aws.insert("capacity_reservation".into(), reservation);
        }
        if values.flag("use_spot_instances") {
            let options = match values.number("spot_max_price") {
                Some(price) => json!({ "max_price": price }),
                None => json!({}),
            };
            aws.insert("spot_market_options".into(), options);
        }
        if !aws.is_empty() {
            body.insert("aws".into(), Value::Object(aws));
        }
    }
    if applies("secure_boot") {
        body.insert("gcp".into(), json!({ "secure_boot": values.flag("secure_boot") }));
    }
    Value::Object(body)
}
