//! Upgrade scheduling
use indexmap::IndexSet;
use serde_json::{json, Value};

use crate::wizard::{
    Condition, DefinitionError, FieldDefinition, FieldKind, FormValues, Rule, StepDefinition, SubmitMethod,
    WizardDefinition,
};

pub const NAME: &str = "upgrade-policy";

/// Lookup list holding the versions the cluster may upgrade to.
pub const UPGRADE_VERSIONS: &str = "upgrade_versions";

const DAYS: [(&str, &str); 7] = [
    ("sun", "Sunday"),
    ("mon", "Monday"),
    ("tue", "Tuesday"),
    ("wed", "Wednesday"),
    ("thu", "Thursday"),
    ("fri", "Friday"),
    ("sat", "Saturday"),
];

pub fn definition() -> Result<WizardDefinition, DefinitionError> {
    WizardDefinition::builder(NAME, "Schedule cluster upgrades")
        .description("Schedule a single upgrade to a chosen version, or recurring automatic upgrades.")
        .field(super::cluster_id_field())
        .field(
            FieldDefinition::new(
                "schedule_type",
                "Update strategy",
                FieldKind::select([("manual", "Individual update"), ("automatic", "Recurring updates")]),
            )
            .with_default("manual")
            .required(),
        )
        .field(
            FieldDefinition::new("version", "Target version", FieldKind::lookup_select(UPGRADE_VERSIONS))
                .required()
                .with_rule(Rule::in_lookup(UPGRADE_VERSIONS)),
        )
        .field(
            FieldDefinition::new("start_at", "Start time", FieldKind::Text)
                .required()
                .with_rule(Rule::Timestamp { future_only: true })
                .with_help("UTC or offset timestamp, for example 2026-11-02T03:00:00Z."),
        )
        .field(FieldDefinition::new("day", "Day of week", FieldKind::select(DAYS)).with_default("sun"))
        .field(
            FieldDefinition::new("hour", "Start hour (UTC)", FieldKind::Number { integer: true })
                .with_default(0)
                .required()
                .with_rule(Rule::range(0.0, 23.0)),
        )
        .field(
            FieldDefinition::new("node_drain_grace_minutes", "Node draining grace period (minutes)", FieldKind::Number { integer: true })
                .with_default(60)
                .required()
                .with_rule(Rule::range(0.0, 10080.0)),
        )
        .field(
            FieldDefinition::new("acknowledge", "I understand the cluster will be unavailable to new workloads while nodes drain", FieldKind::Toggle)
                .with_rule(Rule::must_be_true("Acknowledge the upgrade impact to continue")),
        )
        .step(StepDefinition::new("strategy", "Strategy").with_fields(["cluster_id", "schedule_type"]))
        .step(
            StepDefinition::new("version", "Version and time")
                .with_fields(["version", "start_at"])
                .applies_when(Condition::equals("schedule_type", "manual")),
        )
        .step(
            StepDefinition::new("recurrence", "Recurrence")
                .with_fields(["day", "hour"])
                .applies_when(Condition::equals("schedule_type", "automatic")),
        )
        .step(StepDefinition::new("draining", "Node draining").with_fields(["node_drain_grace_minutes"]))
        .step(StepDefinition::new("confirm", "Confirm").with_fields(["acknowledge"]))
        .submit_to(SubmitMethod::Post, endpoint)
        .payload(payload)
        .lookup(UPGRADE_VERSIONS, "/api/clusters_mgmt/v1/versions", "raw_id")
        .build()
}

fn endpoint(values: &FormValues) -> String {
    format!(
        "/api/clusters_mgmt/v1/clusters/{}/upgrade_policies",
        values.text("cluster_id").unwrap_or_default()
    )
}

/// Cron expression for a weekly run at `hour:00` UTC on `day`.
pub fn weekly_schedule(day: &str, hour: i64) -> String {
    let dow = DAYS.iter().position(|(d, _)| *d == day).unwrap_or(0);
    format!("00 {} * * {}", hour, dow)
}

fn payload(values: &FormValues, applicable: &IndexSet<String>) -> Value {
    let drain = json!({
        "value": values.integer("node_drain_grace_minutes"),
        "unit": "minutes",
    });
    if applicable.contains("day") {
        json!({
            "schedule_type": "automatic",
            "upgrade_type": "OSD",
            "schedule": weekly_schedule(values.text("day").unwrap_or("sun"), values.integer("hour").unwrap_or(0)),
            "node_drain_grace_period": drain,
        })
    } else {
        json!({
            "schedule_type": "manual",
            "upgrade_type": "OSD",
            "version": values.text("version"),
            "next_run": values.text("start_at"),
            "node_drain_grace_period": drain,
        })
    }
}
