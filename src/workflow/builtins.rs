use crate::{
    approval::ApprovalRequestType,
    kibana::HttpMethod,
    workflow::{
        operation::{ApiConfig, AtomicOperation, AtomicOperationType, FieldSchema, FieldType, Schema},
        template::{TemplateCategory, TemplateStep, WorkflowStepType, WorkflowTemplate},
    },
};
use serde_json::{Map, Value, json};

const ACKNOWLEDGED: &str = "response.acknowledged === true";

fn field(field_type: FieldType, required: bool, description: &str) -> FieldSchema {
    FieldSchema {
        field_type,
        required,
        description: Some(description.to_string()),
    }
}

fn schema(fields: &[(&str, FieldSchema)]) -> Schema {
    fields
        .iter()
        .map(|(name, schema)| (name.to_string(), schema.clone()))
        .collect()
}

fn required_string(description: &str) -> FieldSchema {
    field(FieldType::String, true, description)
}

fn optional(field_type: FieldType, description: &str) -> FieldSchema {
    field(field_type, false, description)
}

fn output(fields: &[(&str, FieldType)]) -> Option<Schema> {
    Some(
        fields
            .iter()
            .map(|(name, field_type)| {
                let schema = FieldSchema {
                    field_type: *field_type,
                    ..Default::default()
                };
                (name.to_string(), schema)
            })
            .collect(),
    )
}

struct Spec {
    id: &'static str,
    name: &'static str,
    operation_type: AtomicOperationType,
    description: &'static str,
    method: HttpMethod,
    endpoint: &'static str,
    body: Option<&'static str>,
    condition: &'static str,
    input: Schema,
    output: Option<Schema>,
}

impl Spec {
    fn build(self, created_at: i64) -> AtomicOperation {
        AtomicOperation {
            id: self.id.to_string(),
            name: self.name.to_string(),
            operation_type: self.operation_type,
            description: self.description.to_string(),
            api_config: ApiConfig {
                method: self.method,
                endpoint: self.endpoint.to_string(),
                body: self.body.map(str::to_string),
                headers: None,
                success_condition: Some(self.condition.to_string()),
            },
            input_schema: self.input,
            output_schema: self.output,
            is_builtin: true,
            created_at,
            updated_at: None,
        }
    }
}

/// The atomic operations every store starts with
pub fn operations(created_at: i64) -> Vec<AtomicOperation> {
    use AtomicOperationType as Op;

    let specs = vec![
        Spec {
            id: "op-001",
            name: "Read index config",
            operation_type: Op::ReadIndexConfig,
            description: "Read the settings and mappings of an existing index",
            method: HttpMethod::Get,
            endpoint: "/{{indexName}}",
            body: None,
            condition: "response.status === 200",
            input: schema(&[("indexName", required_string("Index name"))]),
            output: output(&[("settings", FieldType::Object), ("mappings", FieldType::Object)]),
        },
        Spec {
            id: "op-002",
            name: "Create index",
            operation_type: Op::CreateIndex,
            description: "Create a new Elasticsearch index",
            method: HttpMethod::Put,
            endpoint: "/{{indexName}}",
            body: Some("{\n  \"settings\": {{settings}},\n  \"mappings\": {{mappings}}\n}"),
            condition: ACKNOWLEDGED,
            input: schema(&[
                ("indexName", required_string("Index name")),
                ("settings", optional(FieldType::Object, "Index settings")),
                ("mappings", optional(FieldType::Object, "Mapping definition")),
            ]),
            output: None,
        },
        Spec {
            id: "op-003",
            name: "Reindex",
            operation_type: Op::Reindex,
            description: "Copy documents from a source index into a destination index",
            method: HttpMethod::Post,
            endpoint: "/_reindex?wait_for_completion=true",
            body: Some(
                "{\n  \"source\": { \"index\": \"{{sourceIndex}}\" },\n  \"dest\": { \"index\": \"{{destIndex}}\" }\n}",
            ),
            condition: "response.failures.length === 0",
            input: schema(&[
                ("sourceIndex", required_string("Source index")),
                ("destIndex", required_string("Destination index")),
                ("script", optional(FieldType::String, "Painless script")),
            ]),
            output: None,
        },
        Spec {
            id: "op-004",
            name: "Switch alias",
            operation_type: Op::SwitchAlias,
            description: "Atomically move an alias from one index to another",
            method: HttpMethod::Post,
            endpoint: "/_aliases",
            body: Some(
                "{\n  \"actions\": [\n    { \"remove\": { \"index\": \"{{oldIndex}}\", \"alias\": \"{{alias}}\" } },\n    { \"add\": { \"index\": \"{{newIndex}}\", \"alias\": \"{{alias}}\" } }\n  ]\n}",
            ),
            condition: ACKNOWLEDGED,
            input: schema(&[
                ("alias", required_string("Alias")),
                ("oldIndex", required_string("Current index")),
                ("newIndex", required_string("New index")),
            ]),
            output: None,
        },
        Spec {
            id: "op-005",
            name: "Delete index",
            operation_type: Op::DeleteIndex,
            description: "Delete an index",
            method: HttpMethod::Delete,
            endpoint: "/{{indexName}}",
            body: None,
            condition: ACKNOWLEDGED,
            input: schema(&[("indexName", required_string("Index name"))]),
            output: None,
        },
        Spec {
            id: "op-006",
            name: "Verify data",
            operation_type: Op::VerifyData,
            description: "Compare the document counts of two indices",
            method: HttpMethod::Get,
            endpoint: "/{{sourceIndex}},{{targetIndex}}/_count",
            body: None,
            condition: "true",
            input: schema(&[
                ("sourceIndex", required_string("Source index")),
                ("targetIndex", required_string("Target index")),
            ]),
            output: output(&[
                ("sourceCount", FieldType::Number),
                ("targetCount", FieldType::Number),
                ("match", FieldType::Boolean),
            ]),
        },
        Spec {
            id: "op-007",
            name: "Create alias",
            operation_type: Op::CreateAlias,
            description: "Add an alias to an index",
            method: HttpMethod::Post,
            endpoint: "/_aliases",
            body: Some(
                "{\n  \"actions\": [\n    { \"add\": { \"index\": \"{{indexName}}\", \"alias\": \"{{alias}}\" } }\n  ]\n}",
            ),
            condition: ACKNOWLEDGED,
            input: schema(&[
                ("indexName", required_string("Index name")),
                ("alias", required_string("Alias")),
                ("filter", optional(FieldType::Object, "Alias filter")),
            ]),
            output: None,
        },
        Spec {
            id: "op-008",
            name: "Back up index",
            operation_type: Op::BackupIndex,
            description: "Take a snapshot of an index",
            method: HttpMethod::Put,
            endpoint: "/_snapshot/{{repository}}/{{snapshotName}}",
            body: Some("{\n  \"indices\": \"{{indexName}}\",\n  \"ignore_unavailable\": true\n}"),
            condition: "response.accepted === true",
            input: schema(&[
                ("indexName", required_string("Index name")),
                ("repository", required_string("Snapshot repository")),
                ("snapshotName", optional(FieldType::String, "Snapshot name")),
            ]),
            output: None,
        },
        Spec {
            id: "op-009",
            name: "Update mapping",
            operation_type: Op::UpdateMapping,
            description: "Add fields to an index mapping",
            method: HttpMethod::Put,
            endpoint: "/{{indexName}}/_mapping",
            body: Some("{{mappings}}"),
            condition: ACKNOWLEDGED,
            input: schema(&[
                ("indexName", required_string("Index name")),
                ("mappings", field(FieldType::Object, true, "Mapping definition")),
            ]),
            output: None,
        },
        Spec {
            id: "op-010",
            name: "Update settings",
            operation_type: Op::UpdateSettings,
            description: "Change dynamic index settings",
            method: HttpMethod::Put,
            endpoint: "/{{indexName}}/_settings",
            body: Some("{{settings}}"),
            condition: ACKNOWLEDGED,
            input: schema(&[
                ("indexName", required_string("Index name")),
                ("settings", field(FieldType::Object, true, "Settings")),
            ]),
            output: None,
        },
        Spec {
            id: "op-011",
            name: "Delete alias",
            operation_type: Op::DeleteAlias,
            description: "Remove an alias from an index",
            method: HttpMethod::Post,
            endpoint: "/_aliases",
            body: Some(
                "{\n  \"actions\": [\n    { \"remove\": { \"index\": \"{{indexName}}\", \"alias\": \"{{alias}}\" } }\n  ]\n}",
            ),
            condition: ACKNOWLEDGED,
            input: schema(&[
                ("indexName", required_string("Index name")),
                ("alias", required_string("Alias")),
            ]),
            output: None,
        },
    ];

    specs.into_iter().map(|s| s.build(created_at)).collect()
}

fn step(name: &str, step_type: WorkflowStepType, description: &str, config: Value) -> TemplateStep {
    let config: Map<String, Value> = match config {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    TemplateStep {
        name: name.to_string(),
        step_type,
        description: Some(description.to_string()),
        config,
    }
}

fn template(
    id: &str,
    name: &str,
    description: &str,
    category: TemplateCategory,
    bound: ApprovalRequestType,
    steps: Vec<TemplateStep>,
    created_at: i64,
) -> WorkflowTemplate {
    WorkflowTemplate {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        steps,
        is_builtin: true,
        bound_approval_types: vec![bound],
        created_at,
        updated_at: created_at,
    }
}

/// The workflow templates every store starts with, each bound to one approval type
pub fn templates(created_at: i64) -> Vec<WorkflowTemplate> {
    use WorkflowStepType as Step;

    vec![
        template(
            "tpl-001",
            "Index mapping change",
            "Read config, create new index, reindex, verify, switch alias, delete old index",
            TemplateCategory::Migration,
            ApprovalRequestType::UpdateMapping,
            vec![
                step(
                    "Read source index config",
                    Step::ReadIndexConfig,
                    "Read the settings and mappings of the source index",
                    json!({ "indexName": "{{sourceIndex}}" }),
                ),
                step(
                    "Create new index",
                    Step::CreateIndex,
                    "Create the new index with the changed mapping",
                    json!({ "indexName": "{{targetIndex}}", "copyFrom": "{{sourceIndex}}" }),
                ),
                step(
                    "Reindex data",
                    Step::Reindex,
                    "Copy documents from the old index into the new one",
                    json!({ "sourceIndex": "{{sourceIndex}}", "destIndex": "{{targetIndex}}" }),
                ),
                step(
                    "Verify data",
                    Step::VerifyData,
                    "Check document counts after the migration",
                    json!({ "sourceIndex": "{{sourceIndex}}", "targetIndex": "{{targetIndex}}" }),
                ),
                step(
                    "Switch alias",
                    Step::SwitchAlias,
                    "Point the alias at the new index",
                    json!({
                        "alias": "{{alias}}",
                        "oldIndex": "{{sourceIndex}}",
                        "newIndex": "{{targetIndex}}"
                    }),
                ),
                step(
                    "Delete old index",
                    Step::DeleteIndex,
                    "Delete the old index to free space",
                    json!({ "indexName": "{{sourceIndex}}" }),
                ),
                step(
                    "Notify",
                    Step::Notification,
                    "Tell the people involved that the change is done",
                    json!({ "channels": [] }),
                ),
            ],
            created_at,
        ),
        template(
            "tpl-002",
            "New business index",
            "Create a business index and give it an alias",
            TemplateCategory::Index,
            ApprovalRequestType::CreateIndex,
            vec![
                step("Create index", Step::CreateIndex, "Create the index", json!({})),
                step("Create alias", Step::CreateAlias, "Add the alias", json!({})),
                step(
                    "Notify",
                    Step::Notification,
                    "Tell the applicant the index exists",
                    json!({}),
                ),
            ],
            created_at,
        ),
        template(
            "tpl-003",
            "Alias switch",
            "Move an alias from one index to another",
            TemplateCategory::Alias,
            ApprovalRequestType::UpdateAlias,
            vec![
                step("Switch alias", Step::SwitchAlias, "Atomic alias switch", json!({})),
                step("Notify", Step::Notification, "Tell the people involved", json!({})),
            ],
            created_at,
        ),
        template(
            "tpl-004",
            "Index data migration",
            "Migrate data between indices, with a backup first",
            TemplateCategory::Migration,
            ApprovalRequestType::Reindex,
            vec![
                step(
                    "Back up source index",
                    Step::BackupIndex,
                    "Snapshot the source index",
                    json!({ "repository": "default" }),
                ),
                step("Reindex", Step::Reindex, "Run the reindex", json!({})),
                step(
                    "Verify data",
                    Step::VerifyData,
                    "Check document counts after the migration",
                    json!({}),
                ),
                step("Notify", Step::Notification, "Report the migration", json!({})),
            ],
            created_at,
        ),
        template(
            "tpl-005",
            "Index deletion with backup",
            "Snapshot an index before deleting it",
            TemplateCategory::Index,
            ApprovalRequestType::DeleteIndex,
            vec![
                step(
                    "Back up index",
                    Step::BackupIndex,
                    "Snapshot the index",
                    json!({ "repository": "default" }),
                ),
                step("Delete index", Step::DeleteIndex, "Delete the index", json!({})),
                step("Notify", Step::Notification, "Report the deletion", json!({})),
            ],
            created_at,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn eleven_operations_with_unique_ids_and_types() {
        let ops = operations(0);

        assert_eq!(ops.len(), 11);
        let ids: HashSet<_> = ops.iter().map(|o| o.id.as_str()).collect();
        let types: HashSet<_> = ops.iter().map(|o| o.operation_type).collect();
        assert_eq!(ids.len(), 11);
        assert_eq!(types.len(), 11);
        assert!(ops.iter().all(|o| o.is_builtin));
    }

    #[test]
    fn required_inputs_follow_operation() {
        let ops = operations(0);
        let mapping = ops.iter().find(|o| o.id == "op-009").unwrap();
        let create = ops.iter().find(|o| o.id == "op-002").unwrap();

        assert!(mapping.input_schema["mappings"].required);
        assert!(!create.input_schema["mappings"].required);
        assert_eq!(create.input_schema["mappings"].field_type, FieldType::Object);
    }

    #[test]
    fn templates_bind_default_approval_types() {
        let bound: Vec<_> = templates(0)
            .iter()
            .map(|t| (t.id.clone(), t.bound_approval_types.clone()))
            .collect();

        assert_eq!(bound[0], ("tpl-001".to_string(), vec![ApprovalRequestType::UpdateMapping]));
        assert_eq!(bound[4], ("tpl-005".to_string(), vec![ApprovalRequestType::DeleteIndex]));
        assert!(templates(0).iter().all(|t| t.steps.last().unwrap().step_type
            == WorkflowStepType::Notification));
    }
}
