use crate::kibana::HttpMethod;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomicOperationType {
    ReadIndexConfig,
    CreateIndex,
    UpdateMapping,
    UpdateSettings,
    Reindex,
    CreateAlias,
    SwitchAlias,
    DeleteAlias,
    DeleteIndex,
    VerifyData,
    BackupIndex,
    CustomApi,
    CustomScript,
}

/// Request an operation sends through the console proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub method: HttpMethod,
    /// Path with `{{variable}}` placeholders
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_condition: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
    Object,
    Array,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub type Schema = BTreeMap<String, FieldSchema>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomicOperation {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub operation_type: AtomicOperationType,
    pub description: String,
    pub api_config: ApiConfig,
    pub input_schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Schema>,
    pub is_builtin: bool,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOperation {
    pub name: String,
    #[serde(rename = "type")]
    pub operation_type: AtomicOperationType,
    #[serde(default)]
    pub description: String,
    pub api_config: ApiConfig,
    #[serde(default)]
    pub input_schema: Schema,
    pub output_schema: Option<Schema>,
}
