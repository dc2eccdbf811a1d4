use crate::{
    console::examples::ExampleCategory,
    error::{ApiError, StoreError},
    kibana::HttpMethod,
    new_id,
    workflow::executor::RequestExecutor,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::VecDeque, sync::Arc};

pub mod examples;

/// Number of executed requests kept in the history
const HISTORY_SIZE: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleRequest {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub method: HttpMethod,
    pub path: String,
    pub body: String,
    pub status: u16,
    pub duration_ms: u64,
    pub response: Value,
    pub timestamp: i64,
}

/// A saved or builtin console request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub method: HttpMethod,
    pub path: String,
    pub body: String,
    pub is_custom: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewConsoleTemplate {
    pub label: String,
    pub description: Option<String>,
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub body: String,
}

/// Developer console: raw requests through the Kibana console proxy
pub struct Console {
    requests: Arc<dyn RequestExecutor>,
    history: RwLock<VecDeque<HistoryEntry>>,
    templates: RwLock<Vec<ConsoleTemplate>>,
}

impl Console {
    pub fn new(requests: Arc<dyn RequestExecutor>) -> Self {
        Self {
            requests,
            history: RwLock::new(VecDeque::with_capacity(HISTORY_SIZE)),
            templates: RwLock::new(Vec::new()),
        }
    }

    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: ConsoleRequest, now: i64) -> Result<HistoryEntry, ApiError> {
        let method: HttpMethod = request
            .method
            .parse()
            .map_err(|e: anyhow::Error| ApiError::BadRequest(e.to_string()))?;
        let path = normalize_path(&request.path).ok_or_else(|| {
            ApiError::BadRequest("Request path is required".to_string())
        })?;
        let body = request.body.unwrap_or_default();

        let response = self
            .requests
            .execute(method, &path, Some(body.as_str()))
            .await?;

        tracing::debug!("{} {} -> {} in {}ms", method, path, response.status, response.duration_ms);

        let entry = HistoryEntry {
            id: new_id("req"),
            method,
            path,
            body,
            status: response.status,
            duration_ms: response.duration_ms,
            response: response.body,
            timestamp: now,
        };

        let mut history = self.history.write();
        history.push_front(entry.clone());
        history.truncate(HISTORY_SIZE);

        Ok(entry)
    }

    /// Executed requests, newest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.read().iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    pub fn list_templates(&self) -> Vec<ConsoleTemplate> {
        self.templates.read().clone()
    }

    pub fn create_template(&self, new: NewConsoleTemplate) -> Result<ConsoleTemplate, StoreError> {
        let template = build_template(new_id("custom"), new)?;

        self.templates.write().push(template.clone());

        Ok(template)
    }

    pub fn update_template(&self, id: &str, new: NewConsoleTemplate) -> Result<ConsoleTemplate, StoreError> {
        let mut templates = self.templates.write();
        let existing = templates
            .iter_mut()
            .find(|t| t.id.as_deref() == Some(id))
            .ok_or_else(|| not_found(id))?;

        *existing = build_template(id.to_string(), new)?;

        Ok(existing.clone())
    }

    pub fn delete_template(&self, id: &str) -> Result<(), StoreError> {
        let mut templates = self.templates.write();
        let before = templates.len();
        templates.retain(|t| t.id.as_deref() != Some(id));

        match templates.len() == before {
            true => Err(not_found(id)),
            false => Ok(()),
        }
    }

    /// Saved templates as a "custom" category, when there are any, then the builtin examples
    pub fn categories(&self) -> Vec<ExampleCategory> {
        let saved = self.list_templates();
        let mut categories = Vec::new();

        if !saved.is_empty() {
            categories.push(ExampleCategory {
                key: "custom".to_string(),
                label: "My templates".to_string(),
                examples: saved,
            });
        }

        categories.extend(examples::builtin());
        categories
    }
}

fn normalize_path(path: &str) -> Option<String> {
    match path.trim() {
        "" => None,
        path if path.starts_with('/') => Some(path.to_string()),
        path => Some(format!("/{}", path)),
    }
}

fn build_template(id: String, new: NewConsoleTemplate) -> Result<ConsoleTemplate, StoreError> {
    if new.label.trim().is_empty() {
        return Err(StoreError::Invalid("Template label is required".into()));
    }

    let path = normalize_path(&new.path)
        .ok_or_else(|| StoreError::Invalid("Template path is required".into()))?;

    Ok(ConsoleTemplate {
        id: Some(id),
        label: new.label.trim().to_string(),
        description: new.description.filter(|d| !d.trim().is_empty()),
        method: new.method,
        path,
        body: new.body,
        is_custom: true,
    })
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound(format!("Console template '{}'", id))
}
