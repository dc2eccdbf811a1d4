use crate::{
    alerting::{
        channel::{ChannelConfig, DingtalkConfig, NotificationChannel, WebhookConfig, WebhookMethod},
        record::{AlertRecord, NotificationAttempt},
        rule::AlertMetricType,
    },
    format::{format_bytes, format_duration},
    metrics::{
        Status,
        alerting::record_notification,
        external::{Target, external_request_timer, record_external_request_failure},
    },
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use std::time::Duration;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("valid placeholder regex"));

/// What gets delivered: a short title, a human readable text and a JSON payload
#[derive(Debug, Clone)]
pub struct Message {
    pub title: String,
    pub text: String,
    pub payload: Value,
}

impl Message {
    pub fn for_alert(record: &AlertRecord) -> Self {
        let severity = serde_json::to_value(record.severity)
            .ok()
            .and_then(|v| v.as_str().map(str::to_uppercase))
            .unwrap_or_default();

        Self {
            title: format!("[{}] {}", severity, record.rule_name),
            text: record.message.clone(),
            payload: serde_json::to_value(record).unwrap_or(Value::Null),
        }
    }

    pub fn text(title: impl Into<String>, text: impl Into<String>) -> Self {
        let title = title.into();
        let text = text.into();
        let payload = json!({ "title": title, "message": text });

        Self {
            title,
            text,
            payload,
        }
    }
}

/// Human readable value for an alert message
pub fn describe_value(metric: AlertMetricType, value: f64) -> String {
    match metric {
        AlertMetricType::IndexSize => format_bytes(value.max(0.0) as u64, 2),
        AlertMetricType::SearchLatency | AlertMetricType::IndexingLatency => {
            format_duration(value.max(0.0) as u64)
        }
        AlertMetricType::NodeCpu
        | AlertMetricType::NodeHeap
        | AlertMetricType::NodeDisk
        | AlertMetricType::NodeMemory => format!("{:.1}%", value),
        AlertMetricType::ClusterHealth => match value as i64 {
            0 => "green".to_string(),
            1 => "yellow".to_string(),
            _ => "red".to_string(),
        },
        _ => format!("{}", value),
    }
}

pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client })
    }

    /// Deliver an alert to one channel; the outcome is returned rather than raised
    pub async fn notify_alert(
        &self,
        channel: &NotificationChannel,
        record: &AlertRecord,
        now: i64,
    ) -> NotificationAttempt {
        let result = self.send(channel, &Message::for_alert(record)).await;

        if let Err(e) = &result {
            tracing::warn!(
                "Notification for alert {} via channel '{}' failed: {}",
                record.id,
                channel.name,
                e
            );
        }

        NotificationAttempt {
            channel_id: channel.id.clone(),
            channel_type: channel.channel_type,
            sent_at: now,
            success: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        }
    }

    #[tracing::instrument(skip(self, channel, message), fields(channel = %channel.id))]
    pub async fn send(&self, channel: &NotificationChannel, message: &Message) -> anyhow::Result<()> {
        let result = match &channel.config {
            ChannelConfig::Webhook(config) => self.send_webhook(config, message).await,
            ChannelConfig::Dingtalk(config) => self.send_dingtalk(config, message).await,
            ChannelConfig::Internal(config) => {
                tracing::info!(
                    "Internal notification (broadcast={}, users={:?}): {} - {}",
                    config.broadcast,
                    config.user_ids,
                    message.title,
                    message.text
                );
                Ok(())
            }
            ChannelConfig::Email(_) | ChannelConfig::Sms(_) => Err(anyhow::anyhow!(
                "Unsupported channel type '{}'",
                channel.channel_type
            )),
        };

        record_notification(channel.channel_type.as_str(), Status::from(result.is_ok()));

        result
    }

    async fn send_webhook(&self, config: &WebhookConfig, message: &Message) -> anyhow::Result<()> {
        let mut request = match config.method {
            WebhookMethod::Get => self.client.get(&config.url),
            WebhookMethod::Post => self.client.post(&config.url),
        };

        for (name, value) in &config.headers {
            request = request.header(name, value);
        }

        if config.method == WebhookMethod::Post {
            request = match &config.template {
                Some(template) => request
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(fill_template(template, &message.payload)),
                None => request.json(&message.payload),
            };
        }

        self.execute(request).await
    }

    async fn send_dingtalk(&self, config: &DingtalkConfig, message: &Message) -> anyhow::Result<()> {
        let body = json!({
            "msgtype": "text",
            "text": { "content": format!("{}\n{}", message.title, message.text) },
            "at": { "atMobiles": config.at_mobiles, "isAtAll": config.at_all },
        });

        self.execute(self.client.post(&config.webhook_url).json(&body))
            .await
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> anyhow::Result<()> {
        let _timer = external_request_timer(Target::Notification);

        let response = request.send().await.inspect_err(|_| {
            record_external_request_failure(Target::Notification);
        })?;

        let status = response.status();
        if !status.is_success() {
            record_external_request_failure(Target::Notification);

            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();

            return Err(anyhow::anyhow!("Request failed: {} - {}", status.as_u16(), snippet));
        }

        Ok(())
    }
}

/// Replace `{{field}}` with top-level payload fields; strings go in raw, other values as JSON
fn fill_template(template: &str, payload: &Value) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| match payload.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::{
        channel::{ChannelType, EmailConfig, InternalConfig},
        record::AlertStatus,
        rule::AlertSeverity,
    };

    fn record() -> AlertRecord {
        AlertRecord {
            id: "alert-1".into(),
            rule_id: "rule-1".into(),
            rule_name: "Heap pressure".into(),
            metric: AlertMetricType::NodeHeap,
            severity: AlertSeverity::Critical,
            status: AlertStatus::Firing,
            message: "es-node-01 JVM heap usage is 89.0% (> 85)".into(),
            value: 89.0,
            threshold: 85.0,
            target: Some("es-node-01".into()),
            fired_at: 1,
            resolved_at: None,
            acknowledged_at: None,
            acknowledged_by: None,
            notifications_sent: vec![],
        }
    }

    fn channel(config: ChannelConfig) -> NotificationChannel {
        NotificationChannel {
            id: "c1".into(),
            name: "test".into(),
            channel_type: config.channel_type(),
            enabled: true,
            config,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn fills_webhook_template_from_payload() {
        let payload = json!({"ruleName": "Heap", "value": 89.5, "target": null});

        let body = fill_template(
            r#"{"text": "{{ruleName}} at {{value}}{{target}}{{missing}}"}"#,
            &payload,
        );

        assert_eq!(body, r#"{"text": "Heap at 89.5"}"#);
    }

    #[test]
    fn describes_values_by_metric() {
        assert_eq!(describe_value(AlertMetricType::IndexSize, 1536.0), "1.5 KB");
        assert_eq!(describe_value(AlertMetricType::SearchLatency, 650.0), "650ms");
        assert_eq!(describe_value(AlertMetricType::NodeCpu, 82.0), "82.0%");
        assert_eq!(describe_value(AlertMetricType::ClusterHealth, 2.0), "red");
        assert_eq!(describe_value(AlertMetricType::UnassignedShards, 3.0), "3");
    }

    #[test]
    fn alert_message_carries_severity_title() {
        let message = Message::for_alert(&record());

        assert_eq!(message.title, "[CRITICAL] Heap pressure");
        assert_eq!(message.payload["ruleId"], "rule-1");
    }

    #[tokio::test]
    async fn internal_channel_succeeds_and_email_is_unsupported() {
        let notifier = Notifier::new().unwrap();

        let internal = channel(ChannelConfig::Internal(InternalConfig::default()));
        let attempt = notifier.notify_alert(&internal, &record(), 42).await;
        assert!(attempt.success);
        assert_eq!(attempt.sent_at, 42);
        assert_eq!(attempt.channel_type, ChannelType::Internal);

        let email = channel(ChannelConfig::Email(EmailConfig::default()));
        let attempt = notifier.notify_alert(&email, &record(), 43).await;
        assert!(!attempt.success);
        assert_eq!(
            attempt.error.as_deref(),
            Some("Unsupported channel type 'email'")
        );
    }
}
