use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Email,
    Dingtalk,
    Webhook,
    Sms,
    Internal,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Email => "email",
            ChannelType::Dingtalk => "dingtalk",
            ChannelType::Webhook => "webhook",
            ChannelType::Sms => "sms",
            ChannelType::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailConfig {
    pub recipients: Vec<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub use_tls: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DingtalkConfig {
    pub webhook_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub at_mobiles: Vec<String>,
    pub at_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookMethod {
    Get,
    #[default]
    Post,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebhookConfig {
    pub url: String,
    pub method: WebhookMethod,
    pub headers: HashMap<String, String>,
    /// Body with `{{field}}` placeholders; the alert JSON is sent when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SmsConfig {
    pub phone_numbers: Vec<String>,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InternalConfig {
    pub user_ids: Vec<String>,
    pub broadcast: bool,
}

/// Transport settings, tagged with the channel type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelConfig {
    Email(EmailConfig),
    Dingtalk(DingtalkConfig),
    Webhook(WebhookConfig),
    Sms(SmsConfig),
    Internal(InternalConfig),
}

impl ChannelConfig {
    pub fn channel_type(&self) -> ChannelType {
        match self {
            ChannelConfig::Email(_) => ChannelType::Email,
            ChannelConfig::Dingtalk(_) => ChannelType::Dingtalk,
            ChannelConfig::Webhook(_) => ChannelType::Webhook,
            ChannelConfig::Sms(_) => ChannelType::Sms,
            ChannelConfig::Internal(_) => ChannelType::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub enabled: bool,
    pub config: ChannelConfig,
    pub created_at: i64,
    pub updated_at: i64,
}

fn enabled() -> bool {
    true
}

/// Channel fields accepted on create and update
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChannel {
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub config: ChannelConfig,
}

impl NewChannel {
    pub(crate) fn into_channel(
        self,
        id: String,
        created_at: i64,
        updated_at: i64,
    ) -> NotificationChannel {
        NotificationChannel {
            id,
            name: self.name.trim().to_string(),
            channel_type: self.channel_type,
            enabled: self.enabled,
            config: self.config,
            created_at,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_is_tagged_by_type() {
        let channel: NewChannel = serde_json::from_value(json!({
            "name": "Ops group",
            "type": "dingtalk",
            "config": {
                "type": "dingtalk",
                "webhookUrl": "https://oapi.dingtalk.com/robot/send?access_token=x",
                "atAll": true
            }
        }))
        .unwrap();

        assert!(channel.enabled);
        assert_eq!(channel.config.channel_type(), ChannelType::Dingtalk);

        let ChannelConfig::Dingtalk(config) = channel.config else {
            panic!("expected a dingtalk config");
        };
        assert!(config.at_all);
        assert!(config.at_mobiles.is_empty());
    }

    #[test]
    fn webhook_method_defaults_to_post() {
        let config: ChannelConfig =
            serde_json::from_value(json!({"type": "webhook", "url": "http://hook"})).unwrap();

        let ChannelConfig::Webhook(webhook) = config else {
            panic!("expected a webhook config");
        };
        assert_eq!(webhook.method, WebhookMethod::Post);
    }
}
