use crate::{
    alerting::{
        channel::{NewChannel, NotificationChannel},
        record::{AlertRecord, AlertStatus, NotificationAttempt, RecordFilter},
        rule::{AlertMetricType, AlertRule, AlertSeverity, NewRule},
    },
    error::StoreError,
    new_id,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

const HOUR_MS: i64 = 3_600_000;

/// Rule and target an alert fires for
pub type AlertKey = (String, Option<String>);

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TrendBucket {
    pub timestamp: i64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStatistics {
    pub total: usize,
    pub firing: usize,
    pub resolved: usize,
    pub acknowledged: usize,
    pub by_severity: BTreeMap<AlertSeverity, usize>,
    pub by_metric: BTreeMap<AlertMetricType, usize>,
    pub recent_trend: Vec<TrendBucket>,
}

#[derive(Default)]
struct Inner {
    rules: Vec<AlertRule>,
    records: Vec<AlertRecord>,
    channels: Vec<NotificationChannel>,
}

/// In-memory rules, alert records and notification channels
#[derive(Default)]
pub struct AlertStore {
    inner: RwLock<Inner>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_rules(&self) -> Vec<AlertRule> {
        self.inner.read().rules.clone()
    }

    pub fn get_rule(&self, id: &str) -> Result<AlertRule, StoreError> {
        self.inner
            .read()
            .rules
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| rule_not_found(id))
    }

    pub fn create_rule(&self, rule: NewRule, now: i64) -> Result<AlertRule, StoreError> {
        let mut inner = self.inner.write();
        validate_rule(&rule, &inner.channels)?;

        let rule = rule.into_rule(new_id("rule"), now, now);
        inner.rules.push(rule.clone());

        tracing::info!("Created alert rule '{}' ({})", rule.name, rule.id);

        Ok(rule)
    }

    pub fn update_rule(&self, id: &str, rule: NewRule, now: i64) -> Result<AlertRule, StoreError> {
        let mut inner = self.inner.write();
        validate_rule(&rule, &inner.channels)?;

        let existing = inner
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| rule_not_found(id))?;

        *existing = rule.into_rule(existing.id.clone(), existing.created_at, now);

        Ok(existing.clone())
    }

    pub fn delete_rule(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let before = inner.rules.len();
        inner.rules.retain(|r| r.id != id);

        match inner.rules.len() < before {
            true => Ok(()),
            false => Err(rule_not_found(id)),
        }
    }

    pub fn toggle_rule(&self, id: &str, now: i64) -> Result<AlertRule, StoreError> {
        let mut inner = self.inner.write();
        let rule = inner
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| rule_not_found(id))?;

        rule.enabled = !rule.enabled;
        rule.updated_at = now;

        Ok(rule.clone())
    }

    /// Records matching the filter, newest first
    pub fn list_records(&self, filter: &RecordFilter) -> Vec<AlertRecord> {
        let mut records: Vec<AlertRecord> = self
            .inner
            .read()
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        records.sort_by(|a, b| b.fired_at.cmp(&a.fired_at));
        records
    }

    pub fn get_record(&self, id: &str) -> Result<AlertRecord, StoreError> {
        self.inner
            .read()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| record_not_found(id))
    }

    pub fn acknowledge(&self, id: &str, operator: &str, now: i64) -> Result<AlertRecord, StoreError> {
        self.update_record(id, |record| {
            if record.status != AlertStatus::Firing {
                return Err(StoreError::Conflict(format!(
                    "Alert '{}' is not firing",
                    record.id
                )));
            }

            record.status = AlertStatus::Acknowledged;
            record.acknowledged_at = Some(now);
            record.acknowledged_by = Some(operator.to_string());

            Ok(())
        })
    }

    pub fn resolve(&self, id: &str, now: i64) -> Result<AlertRecord, StoreError> {
        self.update_record(id, |record| {
            if !record.status.is_active() {
                return Err(StoreError::Conflict(format!(
                    "Alert '{}' is already resolved",
                    record.id
                )));
            }

            record.status = AlertStatus::Resolved;
            record.resolved_at = Some(now);

            Ok(())
        })
    }

    /// Store a newly fired alert
    pub fn insert_record(&self, record: AlertRecord) {
        self.inner.write().records.push(record);
    }

    pub fn add_notifications(&self, id: &str, attempts: Vec<NotificationAttempt>) {
        let mut inner = self.inner.write();

        if let Some(record) = inner.records.iter_mut().find(|r| r.id == id) {
            record.notifications_sent.extend(attempts);
        }
    }

    /// Ids of firing or acknowledged records by rule and target
    pub fn active_records(&self) -> HashMap<AlertKey, String> {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| r.status.is_active())
            .map(|r| ((r.rule_id.clone(), r.target.clone()), r.id.clone()))
            .collect()
    }

    pub fn list_channels(&self) -> Vec<NotificationChannel> {
        self.inner.read().channels.clone()
    }

    pub fn get_channel(&self, id: &str) -> Result<NotificationChannel, StoreError> {
        self.inner
            .read()
            .channels
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| channel_not_found(id))
    }

    pub fn create_channel(&self, channel: NewChannel, now: i64) -> Result<NotificationChannel, StoreError> {
        self.insert_channel(new_id("channel"), channel, now)
    }

    /// Insert a channel with a caller-chosen id, as declared in the config file
    pub fn insert_channel(
        &self,
        id: String,
        channel: NewChannel,
        now: i64,
    ) -> Result<NotificationChannel, StoreError> {
        validate_channel(&channel)?;

        let mut inner = self.inner.write();
        if inner.channels.iter().any(|c| c.id == id) {
            return Err(StoreError::Conflict(format!("Channel '{}' already exists", id)));
        }

        let channel = channel.into_channel(id, now, now);
        inner.channels.push(channel.clone());

        Ok(channel)
    }

    pub fn update_channel(
        &self,
        id: &str,
        channel: NewChannel,
        now: i64,
    ) -> Result<NotificationChannel, StoreError> {
        validate_channel(&channel)?;

        let mut inner = self.inner.write();
        let existing = inner
            .channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| channel_not_found(id))?;

        *existing = channel.into_channel(existing.id.clone(), existing.created_at, now);

        Ok(existing.clone())
    }

    pub fn delete_channel(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();

        if !inner.channels.iter().any(|c| c.id == id) {
            return Err(channel_not_found(id));
        }

        if let Some(rule) = inner
            .rules
            .iter()
            .find(|r| r.notification_channels.iter().any(|c| c == id))
        {
            return Err(StoreError::Conflict(format!(
                "Channel '{}' is used by rule '{}'",
                id, rule.name
            )));
        }

        inner.channels.retain(|c| c.id != id);

        Ok(())
    }

    pub fn toggle_channel(&self, id: &str, now: i64) -> Result<NotificationChannel, StoreError> {
        let mut inner = self.inner.write();
        let channel = inner
            .channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| channel_not_found(id))?;

        channel.enabled = !channel.enabled;
        channel.updated_at = now;

        Ok(channel.clone())
    }

    pub fn statistics(&self, now: i64) -> AlertStatistics {
        let inner = self.inner.read();
        let records = &inner.records;

        let count = |status: AlertStatus| records.iter().filter(|r| r.status == status).count();

        let mut by_severity: BTreeMap<AlertSeverity, usize> =
            AlertSeverity::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_metric: BTreeMap<AlertMetricType, usize> =
            AlertMetricType::ALL.iter().map(|m| (*m, 0)).collect();

        for record in records {
            *by_severity.entry(record.severity).or_default() += 1;
            *by_metric.entry(record.metric).or_default() += 1;
        }

        // Hourly buckets ending at `now`, oldest first
        let recent_trend = (0..24)
            .rev()
            .map(|i| {
                let end = now - i * HOUR_MS;
                let start = end - HOUR_MS;

                TrendBucket {
                    timestamp: end,
                    count: records
                        .iter()
                        .filter(|r| r.fired_at > start && r.fired_at <= end)
                        .count(),
                }
            })
            .collect();

        AlertStatistics {
            total: records.len(),
            firing: count(AlertStatus::Firing),
            resolved: count(AlertStatus::Resolved),
            acknowledged: count(AlertStatus::Acknowledged),
            by_severity,
            by_metric,
            recent_trend,
        }
    }

    fn update_record<F>(&self, id: &str, update: F) -> Result<AlertRecord, StoreError>
    where
        F: FnOnce(&mut AlertRecord) -> Result<(), StoreError>,
    {
        let mut inner = self.inner.write();
        let record = inner
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| record_not_found(id))?;

        update(record)?;

        Ok(record.clone())
    }
}

fn validate_rule(rule: &NewRule, channels: &[NotificationChannel]) -> Result<(), StoreError> {
    if rule.name.trim().is_empty() {
        return Err(StoreError::Invalid("Rule name is required".into()));
    }

    if rule.duration < 0 || rule.cooldown < 0 {
        return Err(StoreError::Invalid(
            "Duration and cooldown must not be negative".into(),
        ));
    }

    if let Some(unknown) = rule
        .notification_channels
        .iter()
        .find(|id| !channels.iter().any(|c| &c.id == *id))
    {
        return Err(StoreError::Invalid(format!(
            "Unknown notification channel '{}'",
            unknown
        )));
    }

    Ok(())
}

fn validate_channel(channel: &NewChannel) -> Result<(), StoreError> {
    if channel.name.trim().is_empty() {
        return Err(StoreError::Invalid("Channel name is required".into()));
    }

    if channel.config.channel_type() != channel.channel_type {
        return Err(StoreError::Invalid(format!(
            "Channel type '{}' does not match config type '{}'",
            channel.channel_type,
            channel.config.channel_type()
        )));
    }

    Ok(())
}

fn rule_not_found(id: &str) -> StoreError {
    StoreError::NotFound(format!("Rule '{}'", id))
}

fn record_not_found(id: &str) -> StoreError {
    StoreError::NotFound(format!("Alert '{}'", id))
}

fn channel_not_found(id: &str) -> StoreError {
    StoreError::NotFound(format!("Channel '{}'", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(channels: &[&str]) -> NewRule {
        serde_json::from_value(json!({
            "name": "Heap pressure",
            "metric": "node_heap",
            "operator": "gt",
            "threshold": 85,
            "duration": 180,
            "severity": "critical",
            "notificationChannels": channels,
            "cooldown": 300
        }))
        .unwrap()
    }

    fn internal_channel() -> NewChannel {
        serde_json::from_value(json!({
            "name": "Inbox",
            "type": "internal",
            "config": {"type": "internal", "broadcast": true}
        }))
        .unwrap()
    }

    fn record(id: &str, status: AlertStatus, fired_at: i64) -> AlertRecord {
        AlertRecord {
            id: id.to_string(),
            rule_id: "rule-1".into(),
            rule_name: "Heap pressure".into(),
            metric: AlertMetricType::NodeHeap,
            severity: AlertSeverity::Critical,
            status,
            message: "heap".into(),
            value: 90.0,
            threshold: 85.0,
            target: Some("es-node-01".into()),
            fired_at,
            resolved_at: None,
            acknowledged_at: None,
            acknowledged_by: None,
            notifications_sent: vec![],
        }
    }

    #[test]
    fn rule_lifecycle_keeps_id_and_created_at() {
        let store = AlertStore::new();
        store.insert_channel("ops".into(), internal_channel(), 1).unwrap();

        let created = store.create_rule(rule(&["ops"]), 10).unwrap();
        assert!(created.id.starts_with("rule-"));
        assert_eq!(created.created_at, 10);

        let mut changed = rule(&[]);
        changed.threshold = 90.0;
        let updated = store.update_rule(&created.id, changed, 20).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, 10);
        assert_eq!(updated.updated_at, 20);
        assert_eq!(updated.threshold, 90.0);

        let toggled = store.toggle_rule(&created.id, 30).unwrap();
        assert!(!toggled.enabled);

        store.delete_rule(&created.id).unwrap();
        assert_eq!(
            store.get_rule(&created.id),
            Err(StoreError::NotFound(format!("Rule '{}'", created.id)))
        );
    }

    #[test]
    fn rule_validation() {
        let store = AlertStore::new();

        let mut unnamed = rule(&[]);
        unnamed.name = "  ".into();
        assert!(matches!(store.create_rule(unnamed, 0), Err(StoreError::Invalid(_))));

        let mut negative = rule(&[]);
        negative.cooldown = -1;
        assert!(matches!(store.create_rule(negative, 0), Err(StoreError::Invalid(_))));

        let err = store.create_rule(rule(&["missing"]), 0).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn referenced_channel_cannot_be_deleted() {
        let store = AlertStore::new();
        store.insert_channel("ops".into(), internal_channel(), 1).unwrap();
        let rule = store.create_rule(rule(&["ops"]), 2).unwrap();

        assert!(matches!(store.delete_channel("ops"), Err(StoreError::Conflict(_))));

        store.delete_rule(&rule.id).unwrap();
        store.delete_channel("ops").unwrap();
        assert!(store.list_channels().is_empty());
    }

    #[test]
    fn channel_type_must_match_config() {
        let store = AlertStore::new();
        let mut channel = internal_channel();
        channel.channel_type = crate::alerting::channel::ChannelType::Email;

        assert!(matches!(store.create_channel(channel, 0), Err(StoreError::Invalid(_))));
    }

    #[test]
    fn acknowledge_only_from_firing_and_resolve_from_active() {
        let store = AlertStore::new();
        store.insert_record(record("a1", AlertStatus::Firing, 100));

        let acked = store.acknowledge("a1", "admin", 200).unwrap();
        assert_eq!(acked.status, AlertStatus::Acknowledged);
        assert_eq!(acked.acknowledged_by.as_deref(), Some("admin"));
        assert!(matches!(store.acknowledge("a1", "admin", 201), Err(StoreError::Conflict(_))));

        let resolved = store.resolve("a1", 300).unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert_eq!(resolved.resolved_at, Some(300));
        assert!(matches!(store.resolve("a1", 301), Err(StoreError::Conflict(_))));
        assert!(store.active_records().is_empty());
    }

    #[test]
    fn records_are_filtered_and_sorted_newest_first() {
        let store = AlertStore::new();
        store.insert_record(record("old", AlertStatus::Resolved, 100));
        store.insert_record(record("new", AlertStatus::Firing, 300));
        store.insert_record(record("mid", AlertStatus::Firing, 200));

        let all = store.list_records(&RecordFilter::default());
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        let firing = store.list_records(&RecordFilter {
            status: Some(AlertStatus::Firing),
            ..Default::default()
        });
        assert_eq!(firing.len(), 2);

        let other_rule = store.list_records(&RecordFilter {
            rule_id: Some("rule-2".into()),
            ..Default::default()
        });
        assert!(other_rule.is_empty());
    }

    #[test]
    fn statistics_are_zero_filled_with_hourly_trend() {
        let store = AlertStore::new();
        let now = 100 * HOUR_MS;
        store.insert_record(record("a", AlertStatus::Firing, now - 10));
        store.insert_record(record("b", AlertStatus::Resolved, now - HOUR_MS - 10));
        store.insert_record(record("c", AlertStatus::Acknowledged, now - 30 * HOUR_MS));

        let stats = store.statistics(now);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.firing, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.acknowledged, 1);
        assert_eq!(stats.by_severity[&AlertSeverity::Critical], 3);
        assert_eq!(stats.by_severity[&AlertSeverity::Info], 0);
        assert_eq!(stats.by_metric.len(), AlertMetricType::ALL.len());
        assert_eq!(stats.by_metric[&AlertMetricType::NodeHeap], 3);
        assert_eq!(stats.by_metric[&AlertMetricType::GcTime], 0);

        assert_eq!(stats.recent_trend.len(), 24);
        assert_eq!(stats.recent_trend[23], TrendBucket { timestamp: now, count: 1 });
        assert_eq!(stats.recent_trend[22].count, 1);
        assert_eq!(stats.recent_trend.iter().map(|b| b.count).sum::<usize>(), 2);
    }
}
