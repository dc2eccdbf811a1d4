use crate::{
    alerting::{
        notify::describe_value,
        record::{AlertRecord, AlertStatus},
        rule::AlertRule,
        sampler::Sample,
        store::AlertKey,
    },
    new_id,
};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Fire(AlertRecord),
    Resolve { record_id: String },
}

/// Tracks how long each rule and target has been in breach
#[derive(Debug, Default)]
pub struct Evaluator {
    breach_since: HashMap<AlertKey, i64>,
    last_fired: HashMap<AlertKey, i64>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare samples against the enabled rules.
    ///
    /// `active` maps rule and target to the id of its firing or acknowledged record.
    pub fn evaluate(
        &mut self,
        rules: &[AlertRule],
        samples: &[Sample],
        active: &HashMap<AlertKey, String>,
        now: i64,
    ) -> Vec<Transition> {
        let mut transitions = Vec::new();
        let mut seen = HashSet::new();

        for rule in rules.iter().filter(|r| r.enabled) {
            let matching = samples
                .iter()
                .filter(|s| s.metric == rule.metric && rule.applies_to(s.target.as_deref()));

            for sample in matching {
                let key: AlertKey = (rule.id.clone(), sample.target.clone());
                seen.insert(key.clone());

                if !rule.operator.holds(sample.value, rule.threshold) {
                    self.breach_since.remove(&key);

                    if let Some(record_id) = active.get(&key) {
                        transitions.push(Transition::Resolve {
                            record_id: record_id.clone(),
                        });
                    }
                    continue;
                }

                let since = *self.breach_since.entry(key.clone()).or_insert(now);

                if now - since < rule.duration.saturating_mul(1000) || active.contains_key(&key) {
                    continue;
                }

                let cooled_down = self
                    .last_fired
                    .get(&key)
                    .is_none_or(|last| now - last >= rule.cooldown.saturating_mul(1000));
                if !cooled_down {
                    continue;
                }

                self.last_fired.insert(key, now);
                transitions.push(Transition::Fire(fire(rule, sample, now)));
            }
        }

        // Drop state for rules that were disabled or deleted and targets that disappeared
        self.breach_since.retain(|key, _| seen.contains(key));

        transitions
    }
}

fn fire(rule: &AlertRule, sample: &Sample, now: i64) -> AlertRecord {
    let subject = match &sample.target {
        Some(target) => format!("{} {}", target, rule.metric.label()),
        None => capitalize(rule.metric.label()),
    };

    let message = format!(
        "{} is {} ({} {})",
        subject,
        describe_value(rule.metric, sample.value),
        rule.operator.symbol(),
        rule.threshold
    );

    AlertRecord {
        id: new_id("alert"),
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        metric: rule.metric,
        severity: rule.severity,
        status: AlertStatus::Firing,
        message,
        value: sample.value,
        threshold: rule.threshold,
        target: sample.target.clone(),
        fired_at: now,
        resolved_at: None,
        acknowledged_at: None,
        acknowledged_by: None,
        notifications_sent: Vec::new(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::rule::{AlertMetricType, AlertOperator, AlertSeverity};

    fn rule(duration: i64, cooldown: i64) -> AlertRule {
        AlertRule {
            id: "rule-1".into(),
            name: "CPU".into(),
            description: String::new(),
            enabled: true,
            metric: AlertMetricType::NodeCpu,
            operator: AlertOperator::Gt,
            threshold: 80.0,
            duration,
            severity: AlertSeverity::Warning,
            targets: vec![],
            notification_channels: vec![],
            cooldown,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn cpu(node: &str, value: f64) -> Sample {
        Sample {
            metric: AlertMetricType::NodeCpu,
            target: Some(node.into()),
            value,
        }
    }

    fn fired(transitions: &[Transition]) -> Vec<&AlertRecord> {
        transitions
            .iter()
            .filter_map(|t| match t {
                Transition::Fire(record) => Some(record),
                Transition::Resolve { .. } => None,
            })
            .collect()
    }

    #[test]
    fn fires_only_after_duration() {
        let mut evaluator = Evaluator::new();
        let rules = [rule(60, 0)];
        let none = HashMap::new();

        assert!(evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &none, 0).is_empty());
        assert!(evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &none, 59_000).is_empty());

        let transitions = evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &none, 60_000);
        let records = fired(&transitions);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target.as_deref(), Some("n1"));
        assert_eq!(records[0].status, AlertStatus::Firing);
        assert_eq!(records[0].message, "n1 CPU usage is 90.0% (> 80)");
    }

    #[test]
    fn recovery_resets_breach_and_resolves_active_record() {
        let mut evaluator = Evaluator::new();
        let rules = [rule(60, 0)];
        let none = HashMap::new();

        evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &none, 0);
        evaluator.evaluate(&rules, &[cpu("n1", 10.0)], &none, 30_000);
        assert!(evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &none, 70_000).is_empty());

        let active = HashMap::from([(("rule-1".to_string(), Some("n1".to_string())), "alert-9".to_string())]);
        let transitions = evaluator.evaluate(&rules, &[cpu("n1", 50.0)], &active, 80_000);
        assert_eq!(
            transitions,
            vec![Transition::Resolve {
                record_id: "alert-9".into()
            }]
        );
    }

    #[test]
    fn active_record_and_cooldown_suppress_refiring() {
        let mut evaluator = Evaluator::new();
        let rules = [rule(0, 300)];
        let none = HashMap::new();
        let active = HashMap::from([(("rule-1".to_string(), Some("n1".to_string())), "alert-1".to_string())]);

        assert_eq!(fired(&evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &none, 0)).len(), 1);
        assert!(evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &active, 10_000).is_empty());

        // Resolved elsewhere, but still inside the cooldown
        assert!(evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &none, 100_000).is_empty());
        assert_eq!(fired(&evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &none, 300_000)).len(), 1);
    }

    #[test]
    fn targets_and_disabled_rules_are_respected() {
        let mut evaluator = Evaluator::new();
        let mut targeted = rule(0, 0);
        targeted.targets = vec!["n2".into()];
        let mut disabled = rule(0, 0);
        disabled.id = "rule-2".into();
        disabled.enabled = false;

        let transitions = evaluator.evaluate(
            &[targeted, disabled],
            &[cpu("n1", 95.0), cpu("n2", 95.0)],
            &HashMap::new(),
            0,
        );

        let records = fired(&transitions);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rule_id, "rule-1");
        assert_eq!(records[0].target.as_deref(), Some("n2"));
    }

    #[test]
    fn cluster_level_message_is_capitalized() {
        let mut evaluator = Evaluator::new();
        let mut health = rule(0, 0);
        health.metric = AlertMetricType::ClusterHealth;
        health.operator = AlertOperator::Neq;
        health.threshold = 0.0;

        let sample = Sample {
            metric: AlertMetricType::ClusterHealth,
            target: None,
            value: 2.0,
        };
        let transitions = evaluator.evaluate(&[health], &[sample], &HashMap::new(), 0);

        assert_eq!(fired(&transitions)[0].message, "Cluster health is red (!= 0)");
    }

    #[test]
    fn huge_duration_and_cooldown_never_overflow() {
        let mut evaluator = Evaluator::new();
        let none = HashMap::new();

        let slow = [rule(i64::MAX / 100, 0)];
        assert!(evaluator.evaluate(&slow, &[cpu("n1", 90.0)], &none, 0).is_empty());
        assert!(evaluator.evaluate(&slow, &[cpu("n1", 90.0)], &none, 60_000).is_empty());

        let mut evaluator = Evaluator::new();
        let quiet = [rule(0, i64::MAX / 100)];
        assert_eq!(fired(&evaluator.evaluate(&quiet, &[cpu("n1", 90.0)], &none, 0)).len(), 1);
        assert!(evaluator.evaluate(&quiet, &[cpu("n1", 90.0)], &none, 86_400_000).is_empty());
    }

    #[test]
    fn vanished_target_keeps_its_record_and_restarts_its_breach() {
        let mut evaluator = Evaluator::new();
        let rules = [rule(60, 0)];
        let active = HashMap::from([(("rule-1".to_string(), Some("n1".to_string())), "alert-1".to_string())]);
        let none = HashMap::new();

        evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &none, 0);

        // n1 stops reporting: its firing record stays open
        assert!(evaluator.evaluate(&rules, &[cpu("n2", 10.0)], &active, 30_000).is_empty());

        // Back again, the breach window starts over
        assert!(evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &none, 70_000).is_empty());
        assert_eq!(fired(&evaluator.evaluate(&rules, &[cpu("n1", 90.0)], &none, 130_000)).len(), 1);
    }
}
