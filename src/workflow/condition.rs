use crate::kibana::ProxyResponse;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^response\.status\s*===\s*(\d{3})$").expect("valid status condition regex")
});
static EMPTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^response\.([A-Za-z0-9_.]+)\.length\s*===\s*0$").expect("valid length condition regex")
});
static FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^response\.([A-Za-z0-9_.]+)\s*===\s*(true|false)$").expect("valid flag condition regex")
});

/// Decides whether a proxied response counts as a successful step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessCondition {
    Status(u16),
    Flag { path: Vec<String>, expected: bool },
    Empty { path: Vec<String> },
    Always,
    Http2xx,
}

impl SuccessCondition {
    pub fn parse(condition: Option<&str>) -> Self {
        let Some(condition) = condition.map(str::trim) else {
            return SuccessCondition::Http2xx;
        };

        if condition == "true" {
            return SuccessCondition::Always;
        }

        if let Some(status) = STATUS
            .captures(condition)
            .and_then(|c| c[1].parse().ok())
        {
            return SuccessCondition::Status(status);
        }

        if let Some(captures) = EMPTY.captures(condition) {
            return SuccessCondition::Empty {
                path: split_path(&captures[1]),
            };
        }

        if let Some(captures) = FLAG.captures(condition) {
            return SuccessCondition::Flag {
                path: split_path(&captures[1]),
                expected: &captures[2] == "true",
            };
        }

        tracing::debug!("Unrecognised success condition '{}', requiring 2xx", condition);

        SuccessCondition::Http2xx
    }

    pub fn check(&self, response: &ProxyResponse) -> bool {
        match self {
            SuccessCondition::Status(status) => response.status == *status,
            SuccessCondition::Flag { path, expected } => {
                lookup(&response.body, path).and_then(Value::as_bool) == Some(*expected)
            }
            SuccessCondition::Empty { path } => lookup(&response.body, path)
                .and_then(Value::as_array)
                .is_some_and(|items| items.is_empty()),
            SuccessCondition::Always => true,
            SuccessCondition::Http2xx => response.is_success(),
        }
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

fn lookup<'a>(body: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(body, |value, key| value.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: Value) -> ProxyResponse {
        ProxyResponse {
            status,
            duration_ms: 3,
            body,
        }
    }

    #[test]
    fn parses_known_forms() {
        assert_eq!(
            SuccessCondition::parse(Some("response.status === 200")),
            SuccessCondition::Status(200)
        );
        assert_eq!(
            SuccessCondition::parse(Some("response.acknowledged === true")),
            SuccessCondition::Flag {
                path: vec!["acknowledged".into()],
                expected: true
            }
        );
        assert_eq!(
            SuccessCondition::parse(Some("response.failures.length === 0")),
            SuccessCondition::Empty {
                path: vec!["failures".into()]
            }
        );
        assert_eq!(SuccessCondition::parse(Some("true")), SuccessCondition::Always);
        assert_eq!(SuccessCondition::parse(Some("anything else")), SuccessCondition::Http2xx);
        assert_eq!(SuccessCondition::parse(None), SuccessCondition::Http2xx);
    }

    #[test]
    fn checks_proxied_responses() {
        let acknowledged = SuccessCondition::parse(Some("response.acknowledged === true"));
        let no_failures = SuccessCondition::parse(Some("response.failures.length === 0"));

        assert!(acknowledged.check(&response(200, json!({"acknowledged": true}))));
        assert!(!acknowledged.check(&response(200, json!({"acknowledged": false}))));
        assert!(!acknowledged.check(&response(400, json!({"error": "boom"}))));

        assert!(no_failures.check(&response(200, json!({"failures": []}))));
        assert!(!no_failures.check(&response(200, json!({"failures": [{"id": "1"}]}))));
        assert!(!no_failures.check(&response(200, json!({}))));

        assert!(SuccessCondition::Http2xx.check(&response(201, json!(null))));
        assert!(!SuccessCondition::Http2xx.check(&response(404, json!(null))));
        assert!(SuccessCondition::Status(200).check(&response(200, json!({}))));
        assert!(!SuccessCondition::Status(200).check(&response(201, json!({}))));
    }

    #[test]
    fn nested_paths() {
        let condition = SuccessCondition::parse(Some("response.snapshot.accepted === true"));

        assert!(condition.check(&response(200, json!({"snapshot": {"accepted": true}}))));
    }
}
