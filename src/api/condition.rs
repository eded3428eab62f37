//! Status conditions shared by every resource kind.

use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One observation about a resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition, e.g. `Processing` or `Completed`
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    /// RFC3339 timestamp of the last status change
    pub last_transition_time: String,
    /// `metadata.generation` this condition was computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: now_rfc3339(),
            observed_generation: None,
        }
    }

    pub fn observed_at(mut self, generation: Option<i64>) -> Self {
        self.observed_generation = generation;
        self
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Insert or update a condition by type.
///
/// Conditions keep their insertion order. The transition time only moves
/// when the status actually changes.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status != condition.status {
                existing.last_transition_time = condition.last_transition_time;
            }
            existing.status = condition.status;
            existing.reason = condition.reason;
            existing.message = condition.message;
            existing.observed_generation = condition.observed_generation;
        }
        None => conditions.push(condition),
    }
}

pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_condition_appends_new_types_in_order() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            Condition::new("Processing", ConditionStatus::True, "Processing", "busy"),
        );
        set_condition(
            &mut conditions,
            Condition::new("Completed", ConditionStatus::True, "OK", "done"),
        );

        let types: Vec<_> = conditions.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(types, vec!["Processing", "Completed"]);
    }

    #[test]
    fn test_set_condition_keeps_transition_time_when_status_unchanged() {
        let mut first = Condition::new("Completed", ConditionStatus::False, "Error", "a");
        first.last_transition_time = "2020-01-01T00:00:00Z".into();
        let mut conditions = vec![first];

        set_condition(
            &mut conditions,
            Condition::new("Completed", ConditionStatus::False, "Error", "b"),
        );
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].message, "b");
        assert_eq!(conditions[0].last_transition_time, "2020-01-01T00:00:00Z");

        set_condition(
            &mut conditions,
            Condition::new("Completed", ConditionStatus::True, "OK", "c"),
        );
        assert_ne!(conditions[0].last_transition_time, "2020-01-01T00:00:00Z");
    }

    #[test]
    fn test_condition_serializes_with_kubernetes_field_names() {
        let condition = Condition::new("Completed", ConditionStatus::True, "OK", "done");
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["type"], "Completed");
        assert_eq!(json["status"], "True");
        assert!(json["lastTransitionTime"].is_string());
        assert!(json.get("observedGeneration").is_none());

        let observed = serde_json::to_value(condition.observed_at(Some(3))).unwrap();
        assert_eq!(observed["observedGeneration"], 3);
    }
}
