//! Condition transitions of a CDQ.

use std::collections::BTreeMap;

use crate::api::{
    set_condition, Condition, ComponentDetectionDescription, ComponentDetectionQueryStatus, ConditionStatus,
    CONDITION_COMPLETED, CONDITION_PROCESSING,
};
use crate::errors::DetectionError;

pub const REASON_PROCESSING: &str = "Processing";
pub const REASON_OK: &str = "OK";
pub const REASON_ERROR: &str = "Error";

pub const MESSAGE_PROCESSING: &str = "Checking to see if a component can be detected";
pub const MESSAGE_SUCCESS: &str = "ComponentDetectionQuery has successfully finished";
pub const MESSAGE_NO_COMPONENTS: &str =
    "ComponentDetectionQuery has successfully finished, no components detected";
pub const MESSAGE_FAILED_PREFIX: &str = "ComponentDetectionQuery failed";

pub fn mark_processing(status: &mut ComponentDetectionQueryStatus, generation: Option<i64>) {
    set_condition(
        &mut status.conditions,
        Condition::new(CONDITION_PROCESSING, ConditionStatus::True, REASON_PROCESSING, MESSAGE_PROCESSING)
            .observed_at(generation),
    );
}

/// Terminal success; an empty map means nothing was detected.
pub fn mark_completed(
    status: &mut ComponentDetectionQueryStatus,
    detected: BTreeMap<String, ComponentDetectionDescription>,
    generation: Option<i64>,
) {
    let message = if detected.is_empty() {
        MESSAGE_NO_COMPONENTS
    } else {
        MESSAGE_SUCCESS
    };
    status.component_detected = detected;
    set_condition(
        &mut status.conditions,
        Condition::new(CONDITION_COMPLETED, ConditionStatus::True, REASON_OK, message).observed_at(generation),
    );
}

pub fn mark_failed(status: &mut ComponentDetectionQueryStatus, error: &DetectionError, generation: Option<i64>) {
    status.component_detected.clear();
    set_condition(
        &mut status.conditions,
        Condition::new(
            CONDITION_COMPLETED,
            ConditionStatus::False,
            REASON_ERROR,
            format!("{MESSAGE_FAILED_PREFIX}: {error}"),
        )
        .observed_at(generation),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::find_condition;

    #[test]
    fn test_processing_then_completed_keeps_order() {
        let mut status = ComponentDetectionQueryStatus::default();
        mark_processing(&mut status, Some(4));
        mark_completed(&mut status, BTreeMap::new(), Some(4));

        let types: Vec<_> = status.conditions.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(types, vec![CONDITION_PROCESSING, CONDITION_COMPLETED]);
        let completed = status.completed().unwrap();
        assert_eq!(completed.reason, REASON_OK);
        assert!(completed.message.ends_with("no components detected"));
        assert_eq!(completed.observed_generation, Some(4));
    }

    #[test]
    fn test_failure_message_carries_error() {
        let mut status = ComponentDetectionQueryStatus::default();
        mark_failed(&mut status, &DetectionError::invalid_spec("invalid URL escape \"%U%\""), None);

        let completed = find_condition(&status.conditions, CONDITION_COMPLETED).unwrap();
        assert_eq!(completed.status, ConditionStatus::False);
        assert_eq!(
            completed.message,
            "ComponentDetectionQuery failed: invalid URL escape \"%U%\""
        );
    }
}
