//! Reserved deployment attributes on Kubernetes components.
//!
//! ```yaml
//! components:
//!   - name: outerloop-deploy
//!     attributes:
//!       deployment/replicas: 2
//!       deployment/container-port: 8080
//!       deployment/cpuLimit: "1"
//!     kubernetes:
//!       uri: deploy.yaml
//! ```
//!
//! Keys are accepted with or without the `deployment/` prefix.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;
use std::collections::BTreeMap;

use super::model::Component;
use crate::api::{EnvVar, ResourceRequirements};
use crate::errors::{DetectionError, Result};

const PREFIX: &str = "deployment/";

pub const REPLICAS: &str = "replicas";
pub const REPLICA: &str = "replica";
pub const CONTAINER_PORT: &str = "container-port";
pub const CONTAINER_IMAGE_PORT: &str = "containerImage/port";
pub const ROUTE: &str = "route";
pub const CONTAINER_ENV: &str = "containerENV";

/// `(attribute, resource, is_limit)`
const QUANTITY_KEYS: [(&str, &str, bool); 6] = [
    ("cpuLimit", "cpu", true),
    ("cpuRequest", "cpu", false),
    ("memoryLimit", "memory", true),
    ("memoryRequest", "memory", false),
    ("storageLimit", "storage", true),
    ("storageRequest", "storage", false),
];

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    // Decimal SI, binary SI and exponent suffixes, e.g. 500m, 1.5Gi, 1e3.
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)(m|k|M|G|T|P|E|Ki|Mi|Gi|Ti|Pi|Ei|[eE][+-]?\d+)?$")
        .unwrap()
});

/// Whether `value` is a Kubernetes resource quantity.
pub fn is_quantity(value: &str) -> bool {
    QUANTITY.is_match(value.trim())
}

/// Deployment settings read from a component's attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployAttributes {
    pub replicas: Option<i32>,
    pub port: Option<i32>,
    pub route: Option<String>,
    pub env: Vec<EnvVar>,
    pub resources: ResourceRequirements,
}

fn lookup<'a>(attributes: &'a BTreeMap<String, Value>, key: &str) -> Option<&'a Value> {
    attributes
        .get(&format!("{PREFIX}{key}"))
        .or_else(|| attributes.get(key))
}

fn as_int(value: &Value, key: &str) -> Result<i32> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| {
            DetectionError::invalid_devfile(format!(
                "attribute {key} must be an integer, got {}",
                render(value)
            ))
        })
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn render(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_default()
}

/// Read the reserved attributes from `component`.
pub fn read_deploy_attributes(component: &Component) -> Result<DeployAttributes> {
    let attributes = &component.attributes;
    let mut out = DeployAttributes::default();

    if let Some(value) = lookup(attributes, REPLICAS).or_else(|| lookup(attributes, REPLICA)) {
        out.replicas = Some(as_int(value, REPLICAS)?);
    }

    if let Some(value) =
        lookup(attributes, CONTAINER_PORT).or_else(|| lookup(attributes, CONTAINER_IMAGE_PORT))
    {
        out.port = Some(as_int(value, CONTAINER_PORT)?);
    } else if let Some(endpoint) = component
        .kubernetes
        .as_ref()
        .and_then(|k| k.endpoints.first())
    {
        out.port = Some(i32::from(endpoint.target_port));
    }

    out.route = lookup(attributes, ROUTE)
        .and_then(as_string)
        .filter(|r| !r.is_empty());

    if let Some(value) = lookup(attributes, CONTAINER_ENV) {
        out.env = serde_yaml::from_value(value.clone()).map_err(|e| {
            DetectionError::invalid_devfile(format!("attribute {CONTAINER_ENV} is malformed: {e}"))
        })?;
    }

    for (key, resource, is_limit) in QUANTITY_KEYS {
        let Some(value) = lookup(attributes, key) else {
            continue;
        };
        let quantity = as_string(value).unwrap_or_default();
        if !is_quantity(&quantity) {
            return Err(DetectionError::invalid_devfile(format!(
                "attribute {key} has invalid quantity {}",
                render(value)
            )));
        }
        let target = if is_limit {
            &mut out.resources.limits
        } else {
            &mut out.resources.requests
        };
        target.insert(resource.to_string(), quantity.trim().to_string());
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn component(yaml: &str) -> Component {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_reads_all_reserved_keys() {
        let c = component(indoc! {r#"
            name: deploy
            attributes:
              deployment/replicas: 3
              deployment/container-port: "8081"
              deployment/route: my-route
              deployment/containerENV:
                - name: FOO
                  value: bar
              deployment/cpuLimit: "2"
              deployment/cpuRequest: 700m
              deployment/memoryLimit: 500Mi
              deployment/memoryRequest: 400Mi
              deployment/storageLimit: 400Mi
              deployment/storageRequest: 200Mi
            kubernetes:
              uri: deploy.yaml
        "#});
        let attrs = read_deploy_attributes(&c).unwrap();
        assert_eq!(attrs.replicas, Some(3));
        assert_eq!(attrs.port, Some(8081));
        assert_eq!(attrs.route.as_deref(), Some("my-route"));
        assert_eq!(attrs.env, vec![EnvVar { name: "FOO".into(), value: "bar".into() }]);
        assert_eq!(attrs.resources.limits["cpu"], "2");
        assert_eq!(attrs.resources.requests["cpu"], "700m");
        assert_eq!(attrs.resources.limits["memory"], "500Mi");
        assert_eq!(attrs.resources.requests["storage"], "200Mi");
    }

    #[test]
    fn test_unprefixed_and_singular_keys() {
        let c = component(indoc! {r#"
            name: deploy
            attributes:
              replica: "2"
              containerImage/port: 3000
            kubernetes:
              inlined: "kind: Deployment"
        "#});
        let attrs = read_deploy_attributes(&c).unwrap();
        assert_eq!(attrs.replicas, Some(2));
        assert_eq!(attrs.port, Some(3000));
    }

    #[test]
    fn test_missing_keys_are_none() {
        let c = component("name: deploy\nkubernetes:\n  uri: d.yaml\n");
        let attrs = read_deploy_attributes(&c).unwrap();
        assert_eq!(attrs, DeployAttributes::default());
    }

    #[test]
    fn test_endpoint_port_is_fallback() {
        let c = component(indoc! {r#"
            name: deploy
            kubernetes:
              uri: d.yaml
              endpoints:
                - name: http
                  targetPort: 9090
        "#});
        assert_eq!(read_deploy_attributes(&c).unwrap().port, Some(9090));
    }

    #[test]
    fn test_invalid_quantity_is_rejected() {
        let c = component(indoc! {r#"
            name: deploy
            attributes:
              deployment/memoryLimit: lots
            kubernetes:
              uri: d.yaml
        "#});
        let err = read_deploy_attributes(&c).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidDevfile { .. }));
        assert!(err.to_string().contains("memoryLimit"));
    }

    #[test]
    fn test_non_numeric_replicas_is_rejected() {
        let c = component(indoc! {r#"
            name: deploy
            attributes:
              deployment/replicas: many
            kubernetes:
              uri: d.yaml
        "#});
        assert!(read_deploy_attributes(&c).is_err());
    }

    #[test]
    fn test_quantity_grammar() {
        for ok in ["1", "0.5", "500m", "1Gi", "1.5G", "1e3", "+2", ".5"] {
            assert!(is_quantity(ok), "{ok} should be a quantity");
        }
        for bad in ["", "lots", "1GB", "m", "1 Gi"] {
            assert!(!is_quantity(bad), "{bad} should not be a quantity");
        }
    }
}
