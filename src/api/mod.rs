//! Custom resource types (`appstudio.redhat.com/v1alpha1`).

pub mod application;
pub mod cdq;
pub mod component;
pub mod condition;

pub use application::{Application, ApplicationSpec, ApplicationStatus, RepositoryRef};
pub use cdq::{
    ComponentDetectionDescription, ComponentDetectionQuery, ComponentDetectionQuerySpec,
    ComponentDetectionQueryStatus, CONDITION_COMPLETED, CONDITION_PROCESSING,
};
pub use component::{
    Component, ComponentSource, ComponentSpec, ComponentStatus, EnvVar, GitSource,
    ResourceRequirements, PLACEHOLDER_APPLICATION,
};
pub use condition::{find_condition, set_condition, Condition, ConditionStatus};

use kube::CustomResourceExt;

/// Every CRD served by this project, as a multi-document YAML stream.
pub fn crds_yaml() -> Result<String, serde_yaml::Error> {
    let crds = [
        Application::crd(),
        Component::crd(),
        ComponentDetectionQuery::crd(),
    ];
    let mut out = String::new();
    for crd in &crds {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(crd)?);
    }
    Ok(out)
}
