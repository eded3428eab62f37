use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use tokio_util::sync::CancellationToken;

use crate::api::{ComponentDetectionDescription, GitSource};
use crate::cli::OutputFormat;
use crate::config::ControllerConfig;
use crate::engine::{DetectionEngine, DetectionRequest};
use crate::forge::{Credential, TokenPool};
use crate::scanner::ScanResult;
use crate::stub::NoExistingComponents;

/// Credential name used for `--token`.
const CLI_TOKEN_NAME: &str = "cli";

pub struct DetectArgs {
    pub git_source: GitSource,
    pub token: Option<String>,
    pub generate_name: bool,
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectReport {
    pub url: String,
    pub revision: String,
    pub message: String,
    pub component_detected: BTreeMap<String, ComponentDetectionDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanResult>,
}

/// Run one detection without a cluster and print the report.
pub async fn detect(config: &ControllerConfig, args: DetectArgs, out: &mut impl Write) -> Result<()> {
    let engine = DetectionEngine::from_config(config)?;
    let credential = match args.token.filter(|t| !t.trim().is_empty()) {
        Some(token) => Credential::from_secret(CLI_TOKEN_NAME, token),
        None => TokenPool::new(config.default_token.clone(), config.tokens.clone()).credential(),
    };

    let request = DetectionRequest {
        git_source: args.git_source,
        credential,
        namespace: String::new(),
        label: "detect".to_string(),
        generate_component_name: args.generate_name,
    };

    let report = match engine
        .detect(&request, &NoExistingComponents, &CancellationToken::new())
        .await
    {
        Ok(outcome) => DetectReport {
            url: outcome.url,
            revision: outcome.revision,
            message: format!("{} component(s) detected", outcome.components.len()),
            component_detected: outcome.components,
            scan: Some(outcome.scan),
        },
        Err(e) if e.is_terminal_success() => DetectReport {
            url: request.git_source.url.trim().to_string(),
            revision: request.git_source.revision.clone(),
            message: e.to_string(),
            component_detected: BTreeMap::new(),
            scan: None,
        },
        Err(e) => return Err(anyhow::anyhow!("[{}] {}", e.code(), e)),
    };

    write_report(&report, args.format, out)
}

pub fn write_report(report: &DetectReport, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
        OutputFormat::Yaml => serde_yaml::to_writer(&mut *out, report)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_report_shape() {
        let report = DetectReport {
            url: "https://github.com/o/r".into(),
            revision: "main".into(),
            message: "no components detected in https://github.com/o/r".into(),
            component_detected: BTreeMap::new(),
            scan: None,
        };
        let mut out = Vec::new();
        write_report(&report, OutputFormat::Json, &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["revision"], "main");
        assert!(value["componentDetected"].as_object().unwrap().is_empty());
        assert!(value.get("scan").is_none());
    }
}
