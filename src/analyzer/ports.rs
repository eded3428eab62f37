//! Port detection from configuration files and source literals.

use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

use super::languages::Language;

/// Source files larger than this are skipped.
const MAX_SOURCE_BYTES: u64 = 256 * 1024;
const MAX_SOURCE_FILES: usize = 200;
const SOURCE_DEPTH: usize = 3;

static EXPOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?mi)^\s*EXPOSE\s+(.+)$").unwrap());
static EXPOSE_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)(/(tcp|udp))?$").unwrap());
static ENV_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*PORT\s*=\s*(\d+)").unwrap());
static SERVER_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(server\.port|quarkus\.http\.port)\s*[=:]\s*(\d+)").unwrap());
static SCRIPT_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(--port[= ]|PORT=)(\d+)").unwrap());
static JS_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\.listen\(\s*(\d{2,5})|PORT\s*\|\|\s*(\d{2,5}))").unwrap()
});
static GO_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"":(\d{2,5})""#).unwrap());
static PY_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"port\s*=\s*(\d{2,5})").unwrap());

const SPRING_CONFIG_DIRS: [&str; 2] = ["", "src/main/resources"];

fn push_port(ports: &mut BTreeSet<u16>, raw: &str) {
    if let Ok(port) = raw.parse::<u16>() {
        if port != 0 {
            ports.insert(port);
        }
    }
}

fn read(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

/// Ports from `EXPOSE` lines.
pub fn ports_from_dockerfile(content: &str) -> Vec<u16> {
    let mut ports = BTreeSet::new();
    for caps in EXPOSE.captures_iter(content) {
        for token in caps[1].split_whitespace() {
            if let Some(port) = EXPOSE_PORT.captures(token) {
                push_port(&mut ports, &port[1]);
            }
        }
    }
    ports.into_iter().collect()
}

fn ports_from_spring_yaml(content: &str, ports: &mut BTreeSet<u16>) {
    let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(content) else {
        return;
    };
    for (section, key) in [("server", "port"), ("quarkus", "http")] {
        let mut node = &value[section][key];
        if key == "http" {
            node = &node["port"];
        }
        match node {
            serde_yaml::Value::Number(n) => push_port(ports, &n.to_string()),
            serde_yaml::Value::String(s) => push_port(ports, s.trim()),
            _ => {}
        }
    }
}

fn ports_from_package_json(content: &str, ports: &mut BTreeSet<u16>) {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(content) else {
        return;
    };
    if let Some(scripts) = json.get("scripts").and_then(|s| s.as_object()) {
        for script in scripts.values().filter_map(|v| v.as_str()) {
            for caps in SCRIPT_PORT.captures_iter(script) {
                push_port(ports, &caps[2]);
            }
        }
    }
}

fn ports_from_sources(dir: &Path, language: Language, ports: &mut BTreeSet<u16>) {
    let extensions = language.source_extensions();
    if extensions.is_empty() {
        return;
    }
    let regex: &Regex = match language {
        Language::Go => &GO_LITERAL,
        Language::Python => &PY_LITERAL,
        _ => &JS_LITERAL,
    };

    let walker = WalkBuilder::new(dir)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .max_depth(Some(SOURCE_DEPTH))
        .filter_entry(|e| !super::is_skipped_dir(e))
        .build();

    let files = walker
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.contains(&ext))
        })
        .filter(|e| e.metadata().is_ok_and(|m| m.len() <= MAX_SOURCE_BYTES))
        .take(MAX_SOURCE_FILES);

    for entry in files {
        let Some(content) = read(entry.path()) else {
            continue;
        };
        for caps in regex.captures_iter(&content) {
            if let Some(port) = caps.iter().skip(2).flatten().next().or_else(|| caps.get(1)) {
                push_port(ports, port.as_str());
            }
        }
    }
}

fn common_ports(dir: &Path, ports: &mut BTreeSet<u16>) {
    for name in ["Dockerfile", "Containerfile"] {
        if let Some(content) = read(&dir.join(name)) {
            ports.extend(ports_from_dockerfile(&content));
        }
    }

    if let Some(content) = read(&dir.join(".env")) {
        for caps in ENV_PORT.captures_iter(&content) {
            push_port(ports, &caps[1]);
        }
    }
}

/// Ports declared by a Dockerfile/Containerfile or `.env` in `dir`, for
/// directories without a recognised manifest.
pub fn detect_common_ports(dir: &Path) -> Vec<u16> {
    let mut ports = BTreeSet::new();
    common_ports(dir, &mut ports);
    ports.into_iter().collect()
}

/// Ports a project in `dir` listens on, sorted and deduplicated.
pub fn detect_ports(dir: &Path, language: Language) -> Vec<u16> {
    let mut ports = BTreeSet::new();
    common_ports(dir, &mut ports);

    if language == Language::Java {
        for sub in SPRING_CONFIG_DIRS {
            let base = if sub.is_empty() { dir.to_path_buf() } else { dir.join(sub) };
            if let Some(content) = read(&base.join("application.properties")) {
                for caps in SERVER_PORT.captures_iter(&content) {
                    push_port(&mut ports, &caps[2]);
                }
            }
            for name in ["application.yml", "application.yaml"] {
                if let Some(content) = read(&base.join(name)) {
                    ports_from_spring_yaml(&content, &mut ports);
                }
            }
        }
    }

    if matches!(language, Language::JavaScript | Language::TypeScript) {
        if let Some(content) = read(&dir.join("package.json")) {
            ports_from_package_json(&content, &mut ports);
        }
    }

    ports_from_sources(dir, language, &mut ports);
    ports.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_expose_lines() {
        let dockerfile = indoc! {"
            FROM node:18
            EXPOSE 8080 9090/tcp
            expose 3000/udp
            EXPOSE $PORT
        "};
        assert_eq!(ports_from_dockerfile(dockerfile), vec![3000, 8080, 9090]);
    }

    #[test]
    fn test_out_of_range_ports_are_dropped() {
        assert_eq!(ports_from_dockerfile("EXPOSE 0 70000 443"), vec![443]);
    }

    #[test]
    fn test_common_ports_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Containerfile"), "FROM ubi9\nEXPOSE 8443\n").unwrap();
        std::fs::write(dir.path().join(".env"), "PORT=3001\n").unwrap();
        assert_eq!(detect_common_ports(dir.path()), vec![3001, 8443]);
    }

    #[test]
    fn test_spring_and_quarkus_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let resources = dir.path().join("src/main/resources");
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::write(resources.join("application.properties"), "server.port=8081\n").unwrap();
        std::fs::write(
            dir.path().join("application.yaml"),
            "quarkus:\n  http:\n    port: 8082\n",
        )
        .unwrap();
        assert_eq!(detect_ports(dir.path(), Language::Java), vec![8081, 8082]);
    }

    #[test]
    fn test_node_sources_and_scripts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"scripts":{"start":"node server.js --port 4000"}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("server.js"),
            "const port = process.env.PORT || 8080;\napp.listen(port);\n",
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/x")).unwrap();
        std::fs::write(dir.path().join("node_modules/x/index.js"), "app.listen(1234)").unwrap();

        assert_eq!(detect_ports(dir.path(), Language::JavaScript), vec![4000, 8080]);
    }

    #[test]
    fn test_go_and_python_literals() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.go"), r#"http.ListenAndServe(":8088", nil)"#).unwrap();
        assert_eq!(detect_ports(dir.path(), Language::Go), vec![8088]);

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "PORT=5001\n").unwrap();
        std::fs::write(dir.path().join("app.py"), "app.run(host='0.0.0.0', port=5000)").unwrap();
        assert_eq!(detect_ports(dir.path(), Language::Python), vec![5000, 5001]);
    }
}
