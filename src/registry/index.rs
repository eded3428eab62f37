//! Devfile registry index and sample ranking.

use serde::Deserialize;

use crate::errors::{DetectionError, Result};

/// Stack names that also serve JavaScript and TypeScript projects.
const NODE_ALIASES: [&str; 2] = ["nodejs", "node.js"];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub project_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Links {
    #[serde(default, rename = "self")]
    pub self_link: Option<String>,
    #[serde(default)]
    pub devfile: Option<String>,
    #[serde(default)]
    pub dockerfile: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IndexDocument {
    Wrapped { devfiles: Vec<RegistryEntry> },
    Bare(Vec<RegistryEntry>),
}

/// The registry's sample list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryIndex {
    pub entries: Vec<RegistryEntry>,
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

impl RegistryIndex {
    /// Decode either `{"devfiles": [...]}` or a bare array.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let doc: IndexDocument = serde_json::from_slice(bytes).map_err(|e| {
            DetectionError::internal(format!("failed to decode devfile registry index: {e}"))
        })?;
        let entries = match doc {
            IndexDocument::Wrapped { devfiles } => devfiles,
            IndexDocument::Bare(entries) => entries,
        };
        Ok(Self { entries })
    }

    /// Best sample for a language and optional framework.
    ///
    /// Candidates must match the language case-insensitively. Ties are
    /// broken by exact-case language, then framework, then name.
    pub fn best_match(&self, language: &str, framework: Option<&str>) -> Option<&RegistryEntry> {
        let wanted = language.trim();
        if wanted.is_empty() {
            return None;
        }
        let framework = framework.map(normalize).filter(|f| !f.is_empty());

        let mut candidates: Vec<(&RegistryEntry, bool, bool)> = self
            .entries
            .iter()
            .filter(|e| language_matches(e, wanted))
            .map(|e| {
                let exact = e.language == wanted;
                let framework_hit = framework.as_ref().is_some_and(|f| {
                    normalize(&e.project_type) == *f || e.tags.iter().any(|t| normalize(t) == *f)
                });
                (e, exact, framework_hit)
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then(b.2.cmp(&a.2))
                .then_with(|| a.0.name.cmp(&b.0.name))
        });
        candidates.first().map(|(e, _, _)| *e)
    }
}

fn language_matches(entry: &RegistryEntry, wanted: &str) -> bool {
    if entry.language.eq_ignore_ascii_case(wanted) {
        return true;
    }
    let is_node_family =
        wanted.eq_ignore_ascii_case("javascript") || wanted.eq_ignore_ascii_case("typescript");
    is_node_family
        && (NODE_ALIASES
            .iter()
            .any(|alias| entry.language.eq_ignore_ascii_case(alias) || entry.name.eq_ignore_ascii_case(alias))
            || entry
                .tags
                .iter()
                .any(|t| NODE_ALIASES.iter().any(|alias| t.eq_ignore_ascii_case(alias))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index() -> RegistryIndex {
        let doc = json!({
            "devfiles": [
                {"name": "java-quarkus", "language": "Java", "projectType": "Quarkus"},
                {"name": "java-springboot", "language": "Java", "projectType": "springboot",
                 "links": {"devfile": "https://reg/devfiles/java-springboot"}},
                {"name": "java-maven", "language": "java", "projectType": "Maven"},
                {"name": "nodejs-basic", "language": "nodejs", "projectType": "Node.js", "tags": ["Express"]},
                {"name": "python-basic", "language": "Python", "projectType": "Python"},
                {"name": "python-django", "language": "Python", "projectType": "Django"}
            ]
        });
        RegistryIndex::from_json(doc.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_bare_array_index() {
        let idx = RegistryIndex::from_json(br#"[{"name":"go","language":"Go"}]"#).unwrap();
        assert_eq!(idx.entries.len(), 1);
        assert_eq!(idx.best_match("go", None).unwrap().name, "go");
    }

    #[test]
    fn test_invalid_index_is_error() {
        assert!(RegistryIndex::from_json(b"<html>").is_err());
    }

    #[test]
    fn test_framework_decides_between_same_language() {
        let idx = index();
        assert_eq!(idx.best_match("Java", Some("springboot")).unwrap().name, "java-springboot");
        assert_eq!(idx.best_match("Python", Some("Django")).unwrap().name, "python-django");
    }

    #[test]
    fn test_name_breaks_ties_and_exact_case_wins() {
        let idx = index();
        // java-maven is lowercase "java" so exact-case entries come first.
        assert_eq!(idx.best_match("Java", None).unwrap().name, "java-quarkus");
        assert_eq!(idx.best_match("java", None).unwrap().name, "java-maven");
        assert_eq!(idx.best_match("Python", None).unwrap().name, "python-basic");
    }

    #[test]
    fn test_typescript_matches_node_stack() {
        let idx = index();
        assert_eq!(idx.best_match("TypeScript", None).unwrap().name, "nodejs-basic");
        assert_eq!(
            idx.best_match("JavaScript", Some("Express")).unwrap().name,
            "nodejs-basic"
        );
    }

    #[test]
    fn test_unknown_language_has_no_match() {
        assert!(index().best_match("COBOL", None).is_none());
        assert!(index().best_match("", None).is_none());
    }
}
