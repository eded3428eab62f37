use serde::Serialize;
use std::path::Path;

/// Languages recognised from build manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Language {
    Java,
    DotNet,
    Go,
    Python,
    Rust,
    Php,
    Ruby,
    JavaScript,
    TypeScript,
}

impl Language {
    /// Language whose manifest is named `file_name`.
    pub fn from_manifest(file_name: &str) -> Option<Self> {
        static MANIFEST_MAP: &[(&[&str], Language)] = &[
            (&["pom.xml", "build.gradle", "build.gradle.kts"], Language::Java),
            (&["go.mod"], Language::Go),
            (
                &["requirements.txt", "pyproject.toml", "setup.py", "Pipfile"],
                Language::Python,
            ),
            (&["Cargo.toml"], Language::Rust),
            (&["composer.json"], Language::Php),
            (&["Gemfile"], Language::Ruby),
            (&["package.json"], Language::JavaScript),
        ];

        if file_name.ends_with(".csproj") || file_name.ends_with(".fsproj") {
            return Some(Language::DotNet);
        }
        MANIFEST_MAP
            .iter()
            .find(|(names, _)| names.contains(&file_name))
            .map(|(_, lang)| *lang)
    }

    /// When several manifests share a directory, the lowest rank wins.
    /// `package.json` is often auxiliary, so JavaScript ranks last.
    pub fn rank(self) -> u8 {
        match self {
            Language::Java => 0,
            Language::DotNet => 1,
            Language::Go => 2,
            Language::Python => 3,
            Language::Rust => 4,
            Language::Php => 5,
            Language::Ruby => 6,
            Language::TypeScript => 7,
            Language::JavaScript => 8,
        }
    }

    /// Source file extensions scanned for port literals.
    pub fn source_extensions(self) -> &'static [&'static str] {
        match self {
            Language::JavaScript | Language::TypeScript => &["js", "mjs", "cjs", "ts"],
            Language::Go => &["go"],
            Language::Python => &["py"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(Language, &str)] = &[
            (Language::Java, "Java"),
            (Language::DotNet, ".NET"),
            (Language::Go, "Go"),
            (Language::Python, "Python"),
            (Language::Rust, "Rust"),
            (Language::Php, "PHP"),
            (Language::Ruby, "Ruby"),
            (Language::JavaScript, "JavaScript"),
            (Language::TypeScript, "TypeScript"),
        ];

        let name = DISPLAY_STRINGS
            .iter()
            .find(|(lang, _)| lang == self)
            .map(|(_, s)| *s)
            .unwrap_or("Unknown");
        write!(f, "{name}")
    }
}

/// `(needle, framework)` pairs, checked in order against manifest text.
fn framework_markers(language: Language) -> &'static [(&'static str, &'static str)] {
    match language {
        Language::Java => &[
            ("spring-boot", "springboot"),
            ("quarkus", "Quarkus"),
            ("micronaut", "Micronaut"),
            ("io.vertx", "Vert.x"),
            ("openliberty", "OpenLiberty"),
        ],
        Language::JavaScript | Language::TypeScript => &[
            ("\"next\"", "Next.js"),
            ("\"nuxt\"", "Nuxt"),
            ("\"@angular/core\"", "Angular"),
            ("\"express\"", "Express"),
            ("\"react\"", "React"),
            ("\"vue\"", "Vue"),
        ],
        Language::Python => &[
            ("django", "Django"),
            ("flask", "Flask"),
            ("fastapi", "FastAPI"),
        ],
        Language::Go => &[
            ("github.com/gin-gonic/gin", "Gin"),
            ("github.com/labstack/echo", "Echo"),
            ("github.com/gofiber/fiber", "Fiber"),
        ],
        _ => &[],
    }
}

/// Refine a language using the manifests present in `dir`: a `package.json`
/// project with TypeScript tooling is TypeScript.
pub fn refine_language(language: Language, dir: &Path) -> Language {
    if language != Language::JavaScript {
        return language;
    }
    if dir.join("tsconfig.json").is_file() {
        return Language::TypeScript;
    }
    let manifest = std::fs::read_to_string(dir.join("package.json")).unwrap_or_default();
    if manifest.contains("\"typescript\"") {
        Language::TypeScript
    } else {
        Language::JavaScript
    }
}

/// Framework named in the manifests of `dir`, if any.
pub fn detect_framework(language: Language, dir: &Path, manifests: &[String]) -> Option<String> {
    let text: String = manifests
        .iter()
        .filter_map(|name| std::fs::read_to_string(dir.join(name)).ok())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

    framework_markers(language)
        .iter()
        .find(|(needle, _)| text.contains(&needle.to_lowercase()))
        .map(|(_, framework)| (*framework).to_string())
}
