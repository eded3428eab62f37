//! Repository URL helpers.
//!
//! Raw-content URLs follow the GitHub convention:
//!
//! - `github.com` → `raw.githubusercontent.com`
//! - a `/tree` segment is removed (the branch already follows it),
//!   otherwise `/<revision>` is appended
//! - then `/<context>/<file>`

use url::Url;

use crate::errors::{DetectionError, Result};

const RAW_GITHUB_HOST: &str = "raw.githubusercontent.com";

/// Check that every `%` starts a valid two-digit hex escape.
///
/// Returns the offending three characters, quoted, on failure:
/// `invalid URL escape "%U%"`.
pub fn validate_escapes(raw: &str) -> std::result::Result<(), String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !valid {
                let end = (i + 3).min(bytes.len());
                let escape = String::from_utf8_lossy(&bytes[i..end]);
                return Err(format!("invalid URL escape \"{escape}\""));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Trim and validate a user-supplied repository URL.
///
/// Surrounding whitespace and trailing `/` are removed.
pub fn normalize_repo_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DetectionError::invalid_spec("gitSource.url must not be empty"));
    }
    validate_escapes(trimmed).map_err(|reason| {
        DetectionError::invalid_spec(format!(
            "failed to parse gitSource.url \"{trimmed}\": {reason}"
        ))
    })?;

    let parsed = Url::parse(trimmed).map_err(|e| {
        DetectionError::invalid_spec(format!("failed to parse gitSource.url \"{trimmed}\": {e}"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DetectionError::invalid_spec(format!(
            "gitSource.url \"{trimmed}\" must use http or https"
        )));
    }
    if parsed.host_str().is_none() {
        return Err(DetectionError::invalid_spec(format!(
            "gitSource.url \"{trimmed}\" has no host"
        )));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Whether a context names the repository root.
pub fn is_root_context(context: &str) -> bool {
    matches!(context.trim(), "" | "." | "./" | "/")
}

/// Normalize a context: root contexts become `./`, others lose leading
/// `./` and surrounding slashes. Parent-directory segments are rejected.
pub fn normalize_context(context: &str) -> Result<String> {
    if is_root_context(context) {
        return Ok("./".to_string());
    }
    let trimmed = context
        .trim()
        .trim_start_matches("./")
        .trim_matches('/')
        .to_string();
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err(DetectionError::invalid_spec(format!(
            "gitSource.context \"{context}\" must not leave the repository"
        )));
    }
    if is_root_context(&trimmed) {
        return Ok("./".to_string());
    }
    Ok(trimmed)
}

/// Join a context and a relative path, dropping root contexts.
pub fn join_context(context: &str, path: &str) -> String {
    let path = path.trim_start_matches("./").trim_start_matches('/');
    if is_root_context(context) {
        path.to_string()
    } else {
        format!("{}/{}", context.trim_end_matches('/'), path)
    }
}

/// `(owner, repo)` of a forge URL.
pub fn repo_coordinates(repo_url: &str) -> Result<(String, String)> {
    let parsed = Url::parse(repo_url.trim())
        .map_err(|e| DetectionError::invalid_spec(format!("invalid repository URL {repo_url}: {e}")))?;
    let mut segments = parsed
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(owner), Some(repo)) => Ok((
            owner.to_string(),
            repo.strip_suffix(".git").unwrap_or(repo).to_string(),
        )),
        _ => Err(DetectionError::invalid_spec(format!(
            "repository URL {repo_url} does not name an owner and repository"
        ))),
    }
}

/// Last path segment of a repository URL without `.git`.
pub fn repo_name(repo_url: &str) -> String {
    let trimmed = repo_url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Raw-content base URL for a repository at a revision.
pub fn raw_base(repo_url: &str, revision: &str) -> Result<String> {
    let mut parsed = Url::parse(repo_url.trim())
        .map_err(|e| DetectionError::invalid_spec(format!("invalid repository URL {repo_url}: {e}")))?;

    let host = parsed.host_str().unwrap_or_default().to_string();
    if host.contains("github") && !host.contains("raw") {
        parsed
            .set_host(Some(RAW_GITHUB_HOST))
            .map_err(|e| DetectionError::internal(format!("cannot rewrite host: {e}")))?;
    }

    let path = parsed.path().trim_end_matches('/').to_string();
    let path = path.strip_suffix(".git").unwrap_or(&path).to_string();
    let path = if path.contains("/tree/") {
        path.replacen("/tree/", "/", 1)
    } else {
        format!("{}/{}", path, revision.trim_matches('/'))
    };
    parsed.set_path(&path);
    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Raw-content URL of a file under a context.
pub fn raw_file_url(repo_url: &str, revision: &str, context: &str, file: &str) -> Result<String> {
    let base = raw_base(repo_url, revision)?;
    Ok(format!("{}/{}", base, join_context(context, file)))
}

/// Whether two URLs share scheme, host and port. Unparseable URLs never
/// match.
pub fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}
