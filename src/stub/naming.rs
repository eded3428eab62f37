//! Component name derivation.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::forge::url::{is_root_context, repo_name};

/// Longest sanitized name; leaves room for a `-xxxx` suffix.
pub const MAX_NAME_LEN: usize = 58;
const SUFFIX_LEN: usize = 4;
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const NUMERIC_PREFIX: &str = "comp-";

const NOUNS: [&str; 16] = [
    "anchor", "beacon", "canyon", "delta", "ember", "falcon", "glacier", "harbor", "island",
    "juniper", "kestrel", "lantern", "meadow", "nebula", "orchard", "pebble",
];

/// A name made only of `[a-z0-9-]`, starting with a letter, at most
/// [`MAX_NAME_LEN`] characters. Applying it twice is the same as once.
pub fn sanitize_name(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let mut name = kept.trim_matches('-').to_string();

    if name.is_empty() {
        name = random_noun().to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, NUMERIC_PREFIX);
    }
    name.make_ascii_lowercase();

    if name.len() > MAX_NAME_LEN {
        name.truncate(MAX_NAME_LEN);
        name.truncate(name.trim_end_matches('-').len());
    }
    name
}

/// Unsanitized base name: the repository name, prefixed by the context.
pub fn base_name(repo_url: &str, context: &str) -> String {
    let repo = repo_name(repo_url);
    if is_root_context(context) {
        return repo;
    }
    let context = context.trim_start_matches("./").trim_matches('/');
    format!("{context}-{repo}")
}

/// `name` plus `-` and four random lowercase alphanumerics.
pub fn with_random_suffix(name: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("{name}-{suffix}")
}

fn random_noun() -> &'static str {
    NOUNS.choose(&mut rand::thread_rng()).copied().unwrap_or("component")
}
