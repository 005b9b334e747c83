//! Canonical identity: `repo_id` (namespaced UUID over a normalized repo URL)
//! and `canonical_id` (path or path#symbol encoding), plus markdown slug
//! dedup. This is the invariant threading every other component together.

use uuid::Uuid;

/// Normalize a repo URL: lowercase, trim surrounding whitespace, strip a
/// trailing `/`, then strip a trailing `.git`. Order matters — `.git` is
/// stripped *after* the trailing slash so `URL/.git` and `URL.git/`
/// normalize identically only when both trims actually apply in sequence.
pub fn normalize_repo_url(repo_url: &str) -> String {
    let mut normalized = repo_url.trim().to_lowercase();
    while normalized.ends_with('/') {
        normalized.pop();
    }
    if let Some(stripped) = normalized.strip_suffix(".git") {
        normalized = stripped.to_string();
    }
    normalized
}

/// Deterministic UUID v5 derived from a normalized repo URL under the
/// standard URL namespace. Same URL (mod case/trailing slash/`.git`)
/// always yields the same id, across processes.
pub fn build_repo_id(repo_url: &str) -> Uuid {
    let normalized = normalize_repo_url(repo_url);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, normalized.as_bytes())
}

/// `<relative_path>` for modules, `<relative_path>#<symbol_path>` for
/// everything else. `relative_path` is normalized to forward slashes with
/// no leading/trailing slash first.
pub fn build_canonical_id(relative_path: &str, symbol_path: Option<&str>) -> String {
    let path_clean = clean_relative_path(relative_path);
    match symbol_path {
        Some(symbol) if !symbol.is_empty() => format!("{path_clean}#{symbol}"),
        _ => path_clean,
    }
}

fn clean_relative_path(relative_path: &str) -> String {
    let replaced = relative_path.replace('\\', "/");
    replaced.trim_matches('/').to_string()
}

/// `(repo_id, canonical_id)` pair — the globally-unique key for a
/// DocumentNode.
pub fn build_global_id(repo_url: &str, relative_path: &str, symbol_path: Option<&str>) -> (Uuid, String) {
    (build_repo_id(repo_url), build_canonical_id(relative_path, symbol_path))
}

/// Lowercase, collapse runs of non-alphanumerics to `_`, trim leading and
/// trailing `_`. Falls back to `"section"` if the result is empty (e.g. a
/// heading made entirely of punctuation).
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut last_was_sep = false;
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    let trimmed = slug.trim_matches('_').to_string();
    if trimmed.is_empty() {
        "section".to_string()
    } else {
        trimmed
    }
}

/// Per-file slug deduplication: first occurrence of a slug is left bare,
/// subsequent occurrences get a numeric suffix (`slug_2`, `slug_3`, ...).
#[derive(Default, Debug)]
pub struct SlugDeduplicator {
    counts: std::collections::HashMap<String, usize>,
}

impl SlugDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dedupe(&mut self, base_slug: &str) -> String {
        let count = self.counts.entry(base_slug.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base_slug.to_string()
        } else {
            format!("{base_slug}_{count}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_id_is_stable_across_url_variants() {
        let base = build_repo_id("https://github.com/acme/widgets");
        assert_eq!(base, build_repo_id("https://github.com/acme/widgets/"));
        assert_eq!(base, build_repo_id("https://github.com/acme/widgets.git"));
        assert_eq!(base, build_repo_id("HTTPS://GITHUB.COM/ACME/WIDGETS"));
        assert_ne!(base, build_repo_id("https://github.com/acme/other"));
    }

    #[test]
    fn canonical_id_for_module_is_relative_path() {
        assert_eq!(build_canonical_id("pkg/mod.py", None), "pkg/mod.py");
        assert_eq!(build_canonical_id("/pkg/mod.py/", None), "pkg/mod.py");
    }

    #[test]
    fn canonical_id_for_symbol_appends_fragment() {
        assert_eq!(
            build_canonical_id("pkg/mod.py", Some("Foo.bar")),
            "pkg/mod.py#Foo.bar"
        );
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Getting Started!"), "getting_started");
        assert_eq!(slugify("  ---  "), "section");
    }

    #[test]
    fn slug_dedup_appends_numeric_suffix() {
        let mut dedup = SlugDeduplicator::new();
        assert_eq!(dedup.dedupe("install"), "install");
        assert_eq!(dedup.dedupe("install"), "install_2");
        assert_eq!(dedup.dedupe("install"), "install_3");
        assert_eq!(dedup.dedupe("setup"), "setup");
    }
}
