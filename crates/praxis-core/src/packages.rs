//! Package requirement extraction from submitted source text
//!
//! A submission may reference external packages through import statements; the
//! sandbox only loads identifiers present in the configured allow-list. The
//! scan is deliberately lexical — it runs before the source is handed to the
//! interpreter, so it must not depend on the code being valid.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(?:import|from)[ \t]+([A-Za-z_][A-Za-z0-9_]*)")
            .expect("import pattern is a valid regex")
    })
}

/// Scans `source` for import-like statements and returns the subset of
/// referenced identifiers present in `allow_list`.
///
/// Matching against the allow-list is case-insensitive and the returned set
/// carries the allow-list's canonical spelling. Identifiers not on the
/// allow-list are silently excluded, as are commented-out imports (the scan is
/// anchored to the start of a line).
pub fn resolve(source: &str, allow_list: &[String]) -> BTreeSet<String> {
    let canonical: Vec<(String, &String)> = allow_list
        .iter()
        .map(|name| (name.to_lowercase(), name))
        .collect();

    let mut required = BTreeSet::new();
    for capture in import_pattern().captures_iter(source) {
        let ident = capture[1].to_lowercase();
        if let Some((_, name)) = canonical.iter().find(|(lower, _)| *lower == ident) {
            required.insert((*name).clone());
        }
    }
    required
}
