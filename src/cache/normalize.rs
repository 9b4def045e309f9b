// Query normalization (lowercase, whitespace collapse, abbreviation expansion)
// Author: kelexine (https://github.com/kelexine)

use std::collections::HashMap;
use std::sync::OnceLock;

/// Lazily initialized abbreviation table, immutable after first use
static ABBREVIATIONS: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

/// Get or initialize the short form → canonical word table
pub fn abbreviations() -> &'static HashMap<&'static str, &'static str> {
    ABBREVIATIONS.get_or_init(|| {
        let mut m = HashMap::new();

        m.insert("auth", "authentication");
        m.insert("authn", "authentication");
        m.insert("authz", "authorization");
        m.insert("config", "configuration");
        m.insert("cfg", "configuration");
        m.insert("conf", "configuration");
        m.insert("db", "database");
        m.insert("env", "environment");
        m.insert("envs", "environments");
        m.insert("repo", "repository");
        m.insert("repos", "repositories");
        m.insert("doc", "documentation");
        m.insert("docs", "documentation");
        m.insert("app", "application");
        m.insert("apps", "applications");
        m.insert("msg", "message");
        m.insert("msgs", "messages");
        m.insert("err", "error");
        m.insert("init", "initialization");
        m.insert("impl", "implementation");
        m.insert("pkg", "package");
        m.insert("dep", "dependency");
        m.insert("deps", "dependencies");
        m.insert("perf", "performance");
        m.insert("k8s", "kubernetes");
        m.insert("js", "javascript");
        m.insert("ts", "typescript");
        m.insert("py", "python");

        m
    })
}

/// Canonicalize a free-form query so near-identical phrasings share a key.
///
/// Idempotent: `normalize(&normalize(q)) == normalize(q)`.
pub fn normalize(query: &str) -> String {
    let table = abbreviations();
    query
        .to_lowercase()
        .split_whitespace()
        .map(|token| table.get(token).copied().unwrap_or(token))
        .collect::<Vec<_>>()
        .join(" ")
}
