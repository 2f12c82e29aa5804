//! Name resolution for free-text SKU and service names.
//!
//! Users type SKUs the way the portal shows them (`Standard_D2s_v3`) while
//! the retail prices API stores `D2s v3`, and they name services by
//! nickname (`vm`, `aks`). This module turns both into terms the API
//! understands.

use serde::Serialize;
use std::sync::LazyLock;
use strsim::jaro_winkler;

/// Prefixes stripped from SKU input, checked in this order.
const SKU_PREFIXES: [&str; 4] = ["Standard_", "Basic_", "standard_", "basic_"];

/// Minimum similarity for a nickname to count as a typo of a known term
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// Lowercase nickname to canonical upstream `serviceName`.
pub static SERVICE_NAME_MAPPINGS: &[(&str, &str)] = &[
    ("app service", "Azure App Service"),
    ("web app", "Azure App Service"),
    ("web apps", "Azure App Service"),
    ("virtual machine", "Virtual Machines"),
    ("virtual machines", "Virtual Machines"),
    ("vm", "Virtual Machines"),
    ("vms", "Virtual Machines"),
    ("storage", "Storage"),
    ("blob", "Storage"),
    ("blob storage", "Storage"),
    ("sql", "SQL Database"),
    ("sql database", "SQL Database"),
    ("database", "SQL Database"),
    ("cosmos", "Azure Cosmos DB"),
    ("cosmos db", "Azure Cosmos DB"),
    ("cosmosdb", "Azure Cosmos DB"),
    ("functions", "Functions"),
    ("function app", "Functions"),
    ("kubernetes", "Azure Kubernetes Service"),
    ("aks", "Azure Kubernetes Service"),
    ("redis", "Redis Cache"),
    ("container apps", "Azure Container Apps"),
];

/// Shown when discovery finds nothing at all.
pub static SERVICE_HINTS: &[&str] = &[
    "'app service' or 'web app' for Azure App Service",
    "'vm' or 'virtual machine' for Virtual Machines",
    "'storage' or 'blob' for Storage services",
    "'sql' or 'database' for SQL Database",
    "'kubernetes' or 'aks' for Azure Kubernetes Service",
];

// Longest keys first so "sql database" wins over "sql" and "database".
static KEYS_BY_LENGTH: LazyLock<Vec<(&'static str, &'static str)>> = LazyLock::new(|| {
    let mut keys = SERVICE_NAME_MAPPINGS.to_vec();
    keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    keys
});

/// Search terms derived from one raw SKU string
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NormalizedSkuTerm {
    /// Tried in order; no duplicates, non-empty for non-empty input
    pub candidates: Vec<String>,
    /// Prefix stripped, underscores shown as spaces
    pub display_name: String,
}

impl NormalizedSkuTerm {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Normalize a SKU as typed by a user into upstream search terms.
pub fn normalize_sku(raw: &str) -> NormalizedSkuTerm {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return NormalizedSkuTerm::default();
    }

    let stripped = SKU_PREFIXES
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);

    // Input that is only a prefix is searched as typed.
    if stripped.is_empty() {
        return NormalizedSkuTerm {
            candidates: vec![trimmed.to_string()],
            display_name: trimmed.to_string(),
        };
    }

    let mut candidates: Vec<String> = Vec::with_capacity(3);
    for term in [stripped.replace(' ', "_"), stripped.replace('_', " "), stripped.to_string()] {
        if !term.is_empty() && !candidates.contains(&term) {
            candidates.push(term);
        }
    }

    NormalizedSkuTerm {
        candidates,
        display_name: stripped.replace('_', " "),
    }
}

/// Canonical upstream service name for a nickname, if one is known.
///
/// Exact (case-insensitive) matches win; otherwise a mapping key that
/// appears as whole words inside the input is accepted.
pub fn resolve_service(raw: &str) -> Option<&'static str> {
    let term = canonical_words(raw);
    if term.is_empty() {
        return None;
    }

    if let Some((_, service)) = SERVICE_NAME_MAPPINGS.iter().find(|(key, _)| *key == term) {
        return Some(*service);
    }

    let words: Vec<&str> = term.split(' ').collect();
    KEYS_BY_LENGTH
        .iter()
        .find(|(key, _)| contains_words(&words, key))
        .map(|(_, service)| *service)
}

/// Known services whose nicknames look like a misspelling of `raw`,
/// best match first, without duplicates.
pub fn similar_services(raw: &str, max: usize) -> Vec<(&'static str, &'static str, f64)> {
    let term = canonical_words(raw);
    if term.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&'static str, &'static str, f64)> = SERVICE_NAME_MAPPINGS
        .iter()
        .map(|(key, service)| (*key, *service, jaro_winkler(&term, key)))
        .filter(|(_, _, score)| *score >= SIMILARITY_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut seen = Vec::new();
    scored.retain(|(_, service, _)| {
        if seen.contains(service) {
            false
        } else {
            seen.push(*service);
            true
        }
    });
    scored.truncate(max);
    scored
}

/// Case-insensitive similarity in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    jaro_winkler(&a.to_lowercase(), &b.to_lowercase())
}

fn canonical_words(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains_words(words: &[&str], key: &str) -> bool {
    let key_words: Vec<&str> = key.split(' ').collect();
    words.windows(key_words.len()).any(|window| window == key_words.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_prefix_is_stripped_once() {
        let term = normalize_sku("Standard_D2s_v3");
        assert_eq!(term.display_name, "D2s v3");
        assert_eq!(term.candidates, vec!["D2s_v3".to_string(), "D2s v3".to_string()]);
    }

    #[test]
    fn test_only_first_matching_prefix_is_removed() {
        let term = normalize_sku("Standard_Basic_A1");
        assert_eq!(term.display_name, "Basic A1");
        assert_eq!(term.candidates[0], "Basic_A1");
    }

    #[test]
    fn test_lowercase_prefix_is_stripped() {
        let term = normalize_sku("basic_a0");
        assert_eq!(term.display_name, "a0");
        assert_eq!(term.candidates, vec!["a0".to_string()]);
    }

    #[test]
    fn test_space_input_yields_underscore_candidate_first() {
        let term = normalize_sku("D4s v5");
        assert_eq!(term.candidates, vec!["D4s_v5".to_string(), "D4s v5".to_string()]);
        assert_eq!(term.display_name, "D4s v5");
    }

    #[test]
    fn test_plain_sku_has_single_candidate() {
        let term = normalize_sku("P1v3");
        assert_eq!(term.candidates, vec!["P1v3".to_string()]);
    }

    #[test]
    fn test_empty_input_is_empty_term() {
        assert!(normalize_sku("").is_empty());
        assert_eq!(normalize_sku("   ").display_name, "");
    }

    #[test]
    fn test_prefix_only_input_keeps_raw_candidate() {
        let term = normalize_sku("Standard_");
        assert_eq!(term.candidates, vec!["Standard_".to_string()]);
        assert_eq!(term.display_name, "Standard_");

        let term = normalize_sku("  basic_ ");
        assert_eq!(term.candidates, vec!["basic_".to_string()]);
    }

    #[test]
    fn test_resolve_exact_nickname() {
        assert_eq!(resolve_service("vm"), Some("Virtual Machines"));
        assert_eq!(resolve_service("AKS"), Some("Azure Kubernetes Service"));
        assert_eq!(resolve_service("  Web   App "), Some("Azure App Service"));
    }

    #[test]
    fn test_resolve_nickname_inside_phrase() {
        assert_eq!(resolve_service("cheap vm pricing"), Some("Virtual Machines"));
        assert_eq!(resolve_service("azure sql database"), Some("SQL Database"));
    }

    #[test]
    fn test_resolve_requires_whole_words() {
        assert_eq!(resolve_service("mysql"), None);
        assert_eq!(resolve_service("vmware"), None);
    }

    #[test]
    fn test_resolve_unknown_returns_none() {
        assert_eq!(resolve_service("quantum annealer"), None);
        assert_eq!(resolve_service(""), None);
    }

    #[test]
    fn test_similar_services_catches_typos() {
        let similar = similar_services("kubernets", 3);
        assert!(!similar.is_empty());
        assert_eq!(similar[0].1, "Azure Kubernetes Service");
    }

    #[test]
    fn test_similar_services_are_unique() {
        let similar = similar_services("virtual machin", 5);
        let services: Vec<&str> = similar.iter().map(|(_, s, _)| *s).collect();
        assert_eq!(services, vec!["Virtual Machines"]);
    }
}
