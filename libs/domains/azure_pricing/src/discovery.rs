//! SKU catalogs for a service, and service lookup for loosely typed names.
//!
//! Service discovery walks from cheap and certain to broad and fuzzy: the
//! nickname table, an exact `serviceName` match, then substring searches on
//! service and product names, then typo matches against known nicknames.
//! Only the first two steps can fail the call; the fuzzy steps are
//! best-effort and a complete miss returns static hints.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use strum::Display;
use tracing::{debug, info, instrument, warn};

use crate::client::PriceSource;
use crate::error::PricingResult;
use crate::filter::ODataFilter;
use crate::models::PriceRow;
use crate::resolver::{SERVICE_HINTS, resolve_service, similar_services, similarity};
use crate::service::PricingService;

pub const DISCOVERY_SAMPLE_LIMIT: usize = 100;

/// SKUs listed per product when rendering a catalog
pub const MAX_SKUS_PER_PRODUCT: usize = 10;

const MAX_SERVICE_SUGGESTIONS: usize = 5;
const MAX_SAMPLE_ITEMS: usize = 3;

/// Aggregated view of every row seen for one SKU name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkuSummary {
    pub product_name: String,
    pub min_price: f64,
    pub sample_unit: String,
    pub regions: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkuCatalog {
    pub service_name: String,
    pub total_skus: usize,
    pub skus: BTreeMap<String, SkuSummary>,
}

impl SkuCatalog {
    pub fn from_rows(service_name: impl Into<String>, rows: &[PriceRow]) -> Self {
        let mut skus: BTreeMap<String, SkuSummary> = BTreeMap::new();

        for row in rows.iter().filter(|r| !r.sku_name.is_empty()) {
            let entry = skus.entry(row.sku_name.clone()).or_insert_with(|| SkuSummary {
                product_name: row.product_name.clone(),
                min_price: row.retail_price,
                sample_unit: row.unit_of_measure.clone(),
                regions: BTreeSet::new(),
            });
            entry.min_price = entry.min_price.min(row.retail_price);
            if !row.arm_region_name.is_empty() {
                entry.regions.insert(row.arm_region_name.clone());
            }
        }

        Self {
            service_name: service_name.into(),
            total_skus: skus.len(),
            skus,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.skus.is_empty()
    }

    /// SKUs grouped by product, at most [`MAX_SKUS_PER_PRODUCT`] per group.
    pub fn by_product(&self) -> BTreeMap<&str, Vec<(&str, &SkuSummary)>> {
        let mut products: BTreeMap<&str, Vec<(&str, &SkuSummary)>> = BTreeMap::new();
        for (sku, summary) in &self.skus {
            let group = products.entry(summary.product_name.as_str()).or_default();
            if group.len() < MAX_SKUS_PER_PRODUCT {
                group.push((sku.as_str(), summary));
            }
        }
        products
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverSkusRequest {
    pub service_name: String,
    pub region: Option<String>,
    pub currency_code: String,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchType {
    /// Resolved through the nickname table
    ExactMapping,
    /// The term is an upstream service name
    Exact,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSuggestion {
    pub service_name: String,
    pub match_reason: String,
    pub sample_items: Vec<PriceRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DiscoveryResult {
    Found {
        original_search: String,
        service_found: String,
        match_type: MatchType,
        catalog: SkuCatalog,
    },
    Suggestions {
        original_search: String,
        suggestions: Vec<ServiceSuggestion>,
    },
    NoMatch {
        original_search: String,
        hints: Vec<String>,
    },
}

/// How a suggested service was found; lower ranks first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    ExactName,
    Prefix,
    Contains,
    Product,
    KnownTerm,
}

struct Candidate {
    service_name: String,
    tier: MatchTier,
    reason: String,
    score: f64,
    rows: Vec<PriceRow>,
}

impl<S: PriceSource> PricingService<S> {
    /// Catalog of the SKUs offered by an upstream service name.
    #[instrument(skip(self, request), fields(service = %request.service_name, region = ?request.region))]
    pub async fn discover_skus(&self, request: DiscoverSkusRequest) -> PricingResult<SkuCatalog> {
        let mut filter = ODataFilter::new().eq("serviceName", request.service_name.trim());
        if let Some(region) = request.region.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            filter = filter.eq("armRegionName", region);
        }

        let envelope = self.query_filter(filter, &request.currency_code, request.limit).await?;
        let catalog = SkuCatalog::from_rows(request.service_name.trim(), &envelope.rows);

        info!(skus = catalog.total_skus, rows = envelope.count, "SKU discovery complete");
        Ok(catalog)
    }

    /// Find the service a user means and list its SKUs, or suggest services.
    #[instrument(skip(self))]
    pub async fn discover_service(&self, term: &str, currency_code: &str) -> PricingResult<DiscoveryResult> {
        let original_search = term.to_string();
        let term = term.trim();

        if let Some(service) = resolve_service(term) {
            debug!(service = service, "Service resolved from nickname table");
            let catalog = self
                .discover_skus(DiscoverSkusRequest {
                    service_name: service.to_string(),
                    region: None,
                    currency_code: currency_code.to_string(),
                    limit: DISCOVERY_SAMPLE_LIMIT,
                })
                .await?;
            return Ok(DiscoveryResult::Found {
                original_search,
                service_found: service.to_string(),
                match_type: MatchType::ExactMapping,
                catalog,
            });
        }

        if term.is_empty() {
            return Ok(no_match(original_search));
        }

        let exact = self
            .query_filter(
                ODataFilter::new().eq("serviceName", term),
                currency_code,
                DISCOVERY_SAMPLE_LIMIT,
            )
            .await?;
        if !exact.is_empty() {
            return Ok(DiscoveryResult::Found {
                original_search,
                service_found: term.to_string(),
                match_type: MatchType::Exact,
                catalog: SkuCatalog::from_rows(term, &exact.rows),
            });
        }

        let mut candidates = self.fuzzy_candidates(term, currency_code).await;
        candidates.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| b.rows.len().cmp(&a.rows.len()))
        });
        candidates.truncate(MAX_SERVICE_SUGGESTIONS);

        if candidates.is_empty() {
            info!(term = term, "No service matches");
            return Ok(no_match(original_search));
        }

        info!(term = term, suggestions = candidates.len(), "Service suggestions found");
        Ok(DiscoveryResult::Suggestions {
            original_search,
            suggestions: candidates
                .into_iter()
                .map(|c| ServiceSuggestion {
                    service_name: c.service_name,
                    match_reason: c.reason,
                    sample_items: c.rows.into_iter().take(MAX_SAMPLE_ITEMS).collect(),
                })
                .collect(),
        })
    }

    async fn fuzzy_candidates(&self, term: &str, currency_code: &str) -> Vec<Candidate> {
        let mut spellings = vec![term.to_string()];
        let titled = title_case(term);
        if titled != term {
            spellings.push(titled);
        }

        let mut rows = self.best_effort_contains("serviceName", &spellings, currency_code).await;
        let from_product = rows.is_empty();
        if from_product {
            rows = self.best_effort_contains("productName", &spellings, currency_code).await;
        }

        let lowered = term.to_lowercase();
        let mut candidates: Vec<Candidate> = Vec::new();
        for row in rows.into_iter().filter(|r| !r.service_name.is_empty()) {
            if let Some(existing) = candidates.iter_mut().find(|c| c.service_name == row.service_name) {
                existing.rows.push(row);
                continue;
            }

            let name = row.service_name.to_lowercase();
            let (tier, reason) = if from_product {
                (MatchTier::Product, format!("Product name contains '{}'", term))
            } else if name == lowered {
                (MatchTier::ExactName, "Exact service name match".to_string())
            } else if name.starts_with(&lowered) {
                (MatchTier::Prefix, format!("Service name starts with '{}'", term))
            } else {
                (MatchTier::Contains, format!("Service name contains '{}'", term))
            };
            candidates.push(Candidate {
                service_name: row.service_name.clone(),
                tier,
                reason,
                score: similarity(term, &row.service_name),
                rows: vec![row],
            });
        }

        for (key, service, score) in similar_services(term, MAX_SERVICE_SUGGESTIONS) {
            if candidates.len() >= MAX_SERVICE_SUGGESTIONS {
                break;
            }
            if candidates.iter().any(|c| c.service_name == service) {
                continue;
            }

            let samples = match self
                .query_filter(
                    ODataFilter::new().eq("serviceName", service),
                    currency_code,
                    MAX_SAMPLE_ITEMS,
                )
                .await
            {
                Ok(envelope) => envelope.rows,
                Err(e) => {
                    warn!(service = service, error = %e, "Sample lookup for similar service failed");
                    Vec::new()
                }
            };
            candidates.push(Candidate {
                service_name: service.to_string(),
                tier: MatchTier::KnownTerm,
                reason: format!("Similar to known term '{}'", key),
                score,
                rows: samples,
            });
        }

        candidates
    }

    /// Rows of every `contains(field, ...)` query that succeeds.
    async fn best_effort_contains(&self, field: &str, spellings: &[String], currency_code: &str) -> Vec<PriceRow> {
        let mut rows = Vec::new();
        for spelling in spellings {
            match self
                .query_filter(
                    ODataFilter::new().contains(field, spelling),
                    currency_code,
                    DISCOVERY_SAMPLE_LIMIT,
                )
                .await
            {
                Ok(envelope) => rows.extend(envelope.rows),
                Err(e) => warn!(field = field, term = %spelling, error = %e, "Fuzzy lookup failed, continuing"),
            }
        }
        rows
    }
}

fn no_match(original_search: String) -> DiscoveryResult {
    DiscoveryResult::NoMatch {
        original_search,
        hints: SERVICE_HINTS.iter().map(|h| h.to_string()).collect(),
    }
}

/// Uppercase the first letter of every word, leaving the rest untouched.
fn title_case(term: &str) -> String {
    term.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockPriceSource;
    use crate::error::PricingError;
    use crate::service::test_support::{page, row};

    fn service_row(service: &str, sku: &str, price: f64) -> PriceRow {
        let mut row = row(sku, "eastus", price);
        row.service_name = service.to_string();
        row.product_name = format!("{} Product", service);
        row
    }

    #[test]
    fn test_catalog_tracks_min_price_and_regions() {
        let rows = vec![
            row("D2s v3", "eastus", 0.096),
            row("D2s v3", "westus", 0.090),
            row("D2s v3", "eastus", 0.188),
            row("D4s v3", "eastus", 0.192),
        ];
        let catalog = SkuCatalog::from_rows("Virtual Machines", &rows);

        assert_eq!(catalog.total_skus, 2);
        let d2 = &catalog.skus["D2s v3"];
        assert_eq!(d2.min_price, 0.090);
        assert_eq!(d2.sample_unit, "1 Hour");
        assert_eq!(d2.regions.iter().collect::<Vec<_>>(), vec!["eastus", "westus"]);
    }

    #[test]
    fn test_by_product_caps_each_group() {
        let rows: Vec<PriceRow> = (0..15).map(|i| row(&format!("B{:02}", i), "eastus", 0.01)).collect();
        let catalog = SkuCatalog::from_rows("Virtual Machines", &rows);

        let products = catalog.by_product();
        assert_eq!(products.len(), 1);
        assert_eq!(products["Virtual Machines DSv3 Series"].len(), MAX_SKUS_PER_PRODUCT);
        assert_eq!(catalog.total_skus, 15);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("app  service"), "App Service");
        assert_eq!(title_case("cosmos DB"), "Cosmos DB");
    }

    #[tokio::test]
    async fn test_nickname_resolves_to_catalog() {
        let mut source = MockPriceSource::new();
        source
            .expect_fetch()
            .withf(|q| q.filter.as_deref() == Some("serviceName eq 'Virtual Machines'"))
            .times(1)
            .returning(|_| Ok(page(vec![row("D2s v3", "eastus", 0.096)])));

        let service = PricingService::new(source);
        let result = service.discover_service("vm", "USD").await.unwrap();

        match result {
            DiscoveryResult::Found {
                service_found,
                match_type,
                catalog,
                ..
            } => {
                assert_eq!(service_found, "Virtual Machines");
                assert_eq!(match_type, MatchType::ExactMapping);
                assert_eq!(catalog.total_skus, 1);
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exact_service_name_is_found() {
        let mut source = MockPriceSource::new();
        source
            .expect_fetch()
            .withf(|q| q.filter.as_deref() == Some("serviceName eq 'Event Grid'"))
            .returning(|_| Ok(page(vec![service_row("Event Grid", "Standard", 0.6)])));

        let service = PricingService::new(source);
        let result = service.discover_service("Event Grid", "USD").await.unwrap();

        assert!(matches!(
            result,
            DiscoveryResult::Found { match_type: MatchType::Exact, .. }
        ));
    }

    #[tokio::test]
    async fn test_fuzzy_matches_are_ranked() {
        let mut source = MockPriceSource::new();
        source.expect_fetch().returning(|q| {
            let filter = q.filter.clone().unwrap_or_default();
            if filter == "contains(serviceName, 'Cache')" {
                Ok(page(vec![
                    service_row("Redis Cache", "C0", 0.022),
                    service_row("Redis Cache", "C1", 0.055),
                    service_row("Cache Service", "S1", 0.1),
                ]))
            } else if filter == "contains(serviceName, 'cache')" {
                Err(PricingError::UpstreamStatus {
                    status: 500,
                    message: "boom".to_string(),
                })
            } else {
                Ok(page(vec![]))
            }
        });

        let service = PricingService::new(source);
        let result = service.discover_service("cache", "USD").await.unwrap();

        let DiscoveryResult::Suggestions { suggestions, .. } = result else {
            panic!("expected suggestions");
        };
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].service_name, "Cache Service");
        assert_eq!(suggestions[0].match_reason, "Service name starts with 'cache'");
        assert_eq!(suggestions[1].service_name, "Redis Cache");
        assert_eq!(suggestions[1].sample_items.len(), 2);
    }

    #[tokio::test]
    async fn test_typo_suggests_known_service() {
        let mut source = MockPriceSource::new();
        source.expect_fetch().returning(|q| {
            if q.filter.as_deref() == Some("serviceName eq 'Azure Kubernetes Service'") {
                assert_eq!(q.top, Some(MAX_SAMPLE_ITEMS));
                Ok(page(vec![service_row("Azure Kubernetes Service", "Standard", 0.1)]))
            } else {
                Ok(page(vec![]))
            }
        });

        let service = PricingService::new(source);
        let result = service.discover_service("kubernets", "USD").await.unwrap();

        let DiscoveryResult::Suggestions { suggestions, .. } = result else {
            panic!("expected suggestions");
        };
        assert_eq!(suggestions[0].service_name, "Azure Kubernetes Service");
        assert_eq!(suggestions[0].match_reason, "Similar to known term 'kubernetes'");
        assert_eq!(suggestions[0].sample_items.len(), 1);
    }

    #[tokio::test]
    async fn test_no_plausible_match_returns_hints() {
        let mut source = MockPriceSource::new();
        source.expect_fetch().returning(|_| Ok(page(vec![])));

        let service = PricingService::new(source);
        let result = service.discover_service("quantum teleporter", "USD").await.unwrap();

        match result {
            DiscoveryResult::NoMatch { original_search, hints } => {
                assert_eq!(original_search, "quantum teleporter");
                assert_eq!(hints.len(), SERVICE_HINTS.len());
            }
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exact_lookup_error_propagates() {
        let mut source = MockPriceSource::new();
        source.expect_fetch().returning(|_| {
            Err(PricingError::UpstreamStatus {
                status: 503,
                message: "unavailable".to_string(),
            })
        });

        let service = PricingService::new(source);
        assert!(service.discover_service("quantum", "USD").await.is_err());
    }
}
