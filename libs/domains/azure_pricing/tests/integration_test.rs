//! Integration tests for the Azure pricing domain
//!
//! These tests drive the public API against an in-memory price source that
//! answers from upstream-shaped JSON:
//! - Response parsing (upstream JSON → PriceRow)
//! - SKU normalization and service resolution
//! - Tool dispatch and rendering end to end

use async_trait::async_trait;
use domain_azure_pricing::*;
use serde_json::json;
use std::sync::Mutex;

// ============================================================================
// Fixture source
// ============================================================================

/// Serves rows whose region and SKU appear in the query filter.
struct FixtureSource {
    rows: Vec<PriceRow>,
    queries: Mutex<Vec<PriceQuery>>,
}

impl FixtureSource {
    fn new() -> Self {
        let page: PricePage = serde_json::from_value(json!({
            "BillingCurrency": "USD",
            "CustomerEntityId": "Default",
            "Items": [
                item("D2s v3", "eastus", "US East", 0.096),
                item("D2s v3 Spot", "eastus", "US East", 0.0192),
                item("D2s v3", "westeurope", "EU West", 0.12),
                item("D2s v3", "centralindia", "IN Central", 0.083),
                item("D4s v3", "eastus", "US East", 0.192),
            ],
            "NextPageLink": null,
            "Count": 5
        }))
        .unwrap();

        Self {
            rows: page.items,
            queries: Mutex::new(Vec::new()),
        }
    }

    fn queries(&self) -> Vec<PriceQuery> {
        self.queries.lock().unwrap().clone()
    }
}

fn item(sku: &str, region: &str, location: &str, price: f64) -> serde_json::Value {
    json!({
        "currencyCode": "USD",
        "retailPrice": price,
        "unitPrice": price,
        "armRegionName": region,
        "location": location,
        "meterName": sku,
        "productName": "Virtual Machines DSv3 Series",
        "skuName": sku,
        "serviceName": "Virtual Machines",
        "serviceFamily": "Compute",
        "unitOfMeasure": "1 Hour",
        "type": "Consumption",
        "armSkuName": "Standard_D2s_v3"
    })
}

#[async_trait]
impl PriceSource for FixtureSource {
    async fn fetch(&self, query: &PriceQuery) -> PricingResult<PricePage> {
        self.queries.lock().unwrap().push(query.clone());
        let filter = query.filter.clone().unwrap_or_default();

        if filter.contains("'nowhere'") {
            return Err(PricingError::UpstreamStatus {
                status: 400,
                message: "Invalid region".to_string(),
            });
        }

        let items = self
            .rows
            .iter()
            .filter(|row| {
                let region_ok = !filter.contains("armRegionName")
                    || filter.contains(&format!("armRegionName eq '{}'", row.arm_region_name));
                let sku_ok = !filter.contains("skuName")
                    || filter.contains(&format!("contains(skuName, '{}')", row.sku_name))
                    || row.sku_name.starts_with("D2s v3") && filter.contains("contains(skuName, 'D2s v3')");
                region_ok && sku_ok
            })
            .cloned()
            .collect();

        Ok(PricePage {
            items,
            next_page_link: None,
        })
    }
}

// ============================================================================
// Name resolution
// ============================================================================

#[test]
fn test_normalized_candidates_are_unique_and_non_empty() {
    for raw in ["Standard_D2s_v3", "basic_A1", "D4s v5", "P1v3", "Standard_E8-4ds_v5"] {
        let term = normalize_sku(raw);
        assert!(!term.candidates.is_empty(), "{raw}");
        let mut unique = term.candidates.clone();
        unique.dedup();
        assert_eq!(unique.len(), term.candidates.len(), "{raw}");
        assert!(!term.display_name.contains('_'), "{raw}");
    }

    assert!(normalize_sku("  ").candidates.is_empty());
    assert_eq!(normalize_sku("").display_name, "");
}

#[test]
fn test_service_nicknames_resolve() {
    assert_eq!(resolve_service("VM"), Some("Virtual Machines"));
    assert_eq!(resolve_service("web app"), Some("Azure App Service"));
    assert_eq!(resolve_service("my aks cluster"), Some("Azure Kubernetes Service"));
    assert_eq!(resolve_service("mysql"), None);
}

// ============================================================================
// Service operations
// ============================================================================

#[tokio::test]
async fn test_search_normalizes_portal_sku_names() {
    let service = PricingService::new(FixtureSource::new());

    let envelope = service
        .search(
            SearchCriteria::new()
                .with_service("Virtual Machines")
                .with_region("eastus")
                .with_sku("Standard_D2s_v3"),
        )
        .await
        .unwrap();

    assert_eq!(envelope.count, 2);
    assert_eq!(envelope.rows[0].sku_name, "D2s v3");
    assert_eq!(
        envelope.filters_applied,
        vec![
            "serviceName eq 'Virtual Machines'",
            "armRegionName eq 'eastus'",
            "contains(skuName, 'D2s v3')",
        ]
    );
}

#[tokio::test]
async fn test_region_comparison_survives_failing_region() {
    let service = PricingService::new(FixtureSource::new());

    let result = service
        .compare(CompareRequest {
            service_name: "Virtual Machines".to_string(),
            sku_name: Some("Standard_D2s_v3".to_string()),
            regions: vec![
                "westeurope".to_string(),
                "nowhere".to_string(),
                "eastus".to_string(),
                "centralindia".to_string(),
            ],
            currency_code: "USD".to_string(),
        })
        .await
        .unwrap();

    let order: Vec<&str> = result.comparisons.iter().map(|c| c.dimension.as_str()).collect();
    assert_eq!(order, vec!["centralindia", "eastus", "westeurope"]);
    assert_eq!(result.comparisons[1].spot_price, Some(0.0192));
    assert_eq!(result.skipped_regions.len(), 1);
    assert_eq!(result.skipped_regions[0].region, "nowhere");
    assert!(matches!(result.skipped_regions[0].reason, SkipReason::Failed(_)));
}

// ============================================================================
// Tool dispatch
// ============================================================================

#[tokio::test]
async fn test_dispatch_strips_discounts_and_renders() {
    let service = PricingService::new(FixtureSource::new());

    let output = dispatch(
        &service,
        Tool::RegionRecommend,
        json!({
            "service_name": "Virtual Machines",
            "sku_name": "D2s v3",
            "discount_percentage": 20,
        }),
    )
    .await
    .unwrap();

    let text = render::render(&output);
    assert!(text.starts_with("Region Recommendations for Virtual Machines - D2s v3"));
    assert!(text.contains("| 1 | centralindia | IN Central | $0.083000/1 Hour |"));
    assert!(!text.to_lowercase().contains("discount"));
}

#[tokio::test]
async fn test_sku_discovery_by_nickname() {
    let source = FixtureSource::new();
    let service = PricingService::new(source);

    let output = dispatch(&service, Tool::SkuDiscovery, json!({ "service_hint": "virtual machines" }))
        .await
        .unwrap();

    let ToolOutput::Discovery(DiscoveryResult::Found { catalog, match_type, .. }) = &output else {
        panic!("expected a catalog");
    };
    assert_eq!(*match_type, MatchType::ExactMapping);
    assert_eq!(catalog.total_skus, 3);
    assert_eq!(catalog.skus["D2s v3"].regions.len(), 3);
    assert_eq!(catalog.skus["D2s v3"].min_price, 0.083);

    let text = render::render(&output);
    assert!(text.starts_with("SKU Discovery for 'virtual machines' (mapped to: Virtual Machines)"));
}

#[tokio::test]
async fn test_queries_respect_page_ceiling() {
    let source = std::sync::Arc::new(FixtureSource::new());
    let service = PricingService::new(ArcSource(source.clone()));

    service
        .search(SearchCriteria::new().with_service("Virtual Machines").with_limit(5000))
        .await
        .unwrap();
    service
        .search(SearchCriteria::new().with_service("Virtual Machines").with_limit(999))
        .await
        .unwrap();

    let tops: Vec<Option<usize>> = source.queries().iter().map(|q| q.top).collect();
    assert_eq!(tops, vec![None, Some(999)]);
}

/// Shares one fixture between the service and the test body.
struct ArcSource(std::sync::Arc<FixtureSource>);

#[async_trait]
impl PriceSource for ArcSource {
    async fn fetch(&self, query: &PriceQuery) -> PricingResult<PricePage> {
        self.0.fetch(query).await
    }
}
