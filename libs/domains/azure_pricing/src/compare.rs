//! Price comparison across regions or across SKUs of one service.

use futures::future::join_all;
use serde::Serialize;
use strum::Display;
use tracing::{debug, info, instrument, warn};

use crate::client::PriceSource;
use crate::error::PricingResult;
use crate::metrics::PricingMetrics;
use crate::models::SearchCriteria;
use crate::service::PricingService;

/// Rows fetched per region; the first one represents the region
const REGION_SAMPLE_LIMIT: usize = 10;

/// Rows fetched for a SKU comparison
const SKU_SAMPLE_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComparisonType {
    Regions,
    Skus,
}

/// One compared price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    /// Region code in region mode, SKU name in SKU mode
    pub dimension: String,
    pub sku_name: String,
    pub product_name: String,
    pub region: String,
    pub location: String,
    /// `0.0` may mean the upstream row had no price
    pub retail_price: f64,
    pub unit_of_measure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    NoPricing,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRegion {
    pub region: String,
    pub reason: SkipReason,
}

/// What a single region's sub-query produced
#[derive(Debug, Clone, PartialEq)]
pub enum RegionOutcome {
    Priced(ComparisonRow),
    Skipped(SkippedRegion),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareRequest {
    pub service_name: String,
    pub sku_name: Option<String>,
    /// Empty selects SKU mode
    pub regions: Vec<String>,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub service_name: String,
    pub currency: String,
    pub comparison_type: ComparisonType,
    /// Ascending by retail price
    pub comparisons: Vec<ComparisonRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_regions: Vec<SkippedRegion>,
}

impl<S: PriceSource> PricingService<S> {
    /// Compare prices by region when regions are given, otherwise by SKU.
    ///
    /// In region mode a failing region is skipped and reported in
    /// `skipped_regions`; it never fails the comparison.
    #[instrument(skip(self, request), fields(service = %request.service_name, regions = request.regions.len()))]
    pub async fn compare(&self, request: CompareRequest) -> PricingResult<ComparisonResult> {
        let mut regions: Vec<String> = Vec::new();
        for region in request.regions.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
            if !regions.iter().any(|r| r == region) {
                regions.push(region.to_string());
            }
        }

        let (comparison_type, mut comparisons, skipped_regions) = if regions.is_empty() {
            (ComparisonType::Skus, self.compare_skus(&request).await?, Vec::new())
        } else {
            let (priced, skipped) = self.compare_regions(&request, &regions).await;
            (ComparisonType::Regions, priced, skipped)
        };

        sort_by_price(&mut comparisons);

        info!(
            comparison_type = %comparison_type,
            rows = comparisons.len(),
            skipped = skipped_regions.len(),
            "Price comparison complete"
        );

        Ok(ComparisonResult {
            service_name: request.service_name,
            currency: request.currency_code,
            comparison_type,
            comparisons,
            skipped_regions,
        })
    }

    /// Concurrent per-region lookups. Output follows `regions` order.
    async fn compare_regions(
        &self,
        request: &CompareRequest,
        regions: &[String],
    ) -> (Vec<ComparisonRow>, Vec<SkippedRegion>) {
        let outcomes = join_all(regions.iter().map(|region| self.price_region(request, region))).await;

        let mut priced = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                RegionOutcome::Priced(row) => priced.push(row),
                RegionOutcome::Skipped(region) => skipped.push(region),
            }
        }

        (priced, skipped)
    }

    async fn price_region(&self, request: &CompareRequest, region: &str) -> RegionOutcome {
        let mut criteria = SearchCriteria::new()
            .with_service(request.service_name.clone())
            .with_region(region)
            .with_currency(request.currency_code.clone())
            .with_limit(REGION_SAMPLE_LIMIT);
        criteria.sku_name = request.sku_name.clone();

        match self.query_sku_candidates(&criteria).await {
            Ok((envelope, _)) => match envelope.rows.first() {
                Some(first) => {
                    let spot_price = envelope.rows.iter().find(|r| r.is_spot()).map(|r| r.retail_price);
                    RegionOutcome::Priced(ComparisonRow {
                        dimension: region.to_string(),
                        sku_name: first.sku_name.clone(),
                        product_name: first.product_name.clone(),
                        region: region.to_string(),
                        location: first.location.clone(),
                        retail_price: first.retail_price,
                        unit_of_measure: first.unit_of_measure.clone(),
                        spot_price,
                    })
                }
                None => {
                    debug!(region = region, "No pricing rows for region");
                    PricingMetrics::record_region_skipped("no_pricing");
                    RegionOutcome::Skipped(SkippedRegion {
                        region: region.to_string(),
                        reason: SkipReason::NoPricing,
                    })
                }
            },
            Err(e) => {
                warn!(region = region, error = %e, "Failed to get prices for region, skipping");
                PricingMetrics::record_region_skipped("failed");
                RegionOutcome::Skipped(SkippedRegion {
                    region: region.to_string(),
                    reason: SkipReason::Failed(e.to_string()),
                })
            }
        }
    }

    /// First-seen row per distinct SKU name, in upstream order.
    async fn compare_skus(&self, request: &CompareRequest) -> PricingResult<Vec<ComparisonRow>> {
        let criteria = SearchCriteria::new()
            .with_service(request.service_name.clone())
            .with_currency(request.currency_code.clone())
            .with_limit(SKU_SAMPLE_LIMIT);
        let envelope = self.query(&criteria, None).await?;

        let mut rows: Vec<ComparisonRow> = Vec::new();
        for item in envelope.rows {
            if item.sku_name.is_empty() || rows.iter().any(|r| r.sku_name == item.sku_name) {
                continue;
            }
            rows.push(ComparisonRow {
                dimension: item.sku_name.clone(),
                sku_name: item.sku_name,
                product_name: item.product_name,
                region: item.arm_region_name,
                location: item.location,
                retail_price: item.retail_price,
                unit_of_measure: item.unit_of_measure,
                spot_price: None,
            });
        }

        Ok(rows)
    }
}

/// Stable ascending sort; equal prices keep their input order.
pub fn sort_by_price(rows: &mut [ComparisonRow]) {
    rows.sort_by(|a, b| a.retail_price.total_cmp(&b.retail_price));
}
