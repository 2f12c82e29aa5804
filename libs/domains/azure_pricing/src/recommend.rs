//! Cheapest-region ranking for one SKU.

use serde::Serialize;
use tracing::{info, instrument};

use crate::client::PriceSource;
use crate::error::PricingResult;
use crate::estimate::round_percent;
use crate::models::{MAX_PAGE_SIZE, PriceRow, SearchCriteria};
use crate::service::PricingService;

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendRequest {
    pub service_name: String,
    pub sku_name: String,
    pub top_n: usize,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionRecommendation {
    pub region: String,
    pub location: String,
    /// Lowest on-demand price seen in the region
    pub retail_price: f64,
    pub unit_of_measure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_price: Option<f64>,
    /// Percent below the most expensive region found
    pub savings_vs_most_expensive: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationSummary {
    pub cheapest_region: String,
    pub cheapest_location: String,
    pub cheapest_price: f64,
    pub most_expensive_region: String,
    pub most_expensive_price: f64,
    pub max_savings_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionRecommendations {
    pub service_name: String,
    pub sku_name: String,
    pub currency: String,
    pub total_regions_found: usize,
    pub showing_top: usize,
    pub recommendations: Vec<RegionRecommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RecommendationSummary>,
}

impl<S: PriceSource> PricingService<S> {
    /// Rank every region offering the SKU by on-demand price.
    #[instrument(skip(self, request), fields(service = %request.service_name, sku = %request.sku_name))]
    pub async fn recommend_regions(&self, request: RecommendRequest) -> PricingResult<RegionRecommendations> {
        let criteria = SearchCriteria::new()
            .with_service(request.service_name.clone())
            .with_sku(request.sku_name.clone())
            .with_currency(request.currency_code.clone())
            .with_limit(MAX_PAGE_SIZE);
        let (envelope, _) = self.query_sku_candidates(&criteria).await?;

        let ranked = rank_regions(&envelope.rows);
        let total_regions_found = ranked.len();

        let summary = match (ranked.first(), ranked.last()) {
            (Some(cheapest), Some(priciest)) => Some(RecommendationSummary {
                cheapest_region: cheapest.region.clone(),
                cheapest_location: cheapest.location.clone(),
                cheapest_price: cheapest.retail_price,
                most_expensive_region: priciest.region.clone(),
                most_expensive_price: priciest.retail_price,
                max_savings_percent: cheapest.savings_vs_most_expensive,
            }),
            _ => None,
        };

        let recommendations: Vec<RegionRecommendation> = ranked.into_iter().take(request.top_n).collect();

        info!(
            regions = total_regions_found,
            showing = recommendations.len(),
            "Region recommendation complete"
        );

        Ok(RegionRecommendations {
            service_name: request.service_name,
            sku_name: request.sku_name,
            currency: request.currency_code,
            total_regions_found,
            showing_top: recommendations.len(),
            recommendations,
            summary,
        })
    }
}

/// Per-region on-demand minimum (with spot minimum), cheapest first.
/// Regions with only spot or low priority rows are left out.
pub fn rank_regions(rows: &[PriceRow]) -> Vec<RegionRecommendation> {
    let mut regions: Vec<RegionRecommendation> = Vec::new();

    for row in rows.iter().filter(|r| r.is_on_demand() && !r.arm_region_name.is_empty()) {
        match regions.iter_mut().find(|r| r.region == row.arm_region_name) {
            Some(existing) if row.retail_price < existing.retail_price => {
                existing.retail_price = row.retail_price;
                existing.unit_of_measure = row.unit_of_measure.clone();
            }
            Some(_) => {}
            None => regions.push(RegionRecommendation {
                region: row.arm_region_name.clone(),
                location: row.location.clone(),
                retail_price: row.retail_price,
                unit_of_measure: row.unit_of_measure.clone(),
                spot_price: None,
                savings_vs_most_expensive: 0.0,
            }),
        }
    }

    for row in rows.iter().filter(|r| r.is_spot()) {
        if let Some(region) = regions.iter_mut().find(|r| r.region == row.arm_region_name) {
            region.spot_price = Some(match region.spot_price {
                Some(current) => current.min(row.retail_price),
                None => row.retail_price,
            });
        }
    }

    regions.sort_by(|a, b| a.retail_price.total_cmp(&b.retail_price));

    let max_price = regions.last().map(|r| r.retail_price).unwrap_or_default();
    if max_price > 0.0 {
        for region in &mut regions {
            region.savings_vs_most_expensive =
                round_percent((max_price - region.retail_price) / max_price * 100.0);
        }
    }

    regions
}
