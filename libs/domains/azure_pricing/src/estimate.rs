//! Monthly and yearly cost projection for one SKU in one region.

use serde::Serialize;
use tracing::{info, instrument};

use crate::client::PriceSource;
use crate::error::{PricingError, PricingResult};
use crate::models::{PriceRow, SearchCriteria};
use crate::service::PricingService;

/// Always-on usage
pub const HOURS_PER_MONTH: f64 = 730.0;

const ESTIMATE_SAMPLE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRequest {
    pub service_name: String,
    pub sku_name: String,
    pub region: String,
    pub hours_per_month: f64,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageAssumptions {
    pub hours_per_month: f64,
    pub hours_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnDemandPricing {
    pub hourly_rate: f64,
    pub daily_cost: f64,
    pub monthly_cost: f64,
    pub yearly_cost: f64,
}

/// Savings plan cost for one commitment term, relative to on-demand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsPlanEstimate {
    pub term: String,
    pub hourly_rate: f64,
    pub monthly_cost: f64,
    pub yearly_cost: f64,
    pub savings_percent: f64,
    pub annual_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub service_name: String,
    pub sku_name: String,
    pub region: String,
    pub product_name: String,
    pub unit_of_measure: String,
    pub currency: String,
    pub usage_assumptions: UsageAssumptions,
    pub on_demand_pricing: OnDemandPricing,
    pub savings_plans: Vec<SavingsPlanEstimate>,
}

impl<S: PriceSource> PricingService<S> {
    /// Project costs for a SKU. `Ok(None)` means no pricing was found.
    #[instrument(skip(self, request), fields(service = %request.service_name, sku = %request.sku_name, region = %request.region))]
    pub async fn estimate_cost(&self, request: EstimateRequest) -> PricingResult<Option<CostEstimate>> {
        if !request.hours_per_month.is_finite() || request.hours_per_month <= 0.0 {
            return Err(PricingError::InvalidInput(format!(
                "hours_per_month must be a positive number, got {}",
                request.hours_per_month
            )));
        }

        let criteria = SearchCriteria::new()
            .with_service(request.service_name.clone())
            .with_region(request.region.clone())
            .with_sku(request.sku_name.clone())
            .with_currency(request.currency_code.clone())
            .with_limit(ESTIMATE_SAMPLE_LIMIT);
        let (envelope, _) = self.query_sku_candidates(&criteria).await?;

        let Some(row) = envelope
            .rows
            .iter()
            .find(|r| r.is_on_demand())
            .or_else(|| envelope.rows.first())
        else {
            info!("No pricing rows for cost estimate");
            return Ok(None);
        };

        Ok(Some(build_estimate(&request, row)))
    }
}

/// Pure projection of `row` over the requested usage.
pub fn build_estimate(request: &EstimateRequest, row: &PriceRow) -> CostEstimate {
    let hours = request.hours_per_month;
    let hourly = row.retail_price;
    let monthly = hourly * hours;
    let yearly = monthly * 12.0;

    let savings_plans = row
        .savings_plan
        .iter()
        .map(|plan| {
            let plan_monthly = plan.retail_price * hours;
            let plan_yearly = plan_monthly * 12.0;
            let savings_percent = if hourly > 0.0 {
                (hourly - plan.retail_price) / hourly * 100.0
            } else {
                0.0
            };
            SavingsPlanEstimate {
                term: plan.term.clone(),
                hourly_rate: round_money(plan.retail_price),
                monthly_cost: round_money(plan_monthly),
                yearly_cost: round_money(plan_yearly),
                savings_percent: round_percent(savings_percent),
                annual_savings: round_money(yearly - plan_yearly),
            }
        })
        .collect();

    CostEstimate {
        service_name: request.service_name.clone(),
        sku_name: row.sku_name.clone(),
        region: request.region.clone(),
        product_name: row.product_name.clone(),
        unit_of_measure: row.unit_of_measure.clone(),
        currency: request.currency_code.clone(),
        usage_assumptions: UsageAssumptions {
            hours_per_month: hours,
            hours_per_day: round_percent(hours / 30.0),
        },
        on_demand_pricing: OnDemandPricing {
            hourly_rate: round_money(hourly),
            daily_cost: round_money(hourly * 24.0),
            monthly_cost: round_money(monthly),
            yearly_cost: round_money(yearly),
        },
        savings_plans,
    }
}

pub(crate) fn round_money(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub(crate) fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
