//! Reserved instance pricing with on-demand comparison.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::client::PriceSource;
use crate::error::PricingResult;
use crate::estimate::{round_money, round_percent};
use crate::models::{PriceRow, SearchCriteria};
use crate::service::PricingService;

const RESERVATION_SAMPLE_LIMIT: usize = 100;

/// Hours covered by a reservation term, `None` for unknown terms.
pub fn term_hours(term: &str) -> Option<f64> {
    match term.trim().to_ascii_lowercase().as_str() {
        "1 year" => Some(8_760.0),
        "3 years" => Some(26_280.0),
        "5 years" => Some(43_800.0),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReservationRequest {
    pub service_name: String,
    pub sku_name: Option<String>,
    pub region: Option<String>,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationOption {
    pub sku_name: String,
    pub product_name: String,
    pub region: String,
    pub location: String,
    pub term: String,
    /// Upfront price for the whole term
    pub total_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_equivalent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_demand_hourly: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savings_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationPricing {
    pub service_name: String,
    pub currency: String,
    pub options: Vec<ReservationOption>,
}

impl<S: PriceSource> PricingService<S> {
    /// List reservation prices. The on-demand comparison is best-effort and
    /// its failure only drops the savings columns.
    #[instrument(skip(self, request), fields(service = %request.service_name, sku = ?request.sku_name, region = ?request.region))]
    pub async fn reservation_pricing(&self, request: ReservationRequest) -> PricingResult<ReservationPricing> {
        let mut criteria = SearchCriteria::new()
            .with_service(request.service_name.clone())
            .with_currency(request.currency_code.clone())
            .with_limit(RESERVATION_SAMPLE_LIMIT);
        criteria.sku_name = request.sku_name.clone();
        criteria.region = request.region.clone();

        let reserved_criteria = criteria.clone().with_price_type("Reservation");
        let (reserved, _) = self.query_sku_candidates(&reserved_criteria).await?;

        let on_demand = if reserved.is_empty() {
            Vec::new()
        } else {
            let on_demand_criteria = criteria.with_price_type("Consumption");
            match self.query_sku_candidates(&on_demand_criteria).await {
                Ok((envelope, _)) => envelope.rows,
                Err(e) => {
                    warn!(error = %e, "On-demand lookup for reservation comparison failed");
                    Vec::new()
                }
            }
        };

        let options = build_options(&reserved.rows, &on_demand);
        info!(options = options.len(), "Reservation pricing complete");

        Ok(ReservationPricing {
            service_name: request.service_name,
            currency: request.currency_code,
            options,
        })
    }
}

/// One option per reservation row, ordered by SKU, region and term length.
pub fn build_options(reserved: &[PriceRow], on_demand: &[PriceRow]) -> Vec<ReservationOption> {
    let mut options: Vec<ReservationOption> = reserved
        .iter()
        .filter(|row| row.is_reservation())
        .map(|row| {
            let term = row.reservation_term.clone().unwrap_or_default();
            let hourly_equivalent = term_hours(&term).map(|hours| row.retail_price / hours);
            let on_demand_hourly = on_demand
                .iter()
                .filter(|od| {
                    od.is_on_demand()
                        && od.sku_name == row.sku_name
                        && od.arm_region_name == row.arm_region_name
                })
                .map(|od| od.retail_price)
                .min_by(f64::total_cmp);

            let savings_percent = match (hourly_equivalent, on_demand_hourly) {
                (Some(reserved), Some(od)) if od > 0.0 => Some(round_percent((od - reserved) / od * 100.0)),
                _ => None,
            };

            ReservationOption {
                sku_name: row.sku_name.clone(),
                product_name: row.product_name.clone(),
                region: row.arm_region_name.clone(),
                location: row.location.clone(),
                term,
                total_price: row.retail_price,
                hourly_equivalent: hourly_equivalent.map(round_money),
                on_demand_hourly,
                savings_percent,
            }
        })
        .collect();

    options.sort_by(|a, b| {
        a.sku_name
            .cmp(&b.sku_name)
            .then_with(|| a.region.cmp(&b.region))
            .then_with(|| {
                let a_hours = term_hours(&a.term).unwrap_or(f64::MAX);
                let b_hours = term_hours(&b.term).unwrap_or(f64::MAX);
                a_hours.total_cmp(&b_hours)
            })
    });

    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockPriceSource;
    use crate::error::PricingError;
    use crate::service::test_support::{page, row};

    fn reserved(sku: &str, region: &str, term: &str, price: f64) -> PriceRow {
        let mut row = row(sku, region, price);
        row.price_type = "Reservation".to_string();
        row.reservation_term = Some(term.to_string());
        row.unit_of_measure = "1 Hour".to_string();
        row
    }

    fn request() -> ReservationRequest {
        ReservationRequest {
            service_name: "Virtual Machines".to_string(),
            sku_name: Some("D2s v3".to_string()),
            region: Some("eastus".to_string()),
            currency_code: "USD".to_string(),
        }
    }

    #[test]
    fn test_term_hours() {
        assert_eq!(term_hours("1 Year"), Some(8_760.0));
        assert_eq!(term_hours("3 Years"), Some(26_280.0));
        assert_eq!(term_hours("5 years"), Some(43_800.0));
        assert_eq!(term_hours("2 Years"), None);
    }

    #[test]
    fn test_build_options_computes_savings() {
        let options = build_options(
            &[
                reserved("D2s v3", "eastus", "3 Years", 1_051.2),
                reserved("D2s v3", "eastus", "1 Year", 525.6),
            ],
            &[row("D2s v3", "eastus", 0.096), row("D2s v3 Spot", "eastus", 0.019)],
        );

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].term, "1 Year");
        assert_eq!(options[0].hourly_equivalent, Some(0.06));
        assert_eq!(options[0].on_demand_hourly, Some(0.096));
        assert_eq!(options[0].savings_percent, Some(37.5));

        assert_eq!(options[1].term, "3 Years");
        assert_eq!(options[1].hourly_equivalent, Some(0.04));
    }

    #[tokio::test]
    async fn test_on_demand_failure_keeps_reservation_rows() {
        let mut source = MockPriceSource::new();
        source.expect_fetch().returning(|q| {
            let filter = q.filter.clone().unwrap_or_default();
            if filter.contains("priceType eq 'Reservation'") {
                Ok(page(vec![reserved("D2s v3", "eastus", "1 Year", 525.6)]))
            } else {
                Err(PricingError::UpstreamStatus {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            }
        });

        let service = PricingService::new(source);
        let pricing = service.reservation_pricing(request()).await.unwrap();

        assert_eq!(pricing.options.len(), 1);
        assert_eq!(pricing.options[0].hourly_equivalent, Some(0.06));
        assert!(pricing.options[0].on_demand_hourly.is_none());
        assert!(pricing.options[0].savings_percent.is_none());
    }

    #[tokio::test]
    async fn test_no_reservations_skips_on_demand_lookup() {
        let mut source = MockPriceSource::new();
        source
            .expect_fetch()
            .withf(|q| q.filter.as_deref().unwrap_or_default().contains("'Reservation'"))
            .returning(|_| Ok(page(vec![])));

        let service = PricingService::new(source);
        let pricing = service.reservation_pricing(request()).await.unwrap();
        assert!(pricing.options.is_empty());
    }
}
