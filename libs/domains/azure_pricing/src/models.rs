use serde::{Deserialize, Serialize};

/// Currency used when the caller does not name one
pub const DEFAULT_CURRENCY: &str = "USD";

/// Result limit used when the caller does not name one
pub const DEFAULT_LIMIT: usize = 50;

/// Largest page the retail prices API will return
pub const MAX_PAGE_SIZE: usize = 1000;

/// One term-committed savings plan price attached to a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SavingsPlanTerm {
    pub unit_price: f64,
    pub retail_price: f64,
    pub term: String,
}

/// One priced SKU in one region, as returned by the retail prices API.
///
/// Field names match the upstream JSON so rows serialize back out unchanged.
/// A missing `retailPrice` deserializes to `0.0`; treat a zero price as
/// possibly missing data rather than a free tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceRow {
    pub service_name: String,
    pub service_family: String,
    pub product_name: String,
    pub sku_name: String,
    pub arm_sku_name: Option<String>,
    pub meter_name: String,
    pub arm_region_name: String,
    pub location: String,
    pub currency_code: String,
    pub retail_price: f64,
    pub unit_price: f64,
    /// Pre-promotion price, only present on some rows. Passed through as-is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    pub unit_of_measure: String,
    #[serde(rename = "type")]
    pub price_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_term: Option<String>,
    pub effective_start_date: String,
    pub savings_plan: Vec<SavingsPlanTerm>,
}

impl PriceRow {
    pub fn is_spot(&self) -> bool {
        self.sku_name.contains("Spot")
    }

    pub fn is_low_priority(&self) -> bool {
        self.sku_name.contains("Low Priority")
    }

    pub fn is_reservation(&self) -> bool {
        self.price_type.eq_ignore_ascii_case("Reservation")
    }

    /// Pay-as-you-go row that is neither spot nor low priority.
    pub fn is_on_demand(&self) -> bool {
        self.price_type.eq_ignore_ascii_case("Consumption")
            && !self.is_spot()
            && !self.is_low_priority()
    }
}

/// One page of the upstream response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PricePage {
    #[serde(rename = "Items", default)]
    pub items: Vec<PriceRow>,
    #[serde(rename = "NextPageLink", default)]
    pub next_page_link: Option<String>,
}

impl PricePage {
    pub fn has_more(&self) -> bool {
        self.next_page_link.as_deref().is_some_and(|link| !link.is_empty())
    }
}

/// Caller-supplied search filter
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    pub service_name: Option<String>,
    pub region: Option<String>,
    pub sku_name: Option<String>,
    /// `Consumption`, `Reservation`, `DevTestConsumption`
    pub price_type: Option<String>,
    pub currency_code: String,
    /// Values above [`MAX_PAGE_SIZE`] are accepted; truncation then happens locally.
    pub limit: usize,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            service_name: None,
            region: None,
            sku_name: None,
            price_type: None,
            currency_code: DEFAULT_CURRENCY.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_sku(mut self, sku_name: impl Into<String>) -> Self {
        self.sku_name = Some(sku_name.into());
        self
    }

    pub fn with_price_type(mut self, price_type: impl Into<String>) -> Self {
        self.price_type = Some(price_type.into());
        self
    }

    pub fn with_currency(mut self, currency_code: impl Into<String>) -> Self {
        self.currency_code = currency_code.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// SKU filter, ignoring blank input.
    pub fn sku(&self) -> Option<&str> {
        self.sku_name.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// A SKU offered when the requested one returned nothing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkuSuggestion {
    pub sku_name: String,
    pub price: f64,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Attached to a search whose SKU filter matched nothing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkuValidation {
    pub requested_sku: String,
    pub message: String,
    pub suggestions: Vec<SkuSuggestion>,
}

/// Attached to a search whose SKU filter matched several distinct SKUs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clarification {
    pub message: String,
    pub suggestions: Vec<String>,
}

/// Uniform search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub rows: Vec<PriceRow>,
    /// Always `rows.len()`
    pub count: usize,
    /// Upstream reported another page, independent of local truncation
    pub has_more: bool,
    pub currency: String,
    pub filters_applied: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku_validation: Option<SkuValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarification: Option<Clarification>,
}

impl ResultEnvelope {
    /// Build an envelope from an upstream page, keeping at most `limit` rows.
    pub fn from_page(page: PricePage, limit: usize, currency: &str, filters: Vec<String>) -> Self {
        let has_more = page.has_more();
        let mut rows = page.items;
        rows.truncate(limit);

        Self {
            count: rows.len(),
            rows,
            has_more,
            currency: currency.to_string(),
            filters_applied: filters,
            sku_validation: None,
            clarification: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
