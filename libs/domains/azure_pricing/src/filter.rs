//! OData `$filter` construction for the retail prices API.

use crate::models::SearchCriteria;

/// Ordered list of filter clauses joined with `and`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ODataFilter {
    clauses: Vec<String>,
}

impl ODataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `field eq 'value'`
    pub fn eq(mut self, field: &str, value: &str) -> Self {
        self.clauses.push(format!("{} eq '{}'", field, quote(value)));
        self
    }

    /// `contains(field, 'value')`
    pub fn contains(mut self, field: &str, value: &str) -> Self {
        self.clauses.push(format!("contains({}, '{}')", field, quote(value)));
        self
    }

    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    pub fn into_clauses(self) -> Vec<String> {
        self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The `$filter` value, or `None` when there is nothing to filter on.
    pub fn build(&self) -> Option<String> {
        if self.clauses.is_empty() {
            None
        } else {
            Some(self.clauses.join(" and "))
        }
    }
}

/// Escape a string literal: OData doubles embedded single quotes.
fn quote(value: &str) -> String {
    value.replace('\'', "''")
}

/// Filter for `criteria` with `sku_term` in place of the raw SKU.
///
/// Clause order is fixed: service, region, SKU, price type.
pub fn criteria_filter(criteria: &SearchCriteria, sku_term: Option<&str>) -> ODataFilter {
    let mut filter = ODataFilter::new();

    if let Some(service) = non_blank(criteria.service_name.as_deref()) {
        filter = filter.eq("serviceName", service);
    }
    if let Some(region) = non_blank(criteria.region.as_deref()) {
        filter = filter.eq("armRegionName", region);
    }
    if let Some(sku) = non_blank(sku_term) {
        filter = filter.contains("skuName", sku);
    }
    if let Some(price_type) = non_blank(criteria.price_type.as_deref()) {
        filter = filter.eq("priceType", price_type);
    }

    filter
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
