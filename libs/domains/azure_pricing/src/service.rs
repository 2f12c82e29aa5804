use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::client::{PriceQuery, PriceSource};
use crate::error::PricingResult;
use crate::filter::{ODataFilter, criteria_filter};
use crate::models::{
    Clarification, DEFAULT_CURRENCY, PriceRow, ResultEnvelope, SearchCriteria, SkuSuggestion,
    SkuValidation,
};
use crate::resolver::{NormalizedSkuTerm, normalize_sku};

/// Rows fetched when looking for alternatives to an unknown SKU
const VALIDATION_SAMPLE_LIMIT: usize = 100;

/// Alternatives offered for an unknown SKU
pub const MAX_SKU_SUGGESTIONS: usize = 5;

/// Distinct SKU names listed when a SKU term is ambiguous
const MAX_CLARIFICATIONS: usize = 5;

/// Query, comparison and discovery operations over a [`PriceSource`]
pub struct PricingService<S: PriceSource> {
    source: Arc<S>,
    default_currency: String,
}

impl<S: PriceSource> Clone for PricingService<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            default_currency: self.default_currency.clone(),
        }
    }
}

impl<S: PriceSource> PricingService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Currency used by tool calls that do not name one
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    /// Search prices, normalizing the SKU filter.
    ///
    /// SKU candidates are tried in order until one returns rows. When none
    /// does, the envelope carries a [`SkuValidation`] with alternatives; when
    /// the match spans several SKUs it carries a [`Clarification`].
    #[instrument(skip(self), fields(service = ?criteria.service_name, region = ?criteria.region, sku = ?criteria.sku_name))]
    pub async fn search(&self, criteria: SearchCriteria) -> PricingResult<ResultEnvelope> {
        let (mut envelope, term) = self.query_sku_candidates(&criteria).await?;

        if !term.is_empty() {
            if envelope.is_empty() {
                envelope.sku_validation = self.validate_sku(&criteria, &term).await;
            } else {
                envelope.clarification = clarify(&term, &envelope.rows);
            }
        }

        info!(
            count = envelope.count,
            has_more = envelope.has_more,
            "Price search complete"
        );

        Ok(envelope)
    }

    /// One upstream request for `criteria`, with `sku_term` as the SKU clause.
    pub(crate) async fn query(
        &self,
        criteria: &SearchCriteria,
        sku_term: Option<&str>,
    ) -> PricingResult<ResultEnvelope> {
        self.query_filter(criteria_filter(criteria, sku_term), &criteria.currency_code, criteria.limit)
            .await
    }

    /// One upstream request for an arbitrary filter.
    pub(crate) async fn query_filter(
        &self,
        filter: ODataFilter,
        currency_code: &str,
        limit: usize,
    ) -> PricingResult<ResultEnvelope> {
        let query = PriceQuery::new(filter.build(), currency_code, limit);
        let page = self.source.fetch(&query).await?;

        Ok(ResultEnvelope::from_page(
            page,
            limit,
            currency_code,
            filter.into_clauses(),
        ))
    }

    /// Like [`Self::query`], trying each normalized SKU candidate until one
    /// returns rows. Without a SKU this is a single request.
    pub(crate) async fn query_sku_candidates(
        &self,
        criteria: &SearchCriteria,
    ) -> PricingResult<(ResultEnvelope, NormalizedSkuTerm)> {
        let term = criteria.sku().map(normalize_sku).unwrap_or_default();

        let Some((first, rest)) = term.candidates.split_first() else {
            return Ok((self.query(criteria, None).await?, term));
        };

        let mut envelope = self.query(criteria, Some(first)).await?;
        for candidate in rest {
            if !envelope.is_empty() {
                break;
            }
            debug!(candidate = %candidate, "No rows for SKU candidate, trying next");
            envelope = self.query(criteria, Some(candidate)).await?;
        }

        Ok((envelope, term))
    }

    /// Best-effort alternatives for a SKU that matched nothing.
    async fn validate_sku(
        &self,
        criteria: &SearchCriteria,
        term: &NormalizedSkuTerm,
    ) -> Option<SkuValidation> {
        let requested = criteria.sku()?.to_string();

        // Bounded by the sample limit even when no other filter remains.
        let broader = SearchCriteria {
            sku_name: None,
            limit: VALIDATION_SAMPLE_LIMIT,
            ..criteria.clone()
        };

        match self.query(&broader, None).await {
            Ok(envelope) => {
                let suggestions = suggest_skus(&term.display_name, &envelope.rows);
                let message = if suggestions.is_empty() {
                    format!("SKU '{}' was not found and no alternatives are available", requested)
                } else {
                    format!("SKU '{}' was not found", requested)
                };
                Some(SkuValidation {
                    requested_sku: requested,
                    message,
                    suggestions,
                })
            }
            Err(e) => {
                warn!(sku = %requested, error = %e, "SKU validation lookup failed");
                None
            }
        }
    }
}

/// Cheapest distinct SKUs, preferring those sharing a word with `display_name`.
fn suggest_skus(display_name: &str, rows: &[PriceRow]) -> Vec<SkuSuggestion> {
    let tokens: Vec<String> = display_name.split_whitespace().map(str::to_lowercase).collect();

    let related: Vec<&PriceRow> = rows
        .iter()
        .filter(|row| {
            let name = row.sku_name.to_lowercase();
            tokens.iter().any(|t| name.contains(t.as_str()))
        })
        .collect();
    let pool: Vec<&PriceRow> = if related.is_empty() {
        rows.iter().collect()
    } else {
        related
    };

    let mut cheapest: Vec<&PriceRow> = Vec::new();
    for row in pool.into_iter().filter(|r| !r.sku_name.is_empty()) {
        match cheapest.iter_mut().find(|c| c.sku_name == row.sku_name) {
            Some(existing) if row.retail_price < existing.retail_price => *existing = row,
            Some(_) => {}
            None => cheapest.push(row),
        }
    }
    cheapest.sort_by(|a, b| a.retail_price.total_cmp(&b.retail_price));

    cheapest
        .into_iter()
        .take(MAX_SKU_SUGGESTIONS)
        .map(|row| SkuSuggestion {
            sku_name: row.sku_name.clone(),
            price: row.retail_price,
            unit: row.unit_of_measure.clone(),
            region: (!row.arm_region_name.is_empty()).then(|| row.arm_region_name.clone()),
        })
        .collect()
}

fn clarify(term: &NormalizedSkuTerm, rows: &[PriceRow]) -> Option<Clarification> {
    let mut names: Vec<&str> = Vec::new();
    for row in rows {
        if !names.contains(&row.sku_name.as_str()) {
            names.push(&row.sku_name);
        }
    }

    (names.len() > 1).then(|| Clarification {
        message: format!(
            "'{}' matched {} different SKUs; refine the SKU name for an exact match",
            term.display_name,
            names.len()
        ),
        suggestions: names
            .into_iter()
            .take(MAX_CLARIFICATIONS)
            .map(str::to_string)
            .collect(),
    })
}
