//! Plain-text presentation of tool output.

use serde::Serialize;

use crate::compare::{ComparisonResult, SkipReason};
use crate::discovery::{DiscoveryResult, MatchType, SkuCatalog};
use crate::estimate::CostEstimate;
use crate::models::{PriceRow, ResultEnvelope, SavingsPlanTerm, SkuValidation};
use crate::recommend::RegionRecommendations;
use crate::reservation::ReservationPricing;
use crate::tools::ToolOutput;

/// Suggestions shown above a non-empty result
const INLINE_SUGGESTIONS: usize = 3;

pub fn render(output: &ToolOutput) -> String {
    match output {
        ToolOutput::Search(envelope) => render_search(envelope),
        ToolOutput::Compare(result) => render_comparison(result),
        ToolOutput::Estimate {
            sku_name,
            region,
            estimate,
        } => match estimate {
            Some(estimate) => render_estimate(estimate),
            None => format!("No pricing found for {} in {}.", sku_name, region),
        },
        ToolOutput::SkuCatalog(catalog) => render_catalog(catalog),
        ToolOutput::Discovery(result) => render_discovery(result),
        ToolOutput::Recommend(result) => render_recommendations(result),
        ToolOutput::Reservation(result) => render_reservations(result),
    }
}

#[derive(Serialize)]
struct PricingLine<'a> {
    service: &'a str,
    product: &'a str,
    sku: &'a str,
    region: &'a str,
    location: &'a str,
    price: f64,
    unit: &'a str,
    #[serde(rename = "type")]
    price_type: &'a str,
    savings_plans: &'a [SavingsPlanTerm],
    #[serde(skip_serializing_if = "Option::is_none")]
    original_price: Option<f64>,
}

impl<'a> From<&'a PriceRow> for PricingLine<'a> {
    fn from(row: &'a PriceRow) -> Self {
        Self {
            service: &row.service_name,
            product: &row.product_name,
            sku: &row.sku_name,
            region: &row.arm_region_name,
            location: &row.location,
            price: row.retail_price,
            unit: &row.unit_of_measure,
            price_type: &row.price_type,
            savings_plans: &row.savings_plan,
            original_price: row.original_price,
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn render_search(envelope: &ResultEnvelope) -> String {
    if envelope.is_empty() {
        let mut out = String::from("No pricing results found for the specified criteria.");
        if let Some(validation) = &envelope.sku_validation {
            out.push_str(&format!("\n\n{}\n", validation.message));
            if !validation.suggestions.is_empty() {
                out.push_str("\nDid you mean one of these SKUs?\n");
                push_suggestions(&mut out, validation, validation.suggestions.len(), true);
            }
        }
        return out;
    }

    let mut out = format!("Found {} Azure pricing results:\n\n", envelope.count);

    if let Some(validation) = &envelope.sku_validation {
        out.push_str(&format!("SKU Validation: {}\n", validation.message));
        if !validation.suggestions.is_empty() {
            out.push_str("Suggested SKUs:\n");
            push_suggestions(&mut out, validation, INLINE_SUGGESTIONS, false);
            out.push('\n');
        }
    }

    if let Some(clarification) = &envelope.clarification {
        out.push_str(&format!("{}\n", clarification.message));
        if !clarification.suggestions.is_empty() {
            out.push_str("Top matches:\n");
            for name in &clarification.suggestions {
                out.push_str(&format!("   - {}\n", name));
            }
            out.push('\n');
        }
    }

    let lines: Vec<PricingLine<'_>> = envelope.rows.iter().map(PricingLine::from).collect();
    out.push_str("Detailed Pricing:\n");
    out.push_str(&to_json(&lines));
    if envelope.has_more {
        out.push_str("\n\nMore results are available; narrow the filters or raise the limit.");
    }
    out
}

fn push_suggestions(out: &mut String, validation: &SkuValidation, max: usize, with_region: bool) {
    for suggestion in validation.suggestions.iter().take(max) {
        out.push_str(&format!(
            "   - {}: ${} per {}",
            suggestion.sku_name, suggestion.price, suggestion.unit
        ));
        if let (true, Some(region)) = (with_region, &suggestion.region) {
            out.push_str(&format!(" (in {})", region));
        }
        out.push('\n');
    }
}

fn render_comparison(result: &ComparisonResult) -> String {
    let mut out = format!(
        "Price comparison for {} by {} ({}):\n\n",
        result.service_name, result.comparison_type, result.currency
    );
    out.push_str(&to_json(&result.comparisons));

    if !result.skipped_regions.is_empty() {
        out.push_str("\n\nSkipped regions:\n");
        for skipped in &result.skipped_regions {
            let reason = match &skipped.reason {
                SkipReason::NoPricing => "no pricing found".to_string(),
                SkipReason::Failed(message) => format!("lookup failed: {}", message),
            };
            out.push_str(&format!("   - {}: {}\n", skipped.region, reason));
        }
    }
    out
}

fn render_estimate(estimate: &CostEstimate) -> String {
    let usage = &estimate.usage_assumptions;
    let on_demand = &estimate.on_demand_pricing;

    let mut out = format!(
        "Cost Estimate for {} - {}\nRegion: {}\nProduct: {}\nUnit: {}\nCurrency: {}\n",
        estimate.service_name,
        estimate.sku_name,
        estimate.region,
        estimate.product_name,
        estimate.unit_of_measure,
        estimate.currency
    );
    out.push_str(&format!(
        "\nUsage Assumptions:\n- Hours per month: {}\n- Hours per day: {}\n",
        usage.hours_per_month, usage.hours_per_day
    ));
    out.push_str(&format!(
        "\nOn-Demand Pricing:\n- Hourly Rate: ${}\n- Daily Cost: ${}\n- Monthly Cost: ${}\n- Yearly Cost: ${}\n",
        on_demand.hourly_rate, on_demand.daily_cost, on_demand.monthly_cost, on_demand.yearly_cost
    ));

    if !estimate.savings_plans.is_empty() {
        out.push_str("\nSavings Plans Available:\n");
        for plan in &estimate.savings_plans {
            out.push_str(&format!(
                "\n{} Term:\n- Hourly Rate: ${}\n- Monthly Cost: ${}\n- Yearly Cost: ${}\n- Savings: {}% (${} annually)\n",
                plan.term,
                plan.hourly_rate,
                plan.monthly_cost,
                plan.yearly_cost,
                plan.savings_percent,
                plan.annual_savings
            ));
        }
    }
    out
}

fn push_catalog(out: &mut String, catalog: &SkuCatalog) {
    for (product, skus) in catalog.by_product() {
        out.push_str(&format!("{}:\n", product));
        for (sku, summary) in skus {
            out.push_str(&format!(
                "   - {}\n     Price: ${} per {}",
                sku, summary.min_price, summary.sample_unit
            ));
            if summary.regions.len() > 1 {
                out.push_str(&format!(" (available in {} regions)", summary.regions.len()));
            }
            out.push('\n');
        }
        out.push('\n');
    }
}

fn render_catalog(catalog: &SkuCatalog) -> String {
    if catalog.is_empty() {
        return "No SKUs found for the specified service.".to_string();
    }
    let mut out = format!("Found {} SKUs for {}:\n\n", catalog.total_skus, catalog.service_name);
    push_catalog(&mut out, catalog);
    out.trim_end().to_string()
}

fn render_discovery(result: &DiscoveryResult) -> String {
    match result {
        DiscoveryResult::Found {
            original_search,
            service_found,
            match_type,
            catalog,
        } => {
            let mut out = format!("SKU Discovery for '{}'", original_search);
            if *match_type == MatchType::ExactMapping {
                out.push_str(&format!(" (mapped to: {})", service_found));
            }
            out.push_str(&format!("\n\nFound {} SKUs for {}:\n\n", catalog.total_skus, service_found));
            push_catalog(&mut out, catalog);
            out.trim_end().to_string()
        }
        DiscoveryResult::Suggestions {
            original_search,
            suggestions,
        } => {
            let mut out = format!(
                "No exact match found for '{}'\n\nDid you mean one of these services?\n\n",
                original_search
            );
            for (i, suggestion) in suggestions.iter().enumerate() {
                out.push_str(&format!(
                    "{}. {}\n   Reason: {}\n",
                    i + 1,
                    suggestion.service_name,
                    suggestion.match_reason
                ));
                if !suggestion.sample_items.is_empty() {
                    out.push_str("   Sample SKUs:\n");
                    for item in &suggestion.sample_items {
                        out.push_str(&format!(
                            "     - {}: ${} per {}\n",
                            item.sku_name, item.retail_price, item.unit_of_measure
                        ));
                    }
                }
                out.push('\n');
            }
            out.push_str("Try using one of the exact service names above.");
            out
        }
        DiscoveryResult::NoMatch {
            original_search,
            hints,
        } => {
            let mut out = format!("No matches found for '{}'\n\nTry using terms like:\n", original_search);
            let hints: Vec<String> = hints.iter().map(|h| format!("- {}", h)).collect();
            out.push_str(&hints.join("\n"));
            out
        }
    }
}

fn render_recommendations(result: &RegionRecommendations) -> String {
    if result.recommendations.is_empty() {
        return "No region recommendations found for the specified criteria.".to_string();
    }

    let mut out = format!(
        "Region Recommendations for {} - {}\n\nCurrency: {}\nTotal regions found: {}\nShowing top: {}\n",
        result.service_name, result.sku_name, result.currency, result.total_regions_found, result.showing_top
    );

    if let Some(summary) = &result.summary {
        out.push_str(&format!(
            "\nSummary:\n   Cheapest: {} ({}) - ${:.6}\n   Most expensive: {} - ${:.6}\n",
            summary.cheapest_location,
            summary.cheapest_region,
            summary.cheapest_price,
            summary.most_expensive_region,
            summary.most_expensive_price
        ));
    }

    out.push_str("\nRanked Recommendations (On-Demand Pricing):\n\n");
    out.push_str("| Rank | Region | Location | On-Demand Price | Spot Price | Savings vs Max |\n");
    out.push_str("|------|--------|----------|-----------------|------------|----------------|\n");
    for (i, rec) in result.recommendations.iter().enumerate() {
        let spot = rec
            .spot_price
            .map(|p| format!("${:.6}", p))
            .unwrap_or_else(|| "N/A".to_string());
        out.push_str(&format!(
            "| {} | {} | {} | ${:.6}/{} | {} | {:.1}% |\n",
            i + 1,
            rec.region,
            rec.location,
            rec.retail_price,
            rec.unit_of_measure,
            spot,
            rec.savings_vs_most_expensive
        ));
    }
    out
}

fn render_reservations(result: &ReservationPricing) -> String {
    if result.options.is_empty() {
        return format!("No reservation pricing found for {}.", result.service_name);
    }

    let mut out = format!(
        "Reserved Instance Pricing for {} ({}):\n\n",
        result.service_name, result.currency
    );
    out.push_str("| SKU | Region | Term | Total Price | Hourly Equivalent | On-Demand Hourly | Savings |\n");
    out.push_str("|-----|--------|------|-------------|-------------------|------------------|---------|\n");

    for option in &result.options {
        out.push_str(&format!(
            "| {} | {} | {} | ${} | {} | {} | {} |\n",
            option.sku_name,
            option.region,
            option.term,
            option.total_price,
            or_na(option.hourly_equivalent, |v| format!("${:.4}", v)),
            or_na(option.on_demand_hourly, |v| format!("${:.4}", v)),
            or_na(option.savings_percent, |v| format!("{:.1}%", v)),
        ));
    }
    out
}

fn or_na(value: Option<f64>, format: impl Fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| "N/A".to_string())
}
