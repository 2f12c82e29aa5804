//! Named tool entry points: argument decoding, dispatch and the per-call
//! client session.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Instant;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::{debug, error, info, warn};

use crate::client::{AzurePricingClient, PriceSource};
use crate::compare::{CompareRequest, ComparisonResult};
use crate::config::PricingConfig;
use crate::discovery::{DISCOVERY_SAMPLE_LIMIT, DiscoverSkusRequest, DiscoveryResult, SkuCatalog};
use crate::error::{PricingError, PricingResult};
use crate::estimate::{CostEstimate, EstimateRequest, HOURS_PER_MONTH};
use crate::metrics::PricingMetrics;
use crate::models::{DEFAULT_LIMIT, ResultEnvelope, SearchCriteria};
use crate::recommend::{DEFAULT_TOP_N, RecommendRequest, RegionRecommendations};
use crate::render::render;
use crate::reservation::{ReservationPricing, ReservationRequest};
use crate::service::PricingService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum Tool {
    #[strum(serialize = "azure_price_search")]
    PriceSearch,
    #[strum(serialize = "azure_price_compare")]
    PriceCompare,
    #[strum(serialize = "azure_cost_estimate")]
    CostEstimate,
    #[strum(serialize = "azure_discover_skus")]
    DiscoverSkus,
    #[strum(serialize = "azure_sku_discovery")]
    SkuDiscovery,
    #[strum(serialize = "azure_region_recommend")]
    RegionRecommend,
    #[strum(serialize = "azure_ri_pricing")]
    RiPricing,
}

impl Tool {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::PriceSearch => "Search Azure retail prices with various filters",
            Tool::PriceCompare => "Compare Azure prices across regions or SKUs",
            Tool::CostEstimate => "Estimate monthly and yearly costs for a SKU, including savings plans",
            Tool::DiscoverSkus => "List the SKUs available for an Azure service",
            Tool::SkuDiscovery => "Find SKUs for a loosely named service, with suggestions when the name is unclear",
            Tool::RegionRecommend => "Rank regions by on-demand price for a SKU",
            Tool::RiPricing => "Show reserved instance pricing and savings versus on-demand",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchArgs {
    pub service_name: Option<String>,
    pub region: Option<String>,
    pub sku_name: Option<String>,
    pub price_type: Option<String>,
    pub currency_code: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CompareArgs {
    pub service_name: String,
    #[serde(default)]
    pub sku_name: Option<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EstimateArgs {
    pub service_name: String,
    pub sku_name: String,
    pub region: String,
    #[serde(default)]
    pub hours_per_month: Option<f64>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverSkusArgs {
    pub service_name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SkuDiscoveryArgs {
    #[serde(alias = "service_name")]
    pub service_hint: String,
    #[serde(default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendArgs {
    pub service_name: String,
    pub sku_name: String,
    #[serde(default)]
    pub top_n: Option<usize>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RiPricingArgs {
    pub service_name: String,
    #[serde(default)]
    pub sku_name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

/// Result of one dispatched tool
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Search(ResultEnvelope),
    Compare(ComparisonResult),
    Estimate {
        sku_name: String,
        region: String,
        estimate: Option<CostEstimate>,
    },
    SkuCatalog(SkuCatalog),
    Discovery(DiscoveryResult),
    Recommend(RegionRecommendations),
    Reservation(ReservationPricing),
}

/// Drop every argument whose name mentions a discount. Returns the removed keys.
pub fn sanitize_arguments(args: &mut Map<String, Value>) -> Vec<String> {
    let removed: Vec<String> = args
        .keys()
        .filter(|key| key.to_lowercase().contains("discount"))
        .cloned()
        .collect();
    for key in &removed {
        args.remove(key);
    }
    removed
}

fn decode<T: for<'de> Deserialize<'de>>(tool: Tool, args: Map<String, Value>) -> PricingResult<T> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| PricingError::InvalidInput(format!("{}: {}", tool, e)))
}

/// Sanitize and decode `arguments`, then run `tool` against `service`.
pub async fn dispatch<S: PriceSource>(
    service: &PricingService<S>,
    tool: Tool,
    arguments: Value,
) -> PricingResult<ToolOutput> {
    let mut args = match arguments {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(PricingError::InvalidInput(format!(
                "{}: arguments must be a JSON object, got {}",
                tool, other
            )));
        }
    };

    let removed = sanitize_arguments(&mut args);
    if !removed.is_empty() {
        debug!(tool = %tool, keys = ?removed, "Ignoring discount arguments");
    }

    let currency = |requested: Option<String>| {
        requested
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| service.default_currency().to_string())
    };

    let output = match tool {
        Tool::PriceSearch => {
            let args: SearchArgs = decode(tool, args)?;
            let criteria = SearchCriteria {
                service_name: args.service_name,
                region: args.region,
                sku_name: args.sku_name,
                price_type: args.price_type,
                currency_code: currency(args.currency_code),
                limit: args.limit.unwrap_or(DEFAULT_LIMIT),
            };
            ToolOutput::Search(service.search(criteria).await?)
        }
        Tool::PriceCompare => {
            let args: CompareArgs = decode(tool, args)?;
            ToolOutput::Compare(
                service
                    .compare(CompareRequest {
                        service_name: args.service_name,
                        sku_name: args.sku_name,
                        regions: args.regions,
                        currency_code: currency(args.currency_code),
                    })
                    .await?,
            )
        }
        Tool::CostEstimate => {
            let args: EstimateArgs = decode(tool, args)?;
            let request = EstimateRequest {
                service_name: args.service_name,
                sku_name: args.sku_name.clone(),
                region: args.region.clone(),
                hours_per_month: args.hours_per_month.unwrap_or(HOURS_PER_MONTH),
                currency_code: currency(args.currency_code),
            };
            ToolOutput::Estimate {
                sku_name: args.sku_name,
                region: args.region,
                estimate: service.estimate_cost(request).await?,
            }
        }
        Tool::DiscoverSkus => {
            let args: DiscoverSkusArgs = decode(tool, args)?;
            ToolOutput::SkuCatalog(
                service
                    .discover_skus(DiscoverSkusRequest {
                        service_name: args.service_name,
                        region: args.region,
                        currency_code: currency(args.currency_code),
                        limit: args.limit.unwrap_or(DISCOVERY_SAMPLE_LIMIT),
                    })
                    .await?,
            )
        }
        Tool::SkuDiscovery => {
            let args: SkuDiscoveryArgs = decode(tool, args)?;
            let currency_code = currency(args.currency_code);
            ToolOutput::Discovery(service.discover_service(&args.service_hint, &currency_code).await?)
        }
        Tool::RegionRecommend => {
            let args: RecommendArgs = decode(tool, args)?;
            ToolOutput::Recommend(
                service
                    .recommend_regions(RecommendRequest {
                        service_name: args.service_name,
                        sku_name: args.sku_name,
                        top_n: args.top_n.unwrap_or(DEFAULT_TOP_N),
                        currency_code: currency(args.currency_code),
                    })
                    .await?,
            )
        }
        Tool::RiPricing => {
            let args: RiPricingArgs = decode(tool, args)?;
            ToolOutput::Reservation(
                service
                    .reservation_pricing(ReservationRequest {
                        service_name: args.service_name,
                        sku_name: args.sku_name,
                        region: args.region,
                        currency_code: currency(args.currency_code),
                    })
                    .await?,
            )
        }
    };

    Ok(output)
}

/// Run one named tool end to end and return its text output.
///
/// The HTTP session lives exactly as long as this call. Failures are
/// rendered as a single `Error: ...` line.
pub async fn handle_tool_call(config: &PricingConfig, name: &str, arguments: Value) -> String {
    let start = Instant::now();

    let Ok(tool) = name.parse::<Tool>() else {
        warn!(tool = name, "Unknown tool requested");
        PricingMetrics::record_tool_call(None, "unknown", start.elapsed());
        return format!("Unknown tool: {}", name);
    };

    match run_tool(config, tool, arguments).await {
        Ok(output) => {
            info!(tool = %tool, duration_ms = start.elapsed().as_millis() as u64, "Tool call complete");
            PricingMetrics::record_tool_call(Some(tool), "success", start.elapsed());
            render(&output)
        }
        Err(e) => {
            error!(tool = %tool, error = %e, "Tool call failed");
            PricingMetrics::record_tool_call(Some(tool), "error", start.elapsed());
            format!("Error: {}", e)
        }
    }
}

async fn run_tool(config: &PricingConfig, tool: Tool, arguments: Value) -> PricingResult<ToolOutput> {
    let client = AzurePricingClient::connect(config.clone())?;
    let service = PricingService::new(client).with_default_currency(config.default_currency.clone());
    dispatch(&service, tool, arguments).await
}
