//! Pricing metrics. Recording is a no-op until the host process installs a
//! `metrics` recorder.

use metrics::{counter, histogram};
use std::time::Duration;

use crate::tools::Tool;

/// Label used for tool names the dispatcher does not know
pub const UNKNOWN_TOOL_LABEL: &str = "unknown";

/// Pricing metrics recorder
pub struct PricingMetrics;

impl PricingMetrics {
    /// Record one upstream request (including its retries)
    pub fn record_upstream_request(outcome: &'static str, rows: usize, duration: Duration) {
        counter!("azure_pricing_upstream_requests_total", "outcome" => outcome).increment(1);
        histogram!("azure_pricing_upstream_duration_seconds", "outcome" => outcome)
            .record(duration.as_secs_f64());

        tracing::debug!(
            outcome = outcome,
            rows = rows,
            duration_ms = duration.as_millis() as u64,
            "Upstream request finished"
        );
    }

    /// Record a region left out of a comparison
    pub fn record_region_skipped(reason: &'static str) {
        counter!("azure_pricing_regions_skipped_total", "reason" => reason).increment(1);
    }

    /// Record a dispatched tool call; `None` is a name that did not parse
    pub fn record_tool_call(tool: Option<Tool>, outcome: &'static str, duration: Duration) {
        let tool = tool_label(tool);
        counter!("azure_pricing_tool_calls_total", "tool" => tool, "outcome" => outcome).increment(1);
        histogram!("azure_pricing_tool_duration_seconds", "tool" => tool)
            .record(duration.as_secs_f64());
    }
}

/// Tool label drawn from the fixed tool set, never from caller input.
pub(crate) fn tool_label(tool: Option<Tool>) -> &'static str {
    tool.map(Tool::name).unwrap_or(UNKNOWN_TOOL_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_tool_labels_are_bounded() {
        let mut labels: Vec<&str> = Tool::iter().map(|t| tool_label(Some(t))).collect();
        labels.push(tool_label("azure_teleport".parse().ok()));
        labels.push(tool_label("'; drop table prices".parse().ok()));
        labels.sort();
        labels.dedup();

        assert_eq!(labels.len(), Tool::iter().count() + 1);
        assert!(labels.contains(&UNKNOWN_TOOL_LABEL));
        assert!(!labels.contains(&"azure_teleport"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        PricingMetrics::record_tool_call(None, "unknown", Duration::from_millis(3));
        PricingMetrics::record_tool_call(Some(Tool::PriceSearch), "success", Duration::ZERO);
    }
}
