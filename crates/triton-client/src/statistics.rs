//! Model statistics summaries

use serde::Serialize;
use triton_proto::{ModelStatistics, ModelStatisticsResponse, StatisticDuration};

/// Count/duration pair flattened for reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DurationSummary {
    pub count: u64,
    pub total_ns: u64,
}

impl From<Option<&StatisticDuration>> for DurationSummary {
    fn from(d: Option<&StatisticDuration>) -> Self {
        d.map(|d| Self {
            count: d.count,
            total_ns: d.ns,
        })
        .unwrap_or_default()
    }
}

/// Serializable view of one model's usage counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelStatsSummary {
    pub name: String,
    pub version: String,
    pub last_inference_ms: u64,
    pub inference_count: u64,
    pub execution_count: u64,
    pub success: DurationSummary,
    pub fail: DurationSummary,
    pub queue: DurationSummary,
    pub compute_infer: DurationSummary,
}

impl From<&ModelStatistics> for ModelStatsSummary {
    fn from(stats: &ModelStatistics) -> Self {
        let infer = stats.inference_stats.as_ref();
        Self {
            name: stats.name.clone(),
            version: stats.version.clone(),
            last_inference_ms: stats.last_inference,
            inference_count: stats.inference_count,
            execution_count: stats.execution_count,
            success: infer.and_then(|s| s.success.as_ref()).into(),
            fail: infer.and_then(|s| s.fail.as_ref()).into(),
            queue: infer.and_then(|s| s.queue.as_ref()).into(),
            compute_infer: infer.and_then(|s| s.compute_infer.as_ref()).into(),
        }
    }
}

/// Summaries for every model in a statistics response
pub fn summarize(response: &ModelStatisticsResponse) -> Vec<ModelStatsSummary> {
    response.model_stats.iter().map(ModelStatsSummary::from).collect()
}
