//! Simulation result schema
//!
//! The context payload the front-end attaches to every chat request. The
//! schema is closed: unknown fields and unknown versions are rejected at the
//! producer boundary instead of being silently defaulted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current version of the simulation result schema.
pub const SIMULATION_SCHEMA_VERSION: u32 = 1;

fn default_version() -> u32 {
    SIMULATION_SCHEMA_VERSION
}

/// Which algorithm families a briefing should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SwarmMode {
    #[serde(rename = "ACO")]
    Aco,
    #[serde(rename = "PSO")]
    Pso,
    #[default]
    #[serde(rename = "both")]
    Both,
}

impl SwarmMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aco => "ACO",
            Self::Pso => "PSO",
            Self::Both => "both",
        }
    }
}

/// A metric reported either as a number or as preformatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    /// Numeric reading of the metric.
    ///
    /// Text is read up to the first character that cannot belong to a decimal
    /// literal, so `"12.5s"` reads as `12.5`. Returns `None` when no number
    /// can be read at all.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => leading_number(s),
        }
    }

    /// True for `0` and the empty string.
    fn is_blank(&self) -> bool {
        match self {
            Self::Number(n) => *n == 0.0,
            Self::Text(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let candidate_len = text
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let candidate = &text[..candidate_len];
    (1..=candidate.len())
        .rev()
        .find_map(|end| candidate[..end].parse::<f64>().ok())
}

/// Metrics reported by one algorithm run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AlgorithmMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_makespan: Option<MetricValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<MetricValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balance_index: Option<MetricValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computation_time: Option<MetricValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_assignment: Option<Vec<serde_json::Value>>,
}

impl AlgorithmMetrics {
    /// Number of agents in the final assignment, zero when absent.
    pub fn agent_count(&self) -> usize {
        self.final_assignment.as_ref().map_or(0, Vec::len)
    }
}

/// Numeric reading of an optional metric where absent, zero and empty all count as `0`.
pub(crate) fn metric_or_zero(metric: Option<&MetricValue>) -> Option<f64> {
    match metric {
        None => Some(0.0),
        Some(value) if value.is_blank() => Some(0.0),
        Some(value) => value.as_number(),
    }
}

/// Results of the latest simulation run, as sent by the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationResults {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aco: Option<AlgorithmMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pso: Option<AlgorithmMetrics>,
}

impl Default for SimulationResults {
    fn default() -> Self {
        Self {
            version: SIMULATION_SCHEMA_VERSION,
            aco: None,
            pso: None,
        }
    }
}

impl SimulationResults {
    pub fn with_aco(mut self, metrics: AlgorithmMetrics) -> Self {
        self.aco = Some(metrics);
        self
    }

    pub fn with_pso(mut self, metrics: AlgorithmMetrics) -> Self {
        self.pso = Some(metrics);
        self
    }
}
