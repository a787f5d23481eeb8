use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Metric Models
// ============================================================================

/// Status attached to every derived metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Optimal,
    Acceptable,
    Warning,
    Critical,
    Error,
    Calculated,
}

impl MetricStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricStatus::Optimal => "optimal",
            MetricStatus::Acceptable => "acceptable",
            MetricStatus::Warning => "warning",
            MetricStatus::Critical => "critical",
            MetricStatus::Error => "error",
            MetricStatus::Calculated => "calculated",
        }
    }
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A derived value with its status band.
///
/// Computed fresh on every evaluation and only ever embedded in a report or
/// an alert. `value` is `None` only when the calculator failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    pub value: Option<f64>,
    pub status: MetricStatus,
    #[serde(default)]
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_max: Option<f64>,
}

impl Metric {
    pub fn new(value: f64, status: MetricStatus) -> Self {
        Self {
            value: Some(value),
            status,
            recommendation: String::new(),
            threshold_min: None,
            threshold_max: None,
        }
    }

    /// Metric for a calculator that failed: no value, status `error`
    pub fn error() -> Self {
        Self {
            value: None,
            status: MetricStatus::Error,
            recommendation: String::new(),
            threshold_min: None,
            threshold_max: None,
        }
    }

    pub fn with_band(mut self, min: f64, max: f64) -> Self {
        self.threshold_min = Some(min);
        self.threshold_max = Some(max);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.threshold_max = Some(max);
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = recommendation.into();
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == MetricStatus::Error
    }
}

// ============================================================================
// Recommendation / Alert Models
// ============================================================================

/// Plant area a recommendation applies to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProcessArea {
    RawMaterial,
    Grinding,
    Kiln,
    Quality,
    AlternativeFuel,
    Utilities,
}

impl ProcessArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessArea::RawMaterial => "raw_material",
            ProcessArea::Grinding => "grinding",
            ProcessArea::Kiln => "kiln",
            ProcessArea::Quality => "quality",
            ProcessArea::AlternativeFuel => "alternative_fuel",
            ProcessArea::Utilities => "utilities",
        }
    }
}

/// Kind of corrective action a recommendation proposes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    EnergyOptimization,
    QualityStability,
    AlternativeFuel,
    Maintenance,
}

/// Invalid priority level outside [1, 5]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("priority level must be between 1 and 5, got {0}")]
pub struct InvalidPriority(pub u8);

/// Alert priority, 1 (most urgent) through 5
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct PriorityLevel(u8);

impl PriorityLevel {
    pub const CRITICAL: PriorityLevel = PriorityLevel(1);
    pub const HIGH: PriorityLevel = PriorityLevel(2);
    pub const MEDIUM: PriorityLevel = PriorityLevel(3);
    pub const LOW: PriorityLevel = PriorityLevel(4);
    pub const INFO: PriorityLevel = PriorityLevel(5);

    pub fn new(level: u8) -> Result<Self, InvalidPriority> {
        if (1..=5).contains(&level) {
            Ok(Self(level))
        } else {
            Err(InvalidPriority(level))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for PriorityLevel {
    type Error = InvalidPriority;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<PriorityLevel> for u8 {
    fn from(level: PriorityLevel) -> Self {
        level.0
    }
}

/// Recommendation produced by the aggregator or the realtime check,
/// before it is stamped and persisted as an [`Alert`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub process_area: ProcessArea,
    pub recommendation_type: RecommendationType,
    pub priority_level: PriorityLevel,
    pub description: String,
    pub estimated_savings_kwh: f64,
    pub estimated_savings_cost: f64,
}

/// Persisted alert row in the `ai_recommendations` stream.
///
/// Append-only except `action_taken`, which only ever flips false -> true.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub process_area: ProcessArea,
    pub recommendation_type: RecommendationType,
    pub priority_level: PriorityLevel,
    pub description: String,
    pub estimated_savings_kwh: f64,
    pub estimated_savings_cost: f64,
    pub action_taken: bool,
    pub created_at: String,
}

impl Alert {
    pub fn from_recommendation(recommendation: Recommendation, created_at: String) -> Self {
        Self {
            id: None,
            process_area: recommendation.process_area,
            recommendation_type: recommendation.recommendation_type,
            priority_level: recommendation.priority_level,
            description: recommendation.description,
            estimated_savings_kwh: recommendation.estimated_savings_kwh,
            estimated_savings_cost: recommendation.estimated_savings_cost,
            action_taken: false,
            created_at,
        }
    }
}

// ============================================================================
// Ledger Models
// ============================================================================

/// One append-only ledger row per optimization run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationResult {
    pub energy_saved_kwh: f64,
    pub cost_saved_usd: f64,
    pub co2_reduced_kg: f64,
    pub model_confidence: f64,
    pub created_at: String,
}

// ============================================================================
// Broadcast Envelope
// ============================================================================

/// Message type tag of the broadcast envelope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Initial,
    PlantUpdate,
    Optimization,
    Welcome,
}

/// Wire envelope shared by every message pushed to subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub data: T,
    pub created_at: String,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(message_type: MessageType, data: T, created_at: String) -> Self {
        Self {
            message_type,
            data,
            created_at,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recommendation() -> Recommendation {
        Recommendation {
            process_area: ProcessArea::Grinding,
            recommendation_type: RecommendationType::EnergyOptimization,
            priority_level: PriorityLevel::CRITICAL,
            description: "Critical grinding energy consumption detected.".to_string(),
            estimated_savings_kwh: 850.0,
            estimated_savings_cost: 127.5,
        }
    }

    #[test]
    fn test_priority_level_bounds() {
        assert!(PriorityLevel::new(0).is_err());
        assert!(PriorityLevel::new(1).is_ok());
        assert!(PriorityLevel::new(5).is_ok());
        assert_eq!(PriorityLevel::new(6), Err(InvalidPriority(6)));
    }

    #[test]
    fn test_priority_level_rejected_on_deserialize() {
        let result: Result<PriorityLevel, _> = serde_json::from_str("9");
        assert!(result.is_err());

        let level: PriorityLevel = serde_json::from_str("3").unwrap();
        assert_eq!(level, PriorityLevel::MEDIUM);
    }

    #[test]
    fn test_alert_shape() {
        let alert = Alert::from_recommendation(
            sample_recommendation(),
            "2024-01-15T10:30:00+00:00".to_string(),
        );
        let value = serde_json::to_value(&alert).unwrap();

        assert_eq!(value["process_area"], "grinding");
        assert_eq!(value["recommendation_type"], "energy_optimization");
        assert_eq!(value["priority_level"], 1);
        assert_eq!(value["action_taken"], false);
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_envelope_type_tag() {
        let envelope = Envelope::new(
            MessageType::PlantUpdate,
            serde_json::json!({"grinding": {}}),
            "2024-01-15T10:30:00+00:00".to_string(),
        );
        let json = envelope.to_json().unwrap();

        assert!(json.contains(r#""type":"plant_update""#));
        assert!(json.contains(r#""created_at":"2024-01-15T10:30:00+00:00""#));
    }

    #[test]
    fn test_error_metric_has_no_value() {
        let metric = Metric::error();
        assert!(metric.is_error());
        assert_eq!(metric.value, None);
    }
}
