//! Grinding energy efficiency (specific energy consumption of the mill).

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::GrindingReading;
use crate::plant_insights::{Metric, MetricStatus};
use crate::sensor_validation::{finite_result, input_or, CalculationError};

pub const DEFAULT_POWER_KW: f64 = 2000.0;
pub const DEFAULT_FEED_TPH: f64 = 80.0;

/// SEC target in kWh/t; anything at or below is optimal
pub const TARGET_SEC: f64 = 25.0;
/// SEC above this is critical
pub const CRITICAL_SEC: f64 = 30.0;
/// SEC used when the feed rate is zero or negative
pub const FALLBACK_SEC: f64 = 30.0;

pub const VRM_DP_MIN_MBAR: f64 = 65.0;
pub const VRM_DP_MAX_MBAR: f64 = 75.0;

pub const REC_VRM_DP_LOW: &str = "VRM DP low: increase feed or reduce airflow";
pub const REC_VRM_DP_HIGH: &str = "VRM DP high: reduce feed or increase airflow";
pub const REC_GRINDING_AID: &str = "Investigate grinding aid dosage & classifier settings";
pub const REC_ENERGY_TUNING: &str = "Execute energy tuning to capture SEC savings";

/// Result of a grinding efficiency evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GrindingAnalysis {
    pub specific_energy_consumption: Metric,
    pub potential_savings_kwh: Option<f64>,
    pub efficiency_pct: Option<f64>,
    pub optimization_potential_kw: Option<f64>,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GrindingAnalysis {
    pub fn status(&self) -> MetricStatus {
        self.specific_energy_consumption.status
    }

    fn failed(err: &CalculationError) -> Self {
        Self {
            specific_energy_consumption: Metric::error().with_max(TARGET_SEC),
            potential_savings_kwh: None,
            efficiency_pct: None,
            optimization_potential_kw: None,
            recommendations: Vec::new(),
            error: Some(format!("grinding_efficiency_failed: {}", err)),
        }
    }
}

/// Specific energy consumption in kWh/t
pub fn specific_energy_consumption(power_kw: f64, feed_tph: f64) -> f64 {
    if feed_tph > 0.0 {
        power_kw / feed_tph
    } else {
        FALLBACK_SEC
    }
}

pub fn sec_status(sec: f64) -> MetricStatus {
    if sec <= TARGET_SEC {
        MetricStatus::Optimal
    } else if sec <= CRITICAL_SEC {
        MetricStatus::Acceptable
    } else {
        MetricStatus::Critical
    }
}

/// Efficiency score in [60, 100], losing 3 points per kWh/t above target
pub fn efficiency_pct(sec: f64) -> f64 {
    (100.0 - (sec - TARGET_SEC) * 3.0).clamp(60.0, 100.0)
}

/// Evaluate the grinding efficiency of one reading.
///
/// Pure: identical readings produce identical analyses. Never fails; an
/// internal failure yields an error-tagged analysis with `None` values.
pub fn analyze_grinding(reading: &GrindingReading) -> GrindingAnalysis {
    match try_analyze_grinding(reading) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(error = %e, "Grinding efficiency analysis failed");
            GrindingAnalysis::failed(&e)
        }
    }
}

fn try_analyze_grinding(reading: &GrindingReading) -> Result<GrindingAnalysis, CalculationError> {
    let power = input_or("power_consumption_kw", reading.power_consumption_kw, DEFAULT_POWER_KW)?;
    let feed = input_or("total_feed_rate_tph", reading.total_feed_rate_tph, DEFAULT_FEED_TPH)?;

    let sec = finite_result("specific_energy_consumption", specific_energy_consumption(power, feed))?;
    let status = sec_status(sec);

    let potential_savings = match status {
        MetricStatus::Optimal => 0.0,
        _ => finite_result("potential_savings_kwh", (sec - TARGET_SEC) * feed)?,
    };
    let optimization_potential = finite_result(
        "optimization_potential_kw",
        (sec - TARGET_SEC).max(0.0) * feed,
    )?;

    let mut recommendations = Vec::new();
    if reading.mill_type.as_deref() == Some("VRM") {
        if let Some(dp) = reading.differential_pressure_mbar.filter(|dp| dp.is_finite()) {
            if dp < VRM_DP_MIN_MBAR {
                recommendations.push(REC_VRM_DP_LOW.to_string());
            } else if dp > VRM_DP_MAX_MBAR {
                recommendations.push(REC_VRM_DP_HIGH.to_string());
            }
        }
    }
    if sec > CRITICAL_SEC {
        recommendations.push(REC_GRINDING_AID.to_string());
    }
    if potential_savings > 0.0 {
        recommendations.push(REC_ENERGY_TUNING.to_string());
    }

    let sec_metric = Metric::new(sec, status).with_max(TARGET_SEC);
    let sec_metric = match recommendations.first() {
        Some(first) if status != MetricStatus::Optimal => sec_metric.with_recommendation(first.clone()),
        _ => sec_metric,
    };

    Ok(GrindingAnalysis {
        specific_energy_consumption: sec_metric,
        potential_savings_kwh: Some(potential_savings),
        efficiency_pct: Some(efficiency_pct(sec)),
        optimization_potential_kw: Some(optimization_potential),
        recommendations,
        error: None,
    })
}
