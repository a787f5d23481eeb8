//! Equipment health scoring for utilities (fans, compressors, pumps).

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::UtilitiesReading;
use crate::sensor_validation::{finite_input, finite_result, CalculationError};

/// Power draw above baseline by more than this ratio costs health
pub const POWER_RATIO_THRESHOLD: f64 = 1.1;
pub const POWER_PENALTY_PER_RATIO: f64 = 20.0;
/// Days without maintenance before the score starts dropping
pub const MAINTENANCE_GRACE_DAYS: i64 = 7;
pub const MAINTENANCE_PENALTY_PER_DAY: f64 = 3.0;
/// Days after which maintenance is flagged as required
pub const MAINTENANCE_DUE_DAYS: i64 = 14;

pub const WARNING_RISK: f64 = 20.0;
pub const CRITICAL_RISK: f64 = 40.0;

/// Inputs to the health score after defaults have been applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthInputs {
    pub efficiency_pct: f64,
    pub current_power_kw: f64,
    pub baseline_power_kw: f64,
    pub maintenance_days: i64,
}

impl From<&UtilitiesReading> for HealthInputs {
    /// Missing efficiency counts as 100%, a missing baseline as the current draw
    fn from(reading: &UtilitiesReading) -> Self {
        let current_power_kw = reading.power_kw.unwrap_or(0.0);
        Self {
            efficiency_pct: reading.efficiency_pct.unwrap_or(100.0),
            current_power_kw,
            baseline_power_kw: reading.baseline_power_kw.unwrap_or(current_power_kw),
            maintenance_days: reading.days_since_maintenance.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Good,
    Warning,
    Critical,
    Error,
}

impl HealthStatus {
    pub fn from_risk(failure_risk: f64) -> Self {
        if failure_risk < WARNING_RISK {
            HealthStatus::Good
        } else if failure_risk < CRITICAL_RISK {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Good => "good",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquipmentHealth {
    pub health_score: Option<f64>,
    pub failure_risk: Option<f64>,
    pub status: HealthStatus,
    pub maintenance_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Score one piece of equipment. Never fails; an internal failure yields an
/// error-tagged result with `None` values.
pub fn assess_equipment_health(inputs: &HealthInputs) -> EquipmentHealth {
    match try_assess(inputs) {
        Ok(health) => health,
        Err(e) => {
            warn!(error = %e, "Equipment health assessment failed");
            EquipmentHealth {
                health_score: None,
                failure_risk: None,
                status: HealthStatus::Error,
                maintenance_required: None,
                error: Some(format!("maintenance_calculation_failed: {}", e)),
            }
        }
    }
}

fn try_assess(inputs: &HealthInputs) -> Result<EquipmentHealth, CalculationError> {
    let efficiency = finite_input("efficiency_pct", inputs.efficiency_pct)?;
    let current = finite_input("current_power_kw", inputs.current_power_kw)?;
    let baseline = finite_input("baseline_power_kw", inputs.baseline_power_kw)?;
    if inputs.maintenance_days < 0 {
        return Err(CalculationError::NegativeMaintenanceDays(inputs.maintenance_days));
    }

    let mut health = efficiency;

    let power_ratio = if baseline > 0.0 { current / baseline } else { 1.0 };
    if power_ratio > POWER_RATIO_THRESHOLD {
        health -= (power_ratio - 1.0) * POWER_PENALTY_PER_RATIO;
    }
    if inputs.maintenance_days > MAINTENANCE_GRACE_DAYS {
        health -= (inputs.maintenance_days - MAINTENANCE_GRACE_DAYS) as f64 * MAINTENANCE_PENALTY_PER_DAY;
    }

    let health = finite_result("health_score", health)?;
    let failure_risk = (100.0 - health).max(0.0);

    Ok(EquipmentHealth {
        health_score: Some(health),
        failure_risk: Some(failure_risk),
        status: HealthStatus::from_risk(failure_risk),
        maintenance_required: Some(inputs.maintenance_days > MAINTENANCE_DUE_DAYS),
        error: None,
    })
}
