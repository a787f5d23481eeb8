//! Kiln fuel mix: thermal substitution rate and the coal/alternative-fuel
//! rebalance needed to reach a target TSR.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::domain::KilnReading;
use crate::plant_insights::MetricStatus;
use crate::sensor_validation::{finite_input, finite_result, input_or, CalculationError};

pub const DEFAULT_TARGET_TSR_PCT: f64 = 30.0;
/// Targets above this need an engineering review before rollout
pub const MAX_FEASIBLE_TSR_PCT: f64 = 40.0;
pub const DEFAULT_ALT_FUEL_TYPE: &str = "waste_tire";

/// Heat/emission properties of one fuel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelProperties {
    pub calorific_value_mj_per_kg: f64,
    pub co2_factor_kg_per_mj: f64,
}

/// Used for alternative fuel types not in the table
pub const UNKNOWN_FUEL: FuelProperties = FuelProperties {
    calorific_value_mj_per_kg: 25.0,
    co2_factor_kg_per_mj: 0.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuelType {
    Coal,
    WasteTire,
    Biomass,
    Rdf,
    Petcoke,
}

impl FuelType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "coal" => Some(FuelType::Coal),
            "waste_tire" => Some(FuelType::WasteTire),
            "biomass" => Some(FuelType::Biomass),
            "RDF" | "rdf" => Some(FuelType::Rdf),
            "petcoke" => Some(FuelType::Petcoke),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Coal => "coal",
            FuelType::WasteTire => "waste_tire",
            FuelType::Biomass => "biomass",
            FuelType::Rdf => "RDF",
            FuelType::Petcoke => "petcoke",
        }
    }

    pub fn properties(&self) -> FuelProperties {
        let (cv, co2) = match self {
            FuelType::Coal => (25.0, 0.094),
            FuelType::WasteTire => (32.5, 0.085),
            FuelType::Biomass => (18.7, 0.0),
            FuelType::Rdf => (15.5, 0.083),
            FuelType::Petcoke => (35.0, 0.102),
        };
        FuelProperties {
            calorific_value_mj_per_kg: cv,
            co2_factor_kg_per_mj: co2,
        }
    }
}

/// Properties for a fuel named in a reading, falling back to [`UNKNOWN_FUEL`]
pub fn properties_for(name: &str) -> FuelProperties {
    FuelType::parse(name)
        .map(|fuel| fuel.properties())
        .unwrap_or(UNKNOWN_FUEL)
}

/// Heat released per hour in MJ/h
pub fn fuel_energy_mj_per_h(rate_tph: f64, fuel: FuelProperties) -> f64 {
    rate_tph * fuel.calorific_value_mj_per_kg * 1000.0
}

/// Whether a TSR target can be applied without review
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Feasibility {
    Feasible,
    ReviewRequired,
}

impl Feasibility {
    /// Depends on the target alone, never on the current fuel rates
    pub fn for_target(target_tsr: f64) -> Self {
        if target_tsr <= MAX_FEASIBLE_TSR_PCT {
            Feasibility::Feasible
        } else {
            Feasibility::ReviewRequired
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Feasibility::Feasible => "feasible",
            Feasibility::ReviewRequired => "review_required",
        }
    }
}

impl fmt::Display for Feasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommended fuel split for a target TSR
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelMixPlan {
    pub status: MetricStatus,
    pub alt_fuel_type: String,
    pub current_tsr: Option<f64>,
    pub target_tsr: f64,
    pub recommended_coal_rate_tph: Option<f64>,
    pub recommended_alt_fuel_rate_tph: Option<f64>,
    pub current_co2_kg_h: Option<f64>,
    pub optimized_co2_kg_h: Option<f64>,
    pub co2_reduction_kg_h: Option<f64>,
    pub feasibility: Feasibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FuelMixPlan {
    fn failed(alt_fuel_type: String, target_tsr: f64, err: &CalculationError) -> Self {
        Self {
            status: MetricStatus::Error,
            alt_fuel_type,
            current_tsr: None,
            target_tsr,
            recommended_coal_rate_tph: None,
            recommended_alt_fuel_rate_tph: None,
            current_co2_kg_h: None,
            optimized_co2_kg_h: None,
            co2_reduction_kg_h: None,
            feasibility: Feasibility::for_target(target_tsr),
            error: Some(format!("fuel_optimization_failed: {}", err)),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == MetricStatus::Error
    }
}

/// Rebalance the kiln fuel split toward `target_tsr` percent.
///
/// Never fails; an internal failure yields an error-tagged plan with `None`
/// values. `feasibility` is always derived from `target_tsr`.
pub fn optimize_fuel_mix(reading: &KilnReading, target_tsr: f64) -> FuelMixPlan {
    let alt_fuel_type = reading
        .alt_fuel_type
        .clone()
        .unwrap_or_else(|| DEFAULT_ALT_FUEL_TYPE.to_string());

    match try_optimize_fuel_mix(reading, &alt_fuel_type, target_tsr) {
        Ok(plan) => plan,
        Err(e) => {
            warn!(error = %e, alt_fuel_type = %alt_fuel_type, "Fuel mix optimization failed");
            FuelMixPlan::failed(alt_fuel_type, target_tsr, &e)
        }
    }
}

fn try_optimize_fuel_mix(
    reading: &KilnReading,
    alt_fuel_type: &str,
    target_tsr: f64,
) -> Result<FuelMixPlan, CalculationError> {
    let target = finite_input("target_tsr", target_tsr)?;
    let coal_rate = input_or("coal_rate_tph", reading.coal_rate_tph, 0.0)?;
    let alt_rate = input_or("alt_fuel_rate_tph", reading.alt_fuel_rate_tph, 0.0)?;

    let coal = FuelType::Coal.properties();
    let alt = properties_for(alt_fuel_type);

    let coal_energy = fuel_energy_mj_per_h(coal_rate, coal);
    let alt_energy = fuel_energy_mj_per_h(alt_rate, alt);
    let total_energy = finite_result("total_energy_mj_h", coal_energy + alt_energy)?;

    let (current_tsr, target_alt_energy) = if total_energy == 0.0 {
        (0.0, 0.0)
    } else {
        (
            alt_energy / total_energy * 100.0,
            target / 100.0 * total_energy,
        )
    };
    let target_coal_energy = total_energy - target_alt_energy;

    let recommended_alt_rate = target_alt_energy / (alt.calorific_value_mj_per_kg * 1000.0);
    let recommended_coal_rate = target_coal_energy / (coal.calorific_value_mj_per_kg * 1000.0);

    let current_co2 =
        (coal_energy * coal.co2_factor_kg_per_mj + alt_energy * alt.co2_factor_kg_per_mj) / 3.6;
    let optimized_co2 = (target_coal_energy * coal.co2_factor_kg_per_mj
        + target_alt_energy * alt.co2_factor_kg_per_mj)
        / 3.6;

    Ok(FuelMixPlan {
        status: MetricStatus::Calculated,
        alt_fuel_type: alt_fuel_type.to_string(),
        current_tsr: Some(finite_result("current_tsr", current_tsr)?),
        target_tsr: target,
        recommended_coal_rate_tph: Some(finite_result("recommended_coal_rate_tph", recommended_coal_rate)?),
        recommended_alt_fuel_rate_tph: Some(finite_result(
            "recommended_alt_fuel_rate_tph",
            recommended_alt_rate,
        )?),
        current_co2_kg_h: Some(finite_result("current_co2_kg_h", current_co2)?),
        optimized_co2_kg_h: Some(finite_result("optimized_co2_kg_h", optimized_co2)?),
        co2_reduction_kg_h: Some(finite_result("co2_reduction_kg_h", current_co2 - optimized_co2)?),
        feasibility: Feasibility::for_target(target),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kiln(coal: f64, alt: f64, alt_type: &str) -> KilnReading {
        KilnReading {
            coal_rate_tph: Some(coal),
            alt_fuel_rate_tph: Some(alt),
            alt_fuel_type: Some(alt_type.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_current_tsr() {
        // coal 10 t/h -> 250,000 MJ/h; tires 2 t/h -> 65,000 MJ/h
        let plan = optimize_fuel_mix(&kiln(10.0, 2.0, "waste_tire"), 30.0);

        let tsr = plan.current_tsr.unwrap();
        assert!((tsr - 65_000.0 / 315_000.0 * 100.0).abs() < 1e-9);
        assert_eq!(plan.status, MetricStatus::Calculated);
        assert_eq!(plan.feasibility, Feasibility::Feasible);
    }

    #[test]
    fn test_rebalance_preserves_total_heat() {
        let plan = optimize_fuel_mix(&kiln(10.0, 2.0, "biomass"), 30.0);

        let coal = plan.recommended_coal_rate_tph.unwrap() * 25.0 * 1000.0;
        let alt = plan.recommended_alt_fuel_rate_tph.unwrap() * 18.7 * 1000.0;
        let total = 10.0 * 25.0 * 1000.0 + 2.0 * 18.7 * 1000.0;
        assert!((coal + alt - total).abs() < 1e-6);
        assert!((alt / total * 100.0 - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_biomass_substitution_reduces_co2() {
        let plan = optimize_fuel_mix(&kiln(10.0, 0.0, "biomass"), 30.0);

        assert!(plan.co2_reduction_kg_h.unwrap() > 0.0);
        assert!(plan.optimized_co2_kg_h.unwrap() < plan.current_co2_kg_h.unwrap());
    }

    #[test]
    fn test_zero_fuel_gives_zero_rates() {
        let plan = optimize_fuel_mix(&KilnReading::default(), 30.0);

        assert_eq!(plan.alt_fuel_type, DEFAULT_ALT_FUEL_TYPE);
        assert_eq!(plan.current_tsr, Some(0.0));
        assert_eq!(plan.recommended_alt_fuel_rate_tph, Some(0.0));
        assert_eq!(plan.recommended_coal_rate_tph, Some(0.0));
        assert_eq!(plan.co2_reduction_kg_h, Some(0.0));
    }

    #[test]
    fn test_unknown_fuel_fallback() {
        assert_eq!(properties_for("sawdust"), UNKNOWN_FUEL);
        assert_eq!(properties_for("RDF"), FuelType::Rdf.properties());

        let plan = optimize_fuel_mix(&kiln(10.0, 4.0, "sawdust"), 30.0);
        // 100,000 / 350,000
        let tsr = plan.current_tsr.unwrap();
        assert!((tsr - 100_000.0 / 350_000.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_high_target_requires_review() {
        let plan = optimize_fuel_mix(&kiln(10.0, 2.0, "waste_tire"), 45.0);
        assert_eq!(plan.feasibility, Feasibility::ReviewRequired);
        assert_eq!(Feasibility::for_target(40.0), Feasibility::Feasible);
    }

    #[test]
    fn test_nan_rate_yields_error_plan() {
        let plan = optimize_fuel_mix(&kiln(f64::NAN, 2.0, "waste_tire"), 30.0);

        assert!(plan.is_error());
        assert_eq!(plan.current_tsr, None);
        assert_eq!(plan.recommended_coal_rate_tph, None);
        assert_eq!(plan.target_tsr, 30.0);
        assert_eq!(plan.feasibility, Feasibility::Feasible);
        assert!(plan.error.is_some());
    }

    #[test]
    fn test_feasibility_serializes_snake_case() {
        let json = serde_json::to_string(&Feasibility::ReviewRequired).unwrap();
        assert_eq!(json, r#""review_required""#);
    }
}
