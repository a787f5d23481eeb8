//! Plant-wide KPI report composed from the calculators.

use serde::{Deserialize, Serialize};

use crate::chemistry::{analyze_chemistry, ChemistryAnalysis};
use crate::domain::PlantSnapshot;
use crate::fuel_mix::{optimize_fuel_mix, FuelMixPlan, DEFAULT_TARGET_TSR_PCT};
use crate::grinding::{analyze_grinding, GrindingAnalysis, TARGET_SEC};
use crate::plant_insights::{
    MetricStatus, PriorityLevel, ProcessArea, Recommendation, RecommendationType,
};

pub const BASE_EFFICIENCY_SCORE: f64 = 70.0;
pub const MIN_EFFICIENCY_SCORE: f64 = 55.0;
pub const MAX_EFFICIENCY_SCORE: f64 = 100.0;

/// USD per kWh used for all savings estimates
pub const ENERGY_COST_USD_PER_KWH: f64 = 0.15;
pub const CO2_KG_PER_KWH: f64 = 0.5;

/// SEC assumed when neither the overview nor the grinding analysis has one
pub const FALLBACK_SEC: f64 = 28.0;
pub const DEFAULT_QUALITY_SCORE: f64 = 90.0;
pub const DEFAULT_REFERENCE_FEED_TPH: f64 = 80.0;

pub const REC_GRINDING_CRITICAL: &str =
    "Critical grinding SEC - implement mill audit & adjust classifier/feed.";
pub const REC_GRINDING_POTENTIAL: &str = "Capture grinding SEC improvement potential.";
pub const REC_LSF_OUT_OF_LIMITS: &str = "LSF out of control limits - adjust raw mix proportioning.";
pub const REC_RAISE_TSR: &str = "Increase alternative fuel rate to reach TSR target.";

/// Savings achievable by bringing SEC down to target
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct EnergySavings {
    pub energy_saved_kwh: f64,
    pub cost_saved_usd: f64,
    pub co2_reduced_kg: f64,
}

impl EnergySavings {
    pub fn from_kwh(energy_saved_kwh: f64) -> Self {
        Self {
            energy_saved_kwh,
            cost_saved_usd: energy_saved_kwh * ENERGY_COST_USD_PER_KWH,
            co2_reduced_kg: energy_saved_kwh * CO2_KG_PER_KWH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiReport {
    pub chemistry: ChemistryAnalysis,
    pub energy: GrindingAnalysis,
    pub fuel_optimization: FuelMixPlan,
    pub plant_efficiency_score: f64,
    pub energy_savings: EnergySavings,
    /// Most urgent first
    pub recommendations: Vec<Recommendation>,
}

/// Composes the calculators into one report.
///
/// Every calculator already converts its own failures into an error-tagged
/// result, so a report is always produced.
#[derive(Debug, Clone)]
pub struct KpiAggregator {
    target_tsr: f64,
}

impl Default for KpiAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_TSR_PCT)
    }
}

impl KpiAggregator {
    pub fn new(target_tsr: f64) -> Self {
        Self { target_tsr }
    }

    pub fn target_tsr(&self) -> f64 {
        self.target_tsr
    }

    pub fn generate_report(&self, snapshot: &PlantSnapshot) -> KpiReport {
        let chemistry = analyze_chemistry(&snapshot.raw_material);
        let energy = analyze_grinding(&snapshot.grinding);
        let fuel_optimization = optimize_fuel_mix(&snapshot.kiln, self.target_tsr);

        let plant_efficiency_score =
            plant_efficiency_score(snapshot, &energy, &fuel_optimization, &chemistry);
        let energy_savings = energy_savings(snapshot, &energy);
        let recommendations = recommendations(&energy, &chemistry, &fuel_optimization);

        KpiReport {
            chemistry,
            energy,
            fuel_optimization,
            plant_efficiency_score,
            energy_savings,
            recommendations,
        }
    }
}

fn current_sec(snapshot: &PlantSnapshot, energy: &GrindingAnalysis) -> f64 {
    snapshot
        .overview
        .specific_energy_consumption
        .or(energy.specific_energy_consumption.value)
        .unwrap_or(FALLBACK_SEC)
}

/// Composite score: base 70, banded adjustments, clamped to [55, 100]
pub fn plant_efficiency_score(
    snapshot: &PlantSnapshot,
    energy: &GrindingAnalysis,
    fuel: &FuelMixPlan,
    chemistry: &ChemistryAnalysis,
) -> f64 {
    let mut score = BASE_EFFICIENCY_SCORE;

    let sec = current_sec(snapshot, energy);
    if sec <= 25.0 {
        score += 10.0;
    } else if sec <= 30.0 {
        score += 5.0;
    }

    let quality = snapshot
        .overview
        .ai_quality_score
        .unwrap_or(DEFAULT_QUALITY_SCORE);
    if quality >= 95.0 {
        score += 8.0;
    } else if quality >= 90.0 {
        score += 5.0;
    }

    let tsr = fuel.current_tsr.unwrap_or(0.0);
    if tsr >= 30.0 {
        score += 5.0;
    } else if tsr >= 20.0 {
        score += 2.0;
    }

    match chemistry.lsf_pct.status {
        MetricStatus::Optimal => score += 2.0,
        MetricStatus::Critical => score -= 4.0,
        _ => {}
    }

    score.clamp(MIN_EFFICIENCY_SCORE, MAX_EFFICIENCY_SCORE)
}

pub fn energy_savings(snapshot: &PlantSnapshot, energy: &GrindingAnalysis) -> EnergySavings {
    let sec = current_sec(snapshot, energy);
    let reference_feed = snapshot
        .grinding
        .total_feed_rate_tph
        .filter(|feed| *feed != 0.0)
        .unwrap_or(DEFAULT_REFERENCE_FEED_TPH);

    EnergySavings::from_kwh(((sec - TARGET_SEC) * reference_feed).max(0.0))
}

fn recommendations(
    energy: &GrindingAnalysis,
    chemistry: &ChemistryAnalysis,
    fuel: &FuelMixPlan,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    let potential = energy.potential_savings_kwh.unwrap_or(0.0);
    let grinding = match energy.status() {
        MetricStatus::Critical => Some((PriorityLevel::CRITICAL, REC_GRINDING_CRITICAL)),
        _ if potential > 0.0 => Some((PriorityLevel::HIGH, REC_GRINDING_POTENTIAL)),
        _ => None,
    };
    if let Some((priority_level, description)) = grinding {
        recs.push(Recommendation {
            process_area: ProcessArea::Grinding,
            recommendation_type: RecommendationType::EnergyOptimization,
            priority_level,
            description: description.to_string(),
            estimated_savings_kwh: potential,
            estimated_savings_cost: potential * ENERGY_COST_USD_PER_KWH,
        });
    }

    if chemistry.lsf_pct.status == MetricStatus::Critical {
        recs.push(Recommendation {
            process_area: ProcessArea::RawMaterial,
            recommendation_type: RecommendationType::QualityStability,
            priority_level: PriorityLevel::CRITICAL,
            description: REC_LSF_OUT_OF_LIMITS.to_string(),
            estimated_savings_kwh: 0.0,
            estimated_savings_cost: 0.0,
        });
    }

    // An errored plan has no current TSR to compare
    if let Some(current_tsr) = fuel.current_tsr {
        if current_tsr < fuel.target_tsr {
            recs.push(Recommendation {
                process_area: ProcessArea::Kiln,
                recommendation_type: RecommendationType::AlternativeFuel,
                priority_level: PriorityLevel::MEDIUM,
                description: REC_RAISE_TSR.to_string(),
                estimated_savings_kwh: 0.0,
                estimated_savings_cost: 0.0,
            });
        }
    }

    recs.sort_by_key(|rec| rec.priority_level);
    recs
}
