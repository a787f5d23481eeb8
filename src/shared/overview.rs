//! Dashboard headline figures: current draw, quality, ledger savings and an
//! overall efficiency percentage built from grinding SEC with kiln penalties.

use serde::{Deserialize, Serialize};

use crate::domain::{GrindingReading, KilnReading, QualityReading};
use crate::grinding::{DEFAULT_FEED_TPH, TARGET_SEC};

pub const DEFAULT_ENERGY_KW: f64 = 2450.0;
pub const DEFAULT_QUALITY_SCORE: f64 = 94.0;
pub const DEFAULT_COST_SAVINGS_USD: f64 = 125_420.0;
pub const DEFAULT_CO2_REDUCTION_KG: f64 = 8_750.0;
/// Efficiency reported when there is no grinding reading at all
pub const BASELINE_EFFICIENCY: f64 = 85.0;

pub const MIN_EFFICIENCY: f64 = 50.0;
pub const MAX_EFFICIENCY: f64 = 100.0;

pub const TARGET_BURNING_ZONE_C: f64 = 1450.0;
/// Burning zone deviation tolerated without penalty
pub const BURNING_ZONE_TOLERANCE_C: f64 = 5.0;
const KILN_PENALTY_PER_C: f64 = 0.3;
const KILN_PENALTY_CAP: f64 = 15.0;

pub const TARGET_HEAT_MJKG: f64 = 3.3;
const HEAT_PENALTY_PER_MJKG: f64 = 8.0;
const HEAT_PENALTY_CAP: f64 = 10.0;

/// Savings columns of the latest optimization ledger row
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerReading {
    pub cost_saved_usd: Option<f64>,
    pub co2_reduced_kg: Option<f64>,
}

/// Headline figures, rounded to whole units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverviewSummary {
    pub energy_consumption_kwh: i64,
    pub quality_score: i64,
    pub cost_savings_usd: i64,
    pub co2_reduction_kg: i64,
    pub overall_efficiency: i64,
}

/// Overall efficiency in [50, 100].
///
/// Starts from 100 minus 2 points per kWh/t of SEC above 25 (85 without a
/// grinding reading), then subtracts a burning-zone penalty of 0.3 per degree
/// beyond 5 degrees off 1450 (capped at 15) and a heat penalty of 8 per MJ/kg
/// above 3.3 (capped at 10).
pub fn overall_efficiency(grinding: Option<&GrindingReading>, kiln: Option<&KilnReading>) -> f64 {
    let mut efficiency = match grinding {
        Some(reading) => {
            let power = reading.power_consumption_kw.unwrap_or(DEFAULT_ENERGY_KW);
            // A zero feed rate reads as the nominal feed
            let feed = match reading.total_feed_rate_tph {
                Some(feed) if feed != 0.0 => feed,
                _ => DEFAULT_FEED_TPH,
            };
            let sec = power / feed;
            100.0 - ((sec - TARGET_SEC) * 2.0).max(0.0)
        }
        None => BASELINE_EFFICIENCY,
    };

    if let Some(kiln) = kiln {
        if let Some(temp) = kiln.burning_zone_temp_c {
            let deviation = (temp - TARGET_BURNING_ZONE_C).abs();
            if deviation > BURNING_ZONE_TOLERANCE_C {
                efficiency -= ((deviation - BURNING_ZONE_TOLERANCE_C) * KILN_PENALTY_PER_C)
                    .min(KILN_PENALTY_CAP);
            }
        }
        if let Some(heat) = kiln.specific_heat_consumption_mjkg.filter(|heat| *heat > 0.0) {
            efficiency -= ((heat - TARGET_HEAT_MJKG) * HEAT_PENALTY_PER_MJKG)
                .min(HEAT_PENALTY_CAP)
                .max(0.0);
        }
    }

    efficiency.max(MIN_EFFICIENCY).min(MAX_EFFICIENCY)
}

/// Headline figures from whichever latest rows exist
pub fn summarize_overview(
    grinding: Option<&GrindingReading>,
    kiln: Option<&KilnReading>,
    quality: Option<&QualityReading>,
    ledger: Option<&LedgerReading>,
) -> OverviewSummary {
    let energy = grinding
        .and_then(|reading| reading.power_consumption_kw)
        .unwrap_or(DEFAULT_ENERGY_KW);
    let quality_score = quality
        .and_then(|reading| reading.ai_quality_score)
        .unwrap_or(DEFAULT_QUALITY_SCORE);
    let cost_savings = ledger
        .and_then(|row| row.cost_saved_usd)
        .unwrap_or(DEFAULT_COST_SAVINGS_USD);
    let co2_reduction = ledger
        .and_then(|row| row.co2_reduced_kg)
        .unwrap_or(DEFAULT_CO2_REDUCTION_KG);

    OverviewSummary {
        energy_consumption_kwh: energy.round() as i64,
        quality_score: quality_score.round() as i64,
        cost_savings_usd: cost_savings.round() as i64,
        co2_reduction_kg: co2_reduction.round() as i64,
        overall_efficiency: overall_efficiency(grinding, kiln).round() as i64,
    }
}
