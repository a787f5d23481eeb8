//! Raw-mix chemistry: lime saturation, silica/alumina moduli and Bogue C3S.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::RawMaterialReading;
use crate::plant_insights::{Metric, MetricStatus};
use crate::sensor_validation::{finite_result, input_or, within, CalculationError};

pub const DEFAULT_CAO_PCT: f64 = 54.0;
pub const DEFAULT_SIO2_PCT: f64 = 20.0;
pub const DEFAULT_AL2O3_PCT: f64 = 5.0;
pub const DEFAULT_FE2O3_PCT: f64 = 3.0;

pub const LSF_RATIO_OPTIMAL: (f64, f64) = (0.92, 0.98);
pub const LSF_RATIO_ACCEPTABLE: (f64, f64) = (0.88, 1.02);
pub const LSF_PCT_OPTIMAL: (f64, f64) = (92.0, 98.0);
pub const LSF_PCT_WARNING: (f64, f64) = (90.0, 100.0);
pub const SILICA_MODULUS_OPTIMAL: (f64, f64) = (2.2, 3.2);
pub const ALUMINA_MODULUS_OPTIMAL: (f64, f64) = (1.5, 2.5);

pub const REC_INCREASE_CAO: &str = "Increase CaO content - risk of under-burning";
pub const REC_REDUCE_CAO: &str = "Reduce CaO content - risk of over-burning and higher energy use";
pub const REC_RAISE_AM: &str = "Increase Al2O3 or reduce Fe2O3 to raise AM";
pub const REC_LOWER_AM: &str = "Reduce Al2O3 or increase Fe2O3 to lower AM";

/// Oxide percentages after defaults have been applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OxideComposition {
    pub cao: f64,
    pub sio2: f64,
    pub al2o3: f64,
    pub fe2o3: f64,
}

impl OxideComposition {
    fn from_reading(reading: &RawMaterialReading) -> Result<Self, CalculationError> {
        Ok(Self {
            cao: input_or("cao_pct", reading.cao_pct, DEFAULT_CAO_PCT)?,
            sio2: input_or("sio2_pct", reading.sio2_pct, DEFAULT_SIO2_PCT)?,
            al2o3: input_or("al2o3_pct", reading.al2o3_pct, DEFAULT_AL2O3_PCT)?,
            fe2o3: input_or("fe2o3_pct", reading.fe2o3_pct, DEFAULT_FE2O3_PCT)?,
        })
    }
}

/// Result of a chemistry evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChemistryAnalysis {
    pub lsf: Metric,
    pub lsf_pct: Metric,
    pub silica_modulus: Metric,
    pub alumina_modulus: Metric,
    pub c3s: Metric,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChemistryAnalysis {
    fn failed(err: &CalculationError) -> Self {
        Self {
            lsf: Metric::error().with_band(LSF_RATIO_OPTIMAL.0, LSF_RATIO_OPTIMAL.1),
            lsf_pct: Metric::error().with_band(LSF_PCT_OPTIMAL.0, LSF_PCT_OPTIMAL.1),
            silica_modulus: Metric::error()
                .with_band(SILICA_MODULUS_OPTIMAL.0, SILICA_MODULUS_OPTIMAL.1),
            alumina_modulus: Metric::error()
                .with_band(ALUMINA_MODULUS_OPTIMAL.0, ALUMINA_MODULUS_OPTIMAL.1),
            c3s: Metric::error(),
            recommendations: Vec::new(),
            error: Some(format!("chemistry_calculation_failed: {}", err)),
        }
    }
}

/// Lime saturation factor as a ratio; 0 when the denominator is 0
pub fn lsf_ratio(oxides: &OxideComposition) -> f64 {
    let denom = 2.8 * oxides.sio2 + 1.2 * oxides.al2o3 + 0.65 * oxides.fe2o3;
    if denom == 0.0 {
        0.0
    } else {
        oxides.cao / denom
    }
}

pub fn silica_modulus(oxides: &OxideComposition) -> f64 {
    let denom = oxides.al2o3 + oxides.fe2o3;
    if denom == 0.0 {
        0.0
    } else {
        oxides.sio2 / denom
    }
}

pub fn alumina_modulus(oxides: &OxideComposition) -> f64 {
    if oxides.fe2o3 == 0.0 {
        0.0
    } else {
        oxides.al2o3 / oxides.fe2o3
    }
}

/// Bogue C3S, clamped at zero
pub fn bogue_c3s(oxides: &OxideComposition) -> f64 {
    let c3s = 4.07 * oxides.cao - 7.6 * oxides.sio2 - 6.72 * oxides.al2o3 - 1.43 * oxides.fe2o3;
    c3s.max(0.0)
}

pub fn lsf_ratio_status(ratio: f64) -> MetricStatus {
    if within(ratio, LSF_RATIO_OPTIMAL.0, LSF_RATIO_OPTIMAL.1) {
        MetricStatus::Optimal
    } else if within(ratio, LSF_RATIO_ACCEPTABLE.0, LSF_RATIO_ACCEPTABLE.1) {
        MetricStatus::Acceptable
    } else {
        MetricStatus::Critical
    }
}

pub fn lsf_pct_status(pct: f64) -> MetricStatus {
    if within(pct, LSF_PCT_OPTIMAL.0, LSF_PCT_OPTIMAL.1) {
        MetricStatus::Optimal
    } else if within(pct, LSF_PCT_WARNING.0, LSF_PCT_WARNING.1) {
        MetricStatus::Warning
    } else {
        MetricStatus::Critical
    }
}

fn band_status(value: f64, band: (f64, f64)) -> MetricStatus {
    if within(value, band.0, band.1) {
        MetricStatus::Optimal
    } else {
        MetricStatus::Warning
    }
}

/// Evaluate the raw-mix chemistry of one reading.
///
/// Never fails: an internal failure yields an error-tagged analysis with
/// every value set to `None`.
pub fn analyze_chemistry(reading: &RawMaterialReading) -> ChemistryAnalysis {
    match try_analyze_chemistry(reading) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(error = %e, "Chemistry analysis failed");
            ChemistryAnalysis::failed(&e)
        }
    }
}

fn try_analyze_chemistry(reading: &RawMaterialReading) -> Result<ChemistryAnalysis, CalculationError> {
    let oxides = OxideComposition::from_reading(reading)?;

    let ratio = finite_result("lsf_ratio", lsf_ratio(&oxides))?;
    let pct = finite_result("lsf_pct", ratio * 100.0)?;
    let sm = finite_result("silica_modulus", silica_modulus(&oxides))?;
    let am = finite_result("alumina_modulus", alumina_modulus(&oxides))?;
    let c3s = finite_result("c3s", bogue_c3s(&oxides))?;

    let mut recommendations = Vec::new();

    let lsf_recommendation = if pct < LSF_PCT_OPTIMAL.0 {
        REC_INCREASE_CAO
    } else if pct > LSF_PCT_OPTIMAL.1 {
        REC_REDUCE_CAO
    } else {
        ""
    };
    if !lsf_recommendation.is_empty() {
        recommendations.push(lsf_recommendation.to_string());
    }

    let am_recommendation = if am < ALUMINA_MODULUS_OPTIMAL.0 {
        REC_RAISE_AM
    } else if am > ALUMINA_MODULUS_OPTIMAL.1 {
        REC_LOWER_AM
    } else {
        ""
    };
    if !am_recommendation.is_empty() {
        recommendations.push(am_recommendation.to_string());
    }

    Ok(ChemistryAnalysis {
        lsf: Metric::new(ratio, lsf_ratio_status(ratio))
            .with_band(LSF_RATIO_OPTIMAL.0, LSF_RATIO_OPTIMAL.1),
        lsf_pct: Metric::new(pct, lsf_pct_status(pct))
            .with_band(LSF_PCT_OPTIMAL.0, LSF_PCT_OPTIMAL.1)
            .with_recommendation(lsf_recommendation),
        silica_modulus: Metric::new(sm, band_status(sm, SILICA_MODULUS_OPTIMAL))
            .with_band(SILICA_MODULUS_OPTIMAL.0, SILICA_MODULUS_OPTIMAL.1),
        alumina_modulus: Metric::new(am, band_status(am, ALUMINA_MODULUS_OPTIMAL))
            .with_band(ALUMINA_MODULUS_OPTIMAL.0, ALUMINA_MODULUS_OPTIMAL.1)
            .with_recommendation(am_recommendation),
        c3s: Metric::new(c3s, MetricStatus::Calculated),
        recommendations,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(cao: f64, sio2: f64, al2o3: f64, fe2o3: f64) -> RawMaterialReading {
        RawMaterialReading {
            cao_pct: Some(cao),
            sio2_pct: Some(sio2),
            al2o3_pct: Some(al2o3),
            fe2o3_pct: Some(fe2o3),
            ..Default::default()
        }
    }

    #[test]
    fn test_low_silica_mix_is_critical() {
        // denom = 8.68 + 0.96 + 0.26 = 9.9
        let analysis = analyze_chemistry(&reading(54.2, 3.1, 0.8, 0.4));

        let ratio = analysis.lsf.value.unwrap();
        assert!((ratio - 5.4747).abs() < 0.001);
        assert_eq!(analysis.lsf.status, MetricStatus::Critical);
        assert_eq!(analysis.lsf_pct.status, MetricStatus::Critical);
        assert!(analysis
            .recommendations
            .contains(&REC_REDUCE_CAO.to_string()));
    }

    #[test]
    fn test_missing_oxides_use_defaults() {
        let analysis = analyze_chemistry(&RawMaterialReading::default());

        // 54 / (56 + 6 + 1.95)
        let expected = 54.0 / 63.95;
        assert_eq!(analysis.lsf.value, Some(expected));
        assert_eq!(analysis.error, None);
        // AM = 5 / 3
        assert_eq!(analysis.alumina_modulus.status, MetricStatus::Optimal);
        // SM = 20 / 8 = 2.5
        assert_eq!(analysis.silica_modulus.status, MetricStatus::Optimal);
    }

    #[test]
    fn test_lsf_pct_is_ratio_times_hundred() {
        let analysis = analyze_chemistry(&reading(65.0, 21.0, 5.2, 3.1));
        assert_eq!(
            analysis.lsf_pct.value.unwrap(),
            analysis.lsf.value.unwrap() * 100.0
        );
    }

    #[test]
    fn test_zero_denominator_gives_zero_ratio() {
        let analysis = analyze_chemistry(&reading(54.0, 0.0, 0.0, 0.0));

        assert_eq!(analysis.lsf.value, Some(0.0));
        assert_eq!(analysis.silica_modulus.value, Some(0.0));
        assert_eq!(analysis.alumina_modulus.value, Some(0.0));
        assert_eq!(analysis.lsf.status, MetricStatus::Critical);
    }

    #[test]
    fn test_c3s_clamped_at_zero() {
        let analysis = analyze_chemistry(&reading(10.0, 30.0, 10.0, 5.0));
        assert_eq!(analysis.c3s.value, Some(0.0));
        assert_eq!(analysis.c3s.status, MetricStatus::Calculated);
    }

    #[test]
    fn test_lsf_pct_warning_band() {
        // Ratio 0.91 sits outside optimal but inside the 90-100% warning band
        assert_eq!(lsf_pct_status(91.0), MetricStatus::Warning);
        assert_eq!(lsf_ratio_status(0.91), MetricStatus::Acceptable);
        assert_eq!(lsf_pct_status(100.5), MetricStatus::Critical);
    }

    #[test]
    fn test_high_alumina_modulus_recommendation() {
        let analysis = analyze_chemistry(&reading(65.0, 21.0, 6.0, 2.0));

        assert_eq!(analysis.alumina_modulus.status, MetricStatus::Warning);
        assert_eq!(analysis.alumina_modulus.recommendation, REC_LOWER_AM);
        assert!(analysis.recommendations.contains(&REC_LOWER_AM.to_string()));
    }

    #[test]
    fn test_non_finite_input_yields_error_result() {
        let analysis = analyze_chemistry(&reading(f64::NAN, 20.0, 5.0, 3.0));

        assert!(analysis.error.is_some());
        assert!(analysis.lsf.is_error());
        assert_eq!(analysis.lsf.value, None);
        assert_eq!(analysis.c3s.value, None);
        assert!(analysis.recommendations.is_empty());
    }
}
