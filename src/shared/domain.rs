use serde::{Deserialize, Serialize};

/// Logical stream (table) names shared by the pipeline and the store backends
pub mod streams {
    pub const RAW_MATERIAL_FEED: &str = "raw_material_feed";
    pub const GRINDING_OPERATIONS: &str = "grinding_operations";
    pub const KILN_OPERATIONS: &str = "kiln_operations";
    pub const QUALITY_CONTROL: &str = "quality_control";
    pub const ALTERNATIVE_FUELS: &str = "alternative_fuels";
    pub const UTILITIES_MONITORING: &str = "utilities_monitoring";
    pub const AI_RECOMMENDATIONS: &str = "ai_recommendations";
    pub const OPTIMIZATION_RESULTS: &str = "optimization_results";

    /// All streams, in the order they are usually listed on dashboards
    pub const ALL: [&str; 8] = [
        RAW_MATERIAL_FEED,
        GRINDING_OPERATIONS,
        KILN_OPERATIONS,
        QUALITY_CONTROL,
        ALTERNATIVE_FUELS,
        UTILITIES_MONITORING,
        AI_RECOMMENDATIONS,
        OPTIMIZATION_RESULTS,
    ];
}

// ============================================================================
// Process Readings
// ============================================================================
//
// Readings are produced by an external ingestion path and never mutated here.
// Every measured field is optional so that a partially populated row still
// deserializes; the calculators substitute their documented defaults.

/// Raw-mix chemistry from the raw material feed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawMaterialReading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_rate_tph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moisture_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cao_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sio2_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub al2o3_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fe2o3_pct: Option<f64>,
}

/// Mill state from grinding operations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrindingReading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mill_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mill_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_feed_rate_tph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_consumption_kw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differential_pressure_mbar: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mill_temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fineness_blaine_cm2g: Option<f64>,
}

/// Kiln state including the fuel split
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KilnReading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kiln_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burning_zone_temp_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coal_rate_tph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_fuel_rate_tph: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_fuel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thermal_substitution_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_heat_consumption_mjkg: Option<f64>,
}

/// Lab quality result
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityReading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_quality_score: Option<f64>,
}

/// One utilities monitoring row (one piece of equipment)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UtilitiesReading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_kw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficiency_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_power_kw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_maintenance: Option<i64>,
}

// ============================================================================
// Plant Snapshot
// ============================================================================

/// Overview signals that feed the composite efficiency score
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlantOverview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_energy_consumption: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plant_availability_pct: Option<f64>,
}

/// Latest reading per process area plus derived overview signals.
///
/// A section that has no reading yet is an empty (all-`None`) struct, never
/// an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlantSnapshot {
    pub raw_material: RawMaterialReading,
    pub grinding: GrindingReading,
    pub kiln: KilnReading,
    pub overview: PlantOverview,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_reading_deserializes() {
        let json = r#"{"id":"abc","created_at":"2024-01-15T10:30:00Z","cao_pct":54.2}"#;
        let reading: RawMaterialReading = serde_json::from_str(json).unwrap();

        assert_eq!(reading.cao_pct, Some(54.2));
        assert_eq!(reading.sio2_pct, None);
    }

    #[test]
    fn test_empty_snapshot_sections_default() {
        let snapshot: PlantSnapshot = serde_json::from_str(r#"{"grinding":{}}"#).unwrap();

        assert_eq!(snapshot.grinding, GrindingReading::default());
        assert_eq!(snapshot.overview, PlantOverview::default());
    }

    #[test]
    fn test_missing_fields_not_serialized() {
        let reading = GrindingReading {
            power_consumption_kw: Some(1850.0),
            ..Default::default()
        };

        let json = serde_json::to_string(&reading).unwrap();
        assert_eq!(json, r#"{"power_consumption_kw":1850.0}"#);
    }

    #[test]
    fn test_stream_names_unique() {
        let mut names = streams::ALL.to_vec();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), streams::ALL.len());
    }
}
