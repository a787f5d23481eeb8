//! Job bodies: read readings from the store, run the calculators, persist
//! alerts and ledger rows, then broadcast to subscribers.
//!
//! Within one run every persist happens before the broadcast. Read failures
//! abort the run (the scheduler logs them); a failed write is logged and the
//! run carries on. A row that does not decode into its typed reading only
//! blanks that section of the calculator input.

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{
    streams, GrindingReading, KilnReading, PlantOverview, PlantSnapshot, QualityReading,
    UtilitiesReading,
};
use crate::overview::{summarize_overview, LedgerReading, OverviewSummary};
use crate::equipment_health::{assess_equipment_health, EquipmentHealth, HealthInputs};
use crate::fuel_mix::DEFAULT_TARGET_TSR_PCT;
use crate::grinding::{analyze_grinding, DEFAULT_FEED_TPH, DEFAULT_POWER_KW};
use crate::kpi::{KpiAggregator, KpiReport, ENERGY_COST_USD_PER_KWH};
use crate::plant_insights::{
    Alert, Envelope, MessageType, MetricStatus, OptimizationResult, PriorityLevel, ProcessArea,
    Recommendation, RecommendationType,
};
use crate::registry::ConnectionRegistry;
use crate::scheduler::{JobId, ScheduledJob, Scheduler};
use crate::store::{to_record, Record, Store, StoreError, ID_FIELD};
use crate::time::Clock;

pub const REALTIME_ALERT_DESCRIPTION: &str = "Critical grinding energy consumption detected.";
/// SEC reported in the overview when the mill has no feed
pub const ZERO_FEED_OVERVIEW_SEC: f64 = 25.0;
pub const DEFAULT_QUALITY_SCORE: f64 = 90.0;
pub const PLANT_AVAILABILITY_PCT: f64 = 87.0;

/// Tunables for the pipeline jobs
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub realtime_interval: Duration,
    pub optimization_interval: Duration,
    pub equipment_health_interval: Duration,
    pub sample_data_interval: Duration,
    pub target_tsr_pct: f64,
    pub model_confidence: f64,
    pub equipment_batch_limit: usize,
    /// Alerts included in the initial message of a new plant-data subscriber
    pub initial_alerts_limit: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            realtime_interval: Duration::from_secs(15),
            optimization_interval: Duration::from_secs(15 * 60),
            equipment_health_interval: Duration::from_secs(4 * 60 * 60),
            sample_data_interval: Duration::from_secs(30),
            target_tsr_pct: DEFAULT_TARGET_TSR_PCT,
            model_confidence: 0.92,
            equipment_batch_limit: 20,
            initial_alerts_limit: 5,
        }
    }
}

/// What one realtime run did
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeOutcome {
    pub grinding_status: Option<MetricStatus>,
    pub alert: Option<Alert>,
    pub delivered: usize,
}

/// What one optimization run did
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    pub report: KpiReport,
    pub alerts_persisted: usize,
    pub ledger_row: Option<OptimizationResult>,
    pub delivered: usize,
}

/// Health of one piece of equipment from the utilities batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquipmentAssessment {
    pub equipment_name: Option<String>,
    pub health: EquipmentHealth,
}

/// Payload of the `initial` message sent to a new plant-data subscriber.
/// Readings are the stored rows, so `id`, `created_at` and every column
/// reach the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitialPayload {
    pub grinding: Record,
    pub kiln: Record,
    pub raw_material: Record,
    pub recommendations: Vec<Value>,
}

/// Payload of a `plant_update` broadcast: latest stored rows plus overview
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlantUpdate {
    pub raw_material: Record,
    pub grinding: Record,
    pub kiln: Record,
    pub overview: PlantOverview,
}

/// Latest stored row per process area, exactly as the store returned it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestRows {
    pub raw_material: Option<Record>,
    pub grinding: Option<Record>,
    pub kiln: Option<Record>,
    pub quality: Option<Record>,
}

impl LatestRows {
    /// Typed calculator input with the derived overview
    pub fn snapshot(&self) -> PlantSnapshot {
        let grinding: GrindingReading =
            decode_section(streams::GRINDING_OPERATIONS, self.grinding.as_ref());
        let quality: QualityReading = decode_section(streams::QUALITY_CONTROL, self.quality.as_ref());

        let mut overview = PlantOverview {
            plant_availability_pct: Some(PLANT_AVAILABILITY_PCT),
            ..Default::default()
        };
        if self.grinding.is_some() {
            let power = grinding.power_consumption_kw.unwrap_or(DEFAULT_POWER_KW);
            let feed = grinding.total_feed_rate_tph.unwrap_or(DEFAULT_FEED_TPH);
            overview.specific_energy_consumption = Some(if feed != 0.0 {
                power / feed
            } else {
                ZERO_FEED_OVERVIEW_SEC
            });
        }
        if self.quality.is_some() {
            overview.ai_quality_score =
                Some(quality.ai_quality_score.unwrap_or(DEFAULT_QUALITY_SCORE));
        }

        PlantSnapshot {
            raw_material: decode_section(streams::RAW_MATERIAL_FEED, self.raw_material.as_ref()),
            grinding,
            kiln: decode_section(streams::KILN_OPERATIONS, self.kiln.as_ref()),
            overview,
        }
    }

    /// Broadcast form: raw rows, empty objects for areas with no reading
    pub fn into_update(self, overview: PlantOverview) -> PlantUpdate {
        PlantUpdate {
            raw_material: self.raw_material.unwrap_or_default(),
            grinding: self.grinding.unwrap_or_default(),
            kiln: self.kiln.unwrap_or_default(),
            overview,
        }
    }
}

/// Decode one section of the snapshot. A row that does not fit the typed
/// reading is logged and treated as an empty reading.
pub fn decode_section<T>(stream: &str, row: Option<&Record>) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(row) = row else {
        return T::default();
    };
    match serde_json::from_value(Value::Object(row.clone())) {
        Ok(reading) => reading,
        Err(e) => {
            warn!(stream = %stream, row_id = ?row.get(ID_FIELD), error = %e, "Malformed reading, using defaults");
            T::default()
        }
    }
}

pub struct PlantOrchestrator {
    store: Arc<dyn Store>,
    registry: Arc<ConnectionRegistry>,
    clock: Arc<dyn Clock>,
    aggregator: KpiAggregator,
    settings: PipelineSettings,
}

impl PlantOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<ConnectionRegistry>,
        clock: Arc<dyn Clock>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
            aggregator: KpiAggregator::new(settings.target_tsr_pct),
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Scheduler with the four pipeline jobs at their configured cadence
    pub fn scheduler(self: &Arc<Self>) -> Scheduler {
        Scheduler::new()
            .with_job(
                Arc::new(PipelineJob::new(JobId::Realtime, self.clone())),
                self.settings.realtime_interval,
            )
            .with_job(
                Arc::new(PipelineJob::new(JobId::OptimizationAnalysis, self.clone())),
                self.settings.optimization_interval,
            )
            .with_job(
                Arc::new(PipelineJob::new(JobId::EquipmentHealth, self.clone())),
                self.settings.equipment_health_interval,
            )
            .with_job(
                Arc::new(PipelineJob::new(JobId::SampleData, self.clone())),
                self.settings.sample_data_interval,
            )
    }

    /// Latest stored row per process area. Only a store failure is an error.
    pub async fn latest_rows(&self) -> Result<LatestRows, StoreError> {
        Ok(LatestRows {
            raw_material: self.store.get_latest(streams::RAW_MATERIAL_FEED).await?,
            grinding: self.store.get_latest(streams::GRINDING_OPERATIONS).await?,
            kiln: self.store.get_latest(streams::KILN_OPERATIONS).await?,
            quality: self.store.get_latest(streams::QUALITY_CONTROL).await?,
        })
    }

    /// Latest reading per area plus the derived overview
    pub async fn load_snapshot(&self) -> Result<PlantSnapshot, StoreError> {
        Ok(self.latest_rows().await?.snapshot())
    }

    /// Persist an alert; a failed write is logged and yields `None`
    async fn persist_alert(&self, recommendation: Recommendation) -> Option<Alert> {
        let mut alert = Alert::from_recommendation(recommendation, self.clock.now_rfc3339());
        let stored = match to_record(streams::AI_RECOMMENDATIONS, &alert) {
            Ok(record) => self.store.insert(streams::AI_RECOMMENDATIONS, record).await,
            Err(e) => Err(e),
        };

        match stored {
            Ok(record) => {
                alert.id = record.get(ID_FIELD).and_then(Value::as_str).map(str::to_string);
                debug!(alert_id = ?alert.id, "Alert persisted");
                Some(alert)
            }
            Err(e) => {
                warn!(error = %e, description = %alert.description, "Failed to persist alert");
                None
            }
        }
    }

    async fn broadcast<T: Serialize>(&self, message_type: MessageType, data: T) -> anyhow::Result<usize> {
        let envelope = Envelope::new(message_type, data, self.clock.now_rfc3339());
        let message = envelope
            .to_json()
            .context("Failed to serialize broadcast envelope")?;
        Ok(self.registry.broadcast(&message).await.delivered)
    }

    /// Realtime job: grinding check on the latest reading, at most one alert,
    /// then a plant snapshot broadcast whether or not an alert fired.
    pub async fn process_realtime(&self) -> anyhow::Result<RealtimeOutcome> {
        let rows = self
            .latest_rows()
            .await
            .context("Failed to read latest readings")?;
        let snapshot = rows.snapshot();

        let mut grinding_status = None;
        let mut alert = None;

        if snapshot.overview.specific_energy_consumption.is_some() {
            let analysis = analyze_grinding(&snapshot.grinding);
            let status = analysis.status();
            grinding_status = Some(status);
            info!(
                sec = ?analysis.specific_energy_consumption.value,
                status = %status,
                potential_savings_kwh = ?analysis.potential_savings_kwh,
                "Grinding check"
            );

            if status == MetricStatus::Critical {
                let savings = analysis.potential_savings_kwh.unwrap_or(0.0);
                alert = self
                    .persist_alert(Recommendation {
                        process_area: ProcessArea::Grinding,
                        recommendation_type: RecommendationType::EnergyOptimization,
                        priority_level: PriorityLevel::CRITICAL,
                        description: REALTIME_ALERT_DESCRIPTION.to_string(),
                        estimated_savings_kwh: savings,
                        estimated_savings_cost: savings * ENERGY_COST_USD_PER_KWH,
                    })
                    .await;
            }
        } else {
            debug!("No grinding reading yet, skipping grinding check");
        }

        let update = rows.into_update(snapshot.overview);
        let delivered = self.broadcast(MessageType::PlantUpdate, &update).await?;

        Ok(RealtimeOutcome {
            grinding_status,
            alert,
            delivered,
        })
    }

    /// Optimization job: full report, every recommendation persisted as an
    /// alert, one ledger row, then the report broadcast.
    pub async fn run_optimization_analysis(&self) -> anyhow::Result<OptimizationOutcome> {
        let report = self.generate_report().await?;

        let mut alerts_persisted = 0;
        for recommendation in report.recommendations.iter().cloned() {
            if self.persist_alert(recommendation).await.is_some() {
                alerts_persisted += 1;
            }
        }

        let ledger = OptimizationResult {
            energy_saved_kwh: report.energy_savings.energy_saved_kwh,
            cost_saved_usd: report.energy_savings.cost_saved_usd,
            co2_reduced_kg: report.energy_savings.co2_reduced_kg,
            model_confidence: self.settings.model_confidence,
            created_at: self.clock.now_rfc3339(),
        };
        let ledger_row = match to_record(streams::OPTIMIZATION_RESULTS, &ledger) {
            Ok(record) => self.store.insert(streams::OPTIMIZATION_RESULTS, record).await,
            Err(e) => Err(e),
        };
        let ledger_row = match ledger_row {
            Ok(_) => Some(ledger),
            Err(e) => {
                warn!(error = %e, "Failed to persist optimization result");
                None
            }
        };

        info!(
            score = report.plant_efficiency_score,
            recommendations = report.recommendations.len(),
            alerts_persisted,
            "Optimization analysis complete"
        );

        let delivered = self.broadcast(MessageType::Optimization, &report).await?;

        Ok(OptimizationOutcome {
            report,
            alerts_persisted,
            ledger_row,
            delivered,
        })
    }

    /// Equipment health job. Scores the recent utilities batch; nothing is
    /// persisted or broadcast.
    pub async fn check_equipment_health(&self) -> anyhow::Result<Vec<EquipmentAssessment>> {
        let rows = self
            .store
            .get_recent(
                streams::UTILITIES_MONITORING,
                self.settings.equipment_batch_limit,
                None,
                None,
            )
            .await
            .context("Failed to read utilities batch")?;

        let mut assessments = Vec::with_capacity(rows.len());
        for row in rows {
            let reading: UtilitiesReading = match serde_json::from_value(Value::Object(row)) {
                Ok(reading) => reading,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed utilities row");
                    continue;
                }
            };
            let health = assess_equipment_health(&HealthInputs::from(&reading));
            debug!(
                equipment = ?reading.equipment_name,
                status = health.status.as_str(),
                "Equipment assessed"
            );
            assessments.push(EquipmentAssessment {
                equipment_name: reading.equipment_name,
                health,
            });
        }

        info!(equipment = assessments.len(), "Equipment health check complete");
        Ok(assessments)
    }

    /// Reserved for non-production seeding; touches neither store nor subscribers
    pub async fn populate_sample_data(&self) -> anyhow::Result<()> {
        debug!("Sample data job is a no-op");
        Ok(())
    }

    /// On-demand report over the current snapshot
    pub async fn generate_report(&self) -> anyhow::Result<KpiReport> {
        let snapshot = self
            .load_snapshot()
            .await
            .context("Failed to read plant snapshot")?;
        Ok(self.aggregator.generate_report(&snapshot))
    }

    /// Latest readings plus the most recent alerts, for a new subscriber
    pub async fn initial_payload(&self) -> Result<InitialPayload, StoreError> {
        let grinding = self.store.get_latest(streams::GRINDING_OPERATIONS).await?;
        let kiln = self.store.get_latest(streams::KILN_OPERATIONS).await?;
        let raw_material = self.store.get_latest(streams::RAW_MATERIAL_FEED).await?;
        let recommendations = self
            .store
            .get_recent(
                streams::AI_RECOMMENDATIONS,
                self.settings.initial_alerts_limit,
                None,
                None,
            )
            .await?
            .into_iter()
            .map(Value::Object)
            .collect();

        Ok(InitialPayload {
            grinding: grinding.unwrap_or_default(),
            kiln: kiln.unwrap_or_default(),
            raw_material: raw_material.unwrap_or_default(),
            recommendations,
        })
    }

    /// Up to `limit` most recent rows of one stream, as stored
    pub async fn recent_readings(&self, stream: &str, limit: usize) -> Result<Vec<Record>, StoreError> {
        self.store.get_recent(stream, limit, None, None).await
    }

    /// Dashboard headline figures from the latest grinding, kiln, quality and
    /// ledger rows
    pub async fn overview_summary(&self) -> Result<OverviewSummary, StoreError> {
        let grinding = self.store.get_latest(streams::GRINDING_OPERATIONS).await?;
        let kiln = self.store.get_latest(streams::KILN_OPERATIONS).await?;
        let quality = self.store.get_latest(streams::QUALITY_CONTROL).await?;
        let ledger = self.store.get_latest(streams::OPTIMIZATION_RESULTS).await?;

        let grinding = grinding
            .as_ref()
            .map(|row| decode_section::<GrindingReading>(streams::GRINDING_OPERATIONS, Some(row)));
        let kiln = kiln
            .as_ref()
            .map(|row| decode_section::<KilnReading>(streams::KILN_OPERATIONS, Some(row)));
        let quality = quality
            .as_ref()
            .map(|row| decode_section::<QualityReading>(streams::QUALITY_CONTROL, Some(row)));
        let ledger = ledger
            .as_ref()
            .map(|row| decode_section::<LedgerReading>(streams::OPTIMIZATION_RESULTS, Some(row)));

        Ok(summarize_overview(
            grinding.as_ref(),
            kiln.as_ref(),
            quality.as_ref(),
            ledger.as_ref(),
        ))
    }

    /// Current time in the envelope format
    pub fn now_rfc3339(&self) -> String {
        self.clock.now_rfc3339()
    }

    /// Serialized `initial` envelope for a new subscriber
    pub async fn initial_message(&self) -> anyhow::Result<String> {
        let payload = self.initial_payload().await?;
        Ok(Envelope::new(MessageType::Initial, payload, self.clock.now_rfc3339()).to_json()?)
    }

    /// Serialized `welcome` envelope for a new alerts subscriber
    pub fn welcome_message(&self, priority_filter: Option<PriorityLevel>) -> anyhow::Result<String> {
        let data = json!({
            "message": "Subscribed to alerts",
            "priority_filter": priority_filter,
        });
        Ok(Envelope::new(MessageType::Welcome, data, self.clock.now_rfc3339()).to_json()?)
    }

    /// Mark an alert as acted upon. One-way: only rows still `false` match,
    /// so a repeat call affects nothing.
    pub async fn acknowledge_alert(&self, alert_id: &str) -> Result<u64, StoreError> {
        let mut matching = Map::new();
        matching.insert(ID_FIELD.to_string(), Value::String(alert_id.to_string()));
        matching.insert("action_taken".to_string(), Value::Bool(false));

        let mut patch = Record::new();
        patch.insert("action_taken".to_string(), Value::Bool(true));

        let affected = self
            .store
            .update(streams::AI_RECOMMENDATIONS, &matching, &patch)
            .await?;
        info!(alert_id = %alert_id, affected, "Alert acknowledged");
        Ok(affected)
    }
}

/// Binds one [`JobId`] to the matching orchestrator method
pub struct PipelineJob {
    id: JobId,
    orchestrator: Arc<PlantOrchestrator>,
}

impl PipelineJob {
    pub fn new(id: JobId, orchestrator: Arc<PlantOrchestrator>) -> Self {
        Self { id, orchestrator }
    }
}

#[async_trait]
impl ScheduledJob for PipelineJob {
    fn id(&self) -> JobId {
        self.id
    }

    async fn run(&self) -> anyhow::Result<()> {
        match self.id {
            JobId::Realtime => {
                self.orchestrator.process_realtime().await?;
            }
            JobId::OptimizationAnalysis => {
                self.orchestrator.run_optimization_analysis().await?;
            }
            JobId::EquipmentHealth => {
                self.orchestrator.check_equipment_health().await?;
            }
            JobId::SampleData => {
                self.orchestrator.populate_sample_data().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id_generator::SequentialIdGenerator;
    use crate::store::MemoryStore;
    use crate::time::FixedClock;

    fn setup() -> (Arc<MemoryStore>, PlantOrchestrator) {
        let clock = Arc::new(FixedClock::from_rfc3339("2024-01-15T10:30:00Z").unwrap());
        let store = Arc::new(MemoryStore::with_sources(
            Arc::new(SequentialIdGenerator::new("row")),
            clock.clone(),
        ));
        let registry = Arc::new(ConnectionRegistry::with_sources(
            Arc::new(SequentialIdGenerator::new("conn")),
            clock.clone(),
        ));
        let orchestrator =
            PlantOrchestrator::new(store.clone(), registry, clock, PipelineSettings::default());
        (store, orchestrator)
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_of_empty_store() {
        let (_, orchestrator) = setup();
        let snapshot = orchestrator.load_snapshot().await.unwrap();

        assert_eq!(snapshot.grinding, GrindingReading::default());
        assert_eq!(snapshot.overview.specific_energy_consumption, None);
        assert_eq!(snapshot.overview.ai_quality_score, None);
        assert_eq!(snapshot.overview.plant_availability_pct, Some(87.0));
    }

    #[tokio::test]
    async fn test_snapshot_overview_derivation() {
        let (store, orchestrator) = setup();
        store
            .insert(streams::GRINDING_OPERATIONS, record(json!({"power_consumption_kw": 2400.0})))
            .await
            .unwrap();
        store
            .insert(streams::QUALITY_CONTROL, record(json!({"free_lime_pct": 1.2})))
            .await
            .unwrap();

        let snapshot = orchestrator.load_snapshot().await.unwrap();

        // default feed 80
        assert_eq!(snapshot.overview.specific_energy_consumption, Some(30.0));
        assert_eq!(snapshot.overview.ai_quality_score, Some(90.0));
    }

    #[tokio::test]
    async fn test_malformed_section_falls_back_to_defaults() {
        let (store, orchestrator) = setup();
        store
            .insert(streams::KILN_OPERATIONS, record(json!({"kiln_id": "K1", "coal_rate_tph": 10.0})))
            .await
            .unwrap();
        store
            .insert(streams::GRINDING_OPERATIONS, record(json!({"power_consumption_kw": 2000.0})))
            .await
            .unwrap();

        let snapshot = orchestrator.load_snapshot().await.unwrap();

        assert_eq!(snapshot.kiln, KilnReading::default());
        assert_eq!(snapshot.grinding.power_consumption_kw, Some(2000.0));
        assert_eq!(snapshot.overview.specific_energy_consumption, Some(25.0));
    }

    #[test]
    fn test_update_keeps_raw_rows() {
        let rows = LatestRows {
            grinding: Some(record(json!({"id": "g-1", "motor_current_a": 410}))),
            ..Default::default()
        };

        let update = rows.into_update(PlantOverview::default());

        assert_eq!(update.grinding["motor_current_a"], 410);
        assert_eq!(update.grinding["id"], "g-1");
        assert!(update.kiln.is_empty());
    }

    #[tokio::test]
    async fn test_overview_summary_defaults() {
        let (_, orchestrator) = setup();
        let summary = orchestrator.overview_summary().await.unwrap();

        assert_eq!(summary.energy_consumption_kwh, 2450);
        assert_eq!(summary.quality_score, 94);
        assert_eq!(summary.overall_efficiency, 85);
    }

    #[tokio::test]
    async fn test_snapshot_zero_feed() {
        let (store, orchestrator) = setup();
        store
            .insert(
                streams::GRINDING_OPERATIONS,
                record(json!({"power_consumption_kw": 2400.0, "total_feed_rate_tph": 0.0})),
            )
            .await
            .unwrap();

        let snapshot = orchestrator.load_snapshot().await.unwrap();
        assert_eq!(snapshot.overview.specific_energy_consumption, Some(25.0));
    }

    #[tokio::test]
    async fn test_realtime_without_grinding_reading() {
        let (store, orchestrator) = setup();
        let outcome = orchestrator.process_realtime().await.unwrap();

        assert_eq!(outcome.grinding_status, None);
        assert_eq!(outcome.alert, None);
        assert!(store.is_empty(streams::AI_RECOMMENDATIONS).await);
    }

    #[tokio::test]
    async fn test_sample_data_is_noop() {
        let (store, orchestrator) = setup();
        orchestrator.populate_sample_data().await.unwrap();

        for stream in streams::ALL {
            assert!(store.is_empty(stream).await);
        }
    }

    #[tokio::test]
    async fn test_equipment_health_evaluates_batch() {
        let (store, orchestrator) = setup();
        store
            .insert(
                streams::UTILITIES_MONITORING,
                record(json!({"equipment_name": "Kiln ID Fan", "efficiency_pct": 95.0, "days_since_maintenance": 20})),
            )
            .await
            .unwrap();
        store
            .insert(
                streams::UTILITIES_MONITORING,
                record(json!({"equipment_name": "Cooler Fan", "efficiency_pct": 92.0})),
            )
            .await
            .unwrap();

        let assessments = orchestrator.check_equipment_health().await.unwrap();

        assert_eq!(assessments.len(), 2);
        let fan = assessments
            .iter()
            .find(|a| a.equipment_name.as_deref() == Some("Kiln ID Fan"))
            .unwrap();
        assert_eq!(fan.health.maintenance_required, Some(true));
        assert!(store.is_empty(streams::AI_RECOMMENDATIONS).await);
    }

    #[tokio::test]
    async fn test_welcome_message_shape() {
        let (_, orchestrator) = setup();
        let message = orchestrator
            .welcome_message(Some(PriorityLevel::HIGH))
            .unwrap();
        let value: Value = serde_json::from_str(&message).unwrap();

        assert_eq!(value["type"], "welcome");
        assert_eq!(value["data"]["priority_filter"], 2);
        assert_eq!(value["created_at"], "2024-01-15T10:30:00.000Z");
    }

    #[tokio::test]
    async fn test_initial_payload_limits_alerts() {
        let (store, orchestrator) = setup();
        for i in 0..7 {
            store
                .insert(streams::AI_RECOMMENDATIONS, record(json!({"description": format!("alert {}", i)})))
                .await
                .unwrap();
        }

        let payload = orchestrator.initial_payload().await.unwrap();

        assert_eq!(payload.recommendations.len(), 5);
        assert_eq!(payload.recommendations[0]["description"], "alert 6");
    }
}
