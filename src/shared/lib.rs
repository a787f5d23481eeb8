// Declare modules at the root level
pub mod chemistry;
pub mod domain;
pub mod equipment_health;
pub mod error;
pub mod fuel_mix;
pub mod grinding;
pub mod id_generator;
pub mod kpi;
pub mod orchestrator;
pub mod overview;
pub mod plant_insights;
pub mod registry;
pub mod scheduler;
pub mod sensor_validation;
pub mod store;
pub mod time;
pub mod validators;

// Generators and collaborator doubles for unit and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export everything under a shared namespace for external access
pub mod shared {
    pub use super::chemistry;
    pub use super::domain;
    pub use super::equipment_health;
    pub use super::error;
    pub use super::fuel_mix;
    pub use super::grinding;
    pub use super::id_generator;
    pub use super::kpi;
    pub use super::orchestrator;
    pub use super::overview;
    pub use super::plant_insights;
    pub use super::registry;
    pub use super::scheduler;
    pub use super::sensor_validation;
    pub use super::store;
    pub use super::time;
    pub use super::validators;
}

// Also re-export the main types at root for convenience
pub use chemistry::{analyze_chemistry, ChemistryAnalysis};
pub use domain::*;
pub use equipment_health::{assess_equipment_health, EquipmentHealth, HealthInputs, HealthStatus};
pub use error::*;
pub use fuel_mix::{optimize_fuel_mix, Feasibility, FuelMixPlan};
pub use grinding::{analyze_grinding, GrindingAnalysis};
pub use id_generator::*;
pub use kpi::{EnergySavings, KpiAggregator, KpiReport};
pub use orchestrator::{PipelineSettings, PlantOrchestrator, PlantUpdate};
pub use overview::{summarize_overview, OverviewSummary};
pub use plant_insights::*;
pub use registry::{ChannelSubscriber, ConnectionRegistry, Subscriber, Subscription, Topic, TransportError};
pub use scheduler::{JobId, ScheduledJob, Scheduler, SchedulerHandle};
pub use sensor_validation::CalculationError;
pub use store::{MemoryStore, Record, Store, StoreError};
pub use time::*;
pub use validators::*;
