//! Test utilities
//!
//! Generators for property-based tests over plant readings, plus in-process
//! doubles for the store and subscriber collaborators.

pub mod generators {
    use proptest::prelude::*;

    use crate::domain::{GrindingReading, KilnReading, RawMaterialReading};
    use crate::equipment_health::HealthInputs;

    /// Oxide percentage anywhere a lab could plausibly report, including 0
    pub fn oxide_pct() -> impl Strategy<Value = f64> {
        0.0..100.0f64
    }

    /// Raw-mix chemistry with every oxide present
    pub fn raw_material() -> impl Strategy<Value = RawMaterialReading> {
        (oxide_pct(), oxide_pct(), oxide_pct(), oxide_pct()).prop_map(
            |(cao, sio2, al2o3, fe2o3)| RawMaterialReading {
                cao_pct: Some(cao),
                sio2_pct: Some(sio2),
                al2o3_pct: Some(al2o3),
                fe2o3_pct: Some(fe2o3),
                ..Default::default()
            },
        )
    }

    /// Raw-mix chemistry where some oxides may be missing
    pub fn partial_raw_material() -> impl Strategy<Value = RawMaterialReading> {
        (
            prop::option::of(oxide_pct()),
            prop::option::of(oxide_pct()),
            prop::option::of(oxide_pct()),
            prop::option::of(oxide_pct()),
        )
            .prop_map(|(cao, sio2, al2o3, fe2o3)| RawMaterialReading {
                cao_pct: cao,
                sio2_pct: sio2,
                al2o3_pct: al2o3,
                fe2o3_pct: fe2o3,
                ..Default::default()
            })
    }

    /// Any finite f64 including extremes, for clamping properties
    pub fn finite_f64() -> impl Strategy<Value = f64> {
        prop::num::f64::NORMAL | prop::num::f64::ZERO | prop::num::f64::SUBNORMAL
    }

    pub fn mill_type() -> impl Strategy<Value = Option<String>> {
        prop::option::of(prop::sample::select(vec![
            "VRM".to_string(),
            "ball".to_string(),
            "roller_press".to_string(),
        ]))
    }

    pub fn grinding() -> impl Strategy<Value = GrindingReading> {
        (
            prop::option::of(0.0..6000.0f64),
            prop::option::of(0.0..250.0f64),
            mill_type(),
            prop::option::of(40.0..100.0f64),
        )
            .prop_map(|(power, feed, mill_type, dp)| GrindingReading {
                power_consumption_kw: power,
                total_feed_rate_tph: feed,
                mill_type,
                differential_pressure_mbar: dp,
                ..Default::default()
            })
    }

    pub fn alt_fuel_type() -> impl Strategy<Value = String> {
        prop::sample::select(vec![
            "waste_tire".to_string(),
            "biomass".to_string(),
            "RDF".to_string(),
            "petcoke".to_string(),
            "unknown_blend".to_string(),
        ])
    }

    pub fn kiln() -> impl Strategy<Value = KilnReading> {
        (
            prop::option::of(0.0..40.0f64),
            prop::option::of(0.0..20.0f64),
            prop::option::of(alt_fuel_type()),
        )
            .prop_map(|(coal, alt, alt_type)| KilnReading {
                coal_rate_tph: coal,
                alt_fuel_rate_tph: alt,
                alt_fuel_type: alt_type,
                ..Default::default()
            })
    }

    pub fn target_tsr() -> impl Strategy<Value = f64> {
        0.0..100.0f64
    }

    pub fn health_inputs() -> impl Strategy<Value = HealthInputs> {
        (0.0..120.0f64, 0.0..1000.0f64, 0.0..1000.0f64, 0i64..60).prop_map(
            |(efficiency, current, baseline, days)| HealthInputs {
                efficiency_pct: efficiency,
                current_power_kw: current,
                baseline_power_kw: baseline,
                maintenance_days: days,
            },
        )
    }
}

pub mod doubles {
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::registry::{Subscriber, TransportError};
    use crate::store::{Record, Store, StoreError};

    /// Subscriber that keeps every message it receives
    #[derive(Debug, Default)]
    pub struct RecordingSubscriber {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingSubscriber {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        pub fn count(&self) -> usize {
            self.messages.lock().unwrap_or_else(|e| e.into_inner()).len()
        }
    }

    #[async_trait]
    impl Subscriber for RecordingSubscriber {
        async fn send(&self, message: &str) -> Result<(), TransportError> {
            self.messages
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(message.to_string());
            Ok(())
        }
    }

    /// Subscriber whose transport always fails; counts attempts
    #[derive(Debug, Default)]
    pub struct FailingSubscriber {
        attempts: AtomicUsize,
    }

    impl FailingSubscriber {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Subscriber for FailingSubscriber {
        async fn send(&self, _message: &str) -> Result<(), TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Closed)
        }
    }

    /// One entry of a [`JournalingStore`] call log
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum StoreCall {
        Read(String),
        Insert(String),
        Update(String),
    }

    /// Wraps a store, journals every call and can fail inserts into chosen
    /// streams.
    pub struct JournalingStore<S> {
        inner: S,
        journal: Mutex<Vec<StoreCall>>,
        failing_inserts: Mutex<HashSet<String>>,
    }

    impl<S: Store> JournalingStore<S> {
        pub fn new(inner: S) -> Self {
            Self {
                inner,
                journal: Mutex::new(Vec::new()),
                failing_inserts: Mutex::new(HashSet::new()),
            }
        }

        pub fn fail_inserts_into(&self, stream: &str) {
            self.failing_inserts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(stream.to_string());
        }

        pub fn journal(&self) -> Vec<StoreCall> {
            self.journal.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        pub fn inner(&self) -> &S {
            &self.inner
        }

        fn log(&self, call: StoreCall) {
            self.journal
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(call);
        }
    }

    #[async_trait]
    impl<S: Store> Store for JournalingStore<S> {
        async fn get_latest(&self, stream: &str) -> Result<Option<Record>, StoreError> {
            self.log(StoreCall::Read(stream.to_string()));
            self.inner.get_latest(stream).await
        }

        async fn get_recent(
            &self,
            stream: &str,
            limit: usize,
            filter: Option<&Record>,
            order_by: Option<&str>,
        ) -> Result<Vec<Record>, StoreError> {
            self.log(StoreCall::Read(stream.to_string()));
            self.inner.get_recent(stream, limit, filter, order_by).await
        }

        async fn insert(&self, stream: &str, record: Record) -> Result<Record, StoreError> {
            self.log(StoreCall::Insert(stream.to_string()));
            let failing = self
                .failing_inserts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .contains(stream);
            if failing {
                return Err(StoreError::Backend(format!("insert into {} rejected", stream)));
            }
            self.inner.insert(stream, record).await
        }

        async fn update(&self, stream: &str, matching: &Record, patch: &Record) -> Result<u64, StoreError> {
            self.log(StoreCall::Update(stream.to_string()));
            self.inner.update(stream, matching, patch).await
        }

        async fn close(&self) -> Result<(), StoreError> {
            self.inner.close().await
        }
    }
}

pub mod helpers {
    use serde_json::Value;

    use crate::store::Record;

    /// Turn a `json!` object literal into a record; panics on non-objects
    pub fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected a JSON object, got {}", other),
        }
    }

    /// Fixed instant used across tests
    pub const TEST_TIMESTAMP: &str = "2024-01-15T10:30:00Z";
}
