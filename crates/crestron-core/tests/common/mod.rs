// Scripted in-memory hub shared by the integration tests.
#![allow(clippy::unwrap_used, dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use crestron_api::{Error, HubApi, RawRecord, Room};
use serde_json::Value;

/// A write the hub received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Light { id: u32, level: u32, transition: u32 },
    ShadePosition { id: u32, position: u32 },
    ShadeState { id: u32 },
    Scene { id: u32 },
    Mode { id: u32, mode: String },
    SetPoint { id: u32, kind: String, temperature: i32 },
    FanMode { id: u32, mode: String },
}

#[derive(Default)]
pub struct FakeHub {
    devices: Mutex<Vec<RawRecord>>,
    sensors: Mutex<Vec<RawRecord>>,
    thermostats: Mutex<Vec<RawRecord>>,
    rooms: Mutex<Vec<Room>>,
    shade_states: Mutex<Vec<RawRecord>>,
    failing: Mutex<HashSet<&'static str>>,
    latency: Mutex<Duration>,
    calls: Mutex<Vec<Call>>,
    device_fetches: AtomicUsize,
    thermostat_fetches: AtomicUsize,
}

pub fn record(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

impl FakeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_devices(&self, records: Vec<Value>) {
        *self.devices.lock().unwrap() = records.into_iter().map(record).collect();
    }

    pub fn set_sensors(&self, records: Vec<Value>) {
        *self.sensors.lock().unwrap() = records.into_iter().map(record).collect();
    }

    pub fn set_thermostats(&self, records: Vec<Value>) {
        *self.thermostats.lock().unwrap() = records.into_iter().map(record).collect();
    }

    pub fn set_rooms(&self, rooms: &[(u32, &str)]) {
        *self.rooms.lock().unwrap() = rooms
            .iter()
            .map(|(id, name)| Room {
                id: *id,
                name: (*name).to_owned(),
            })
            .collect();
    }

    pub fn set_shade_state(&self, state: Value) {
        self.shade_states.lock().unwrap().push(record(state));
    }

    /// Make a collection (`"devices"`, `"sensors"`, `"thermostats"`,
    /// `"shade_state"`) fail until [`recover`](Self::recover).
    pub fn fail(&self, collection: &'static str) {
        self.failing.lock().unwrap().insert(collection);
    }

    pub fn recover(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Delay every device fetch by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn device_fetches(&self) -> usize {
        self.device_fetches.load(Ordering::SeqCst)
    }

    pub fn thermostat_fetches(&self) -> usize {
        self.thermostat_fetches.load(Ordering::SeqCst)
    }

    fn check(&self, collection: &'static str) -> Result<(), Error> {
        if self.failing.lock().unwrap().contains(collection) {
            return Err(Error::Api {
                status: 503,
                message: format!("{collection} unavailable"),
            });
        }
        Ok(())
    }

    fn record_call(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HubApi for FakeHub {
    async fn get_devices(
        &self,
        _enabled_types: &[String],
        _ignored_patterns: &[String],
    ) -> Result<Vec<RawRecord>, Error> {
        self.device_fetches.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.check("devices")?;
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn get_sensors(&self, _ignored_patterns: &[String]) -> Result<Vec<RawRecord>, Error> {
        self.check("sensors")?;
        Ok(self.sensors.lock().unwrap().clone())
    }

    async fn get_thermostats(&self) -> Result<Vec<RawRecord>, Error> {
        self.thermostat_fetches.fetch_add(1, Ordering::SeqCst);
        self.check("thermostats")?;
        Ok(self.thermostats.lock().unwrap().clone())
    }

    fn rooms(&self) -> Vec<Room> {
        self.rooms.lock().unwrap().clone()
    }

    async fn set_light_state(&self, id: u32, level: u32, transition: u32) -> Result<(), Error> {
        self.record_call(Call::Light {
            id,
            level,
            transition,
        });
        Ok(())
    }

    async fn set_shade_position(&self, id: u32, position: u32) -> Result<(), Error> {
        self.record_call(Call::ShadePosition { id, position });
        Ok(())
    }

    async fn get_shade_state(&self, id: u32) -> Result<RawRecord, Error> {
        self.record_call(Call::ShadeState { id });
        self.check("shade_state")?;
        self.shade_states
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.get("id").and_then(Value::as_u64) == Some(u64::from(id)))
            .cloned()
            .ok_or_else(|| Error::Api {
                status: 404,
                message: "no such shade".into(),
            })
    }

    async fn recall_scene(&self, id: u32) -> Result<(), Error> {
        self.record_call(Call::Scene { id });
        Ok(())
    }

    async fn set_thermostat_mode(&self, id: u32, mode: &str) -> Result<(), Error> {
        self.record_call(Call::Mode {
            id,
            mode: mode.to_owned(),
        });
        Ok(())
    }

    async fn set_thermostat_setpoint(
        &self,
        id: u32,
        kind: &str,
        temperature: i32,
    ) -> Result<(), Error> {
        self.record_call(Call::SetPoint {
            id,
            kind: kind.to_owned(),
            temperature,
        });
        Ok(())
    }

    async fn set_thermostat_fan_mode(&self, id: u32, mode: &str) -> Result<(), Error> {
        self.record_call(Call::FanMode {
            id,
            mode: mode.to_owned(),
        });
        Ok(())
    }
}
