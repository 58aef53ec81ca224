// Crestron Home HTTP client
//
// Wraps `reqwest::Client` with the hub's token → auth-key session dance,
// envelope unwrapping, and a cached room list. Sessions on the processor
// expire after ten minutes, so the key is renewed proactively after nine
// and reactively on HTTP 401.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::hub::{HubApi, record_id};
use crate::models::{
    DevicesEnvelope, LightState, LightsBody, LoginResponse, RawRecord, Room, RoomsEnvelope,
    ScenesEnvelope, SensorsEnvelope, SetPoint, SetPointBody, ShadeState, ShadesBody,
    ShadesEnvelope, ThermostatMode, ThermostatModesBody, ThermostatsEnvelope, into_records,
};
use crate::transport::TransportConfig;

/// API root on the processor.
pub const API_PATH: &str = "/cws/api/";

/// Header carrying the long-lived web API token at login.
pub const AUTH_TOKEN_HEADER: &str = "Crestron-RestAPI-AuthToken";

/// Header carrying the short-lived session key on every other request.
pub const AUTH_KEY_HEADER: &str = "Crestron-RestAPI-AuthKey";

/// Renew the session before the processor's ten minute TTL runs out.
pub const SESSION_TTL: Duration = Duration::from_secs(9 * 60);

const SCENE_TYPE: &str = "scene";

struct Session {
    auth_key: String,
    created: Instant,
}

impl Session {
    fn is_fresh(&self) -> bool {
        self.created.elapsed() < SESSION_TTL
    }
}

/// HTTP client for one Crestron Home processor.
pub struct HubClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
    session: Mutex<Option<Session>>,
    rooms: ArcSwap<Vec<Room>>,
}

impl HubClient {
    /// Create a client for `host` (name or IP, optionally with port).
    pub fn new(
        host: &str,
        token: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(&format!("https://{host}{API_PATH}"))?;
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, token))
    }

    /// Create a client with a pre-built `reqwest::Client` and API root.
    ///
    /// `base_url` must end with a slash (e.g. `https://hub/cws/api/`).
    pub fn with_client(http: reqwest::Client, base_url: Url, token: SecretString) -> Self {
        Self {
            http,
            base_url,
            token,
            session: Mutex::new(None),
            rooms: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// The processor host, as used in the API root.
    pub fn host(&self) -> &str {
        self.base_url.host_str().unwrap_or_default()
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Exchange the API token for a session key and refresh the room cache.
    pub async fn login(&self) -> Result<(), Error> {
        let key = self.open_session().await?;
        *self.session.lock().await = Some(Session {
            auth_key: key,
            created: Instant::now(),
        });
        self.refresh_rooms().await?;
        Ok(())
    }

    async fn open_session(&self) -> Result<String, Error> {
        let url = self.endpoint("login")?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .header(AUTH_TOKEN_HEADER, self.token.expose_secret())
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Authentication {
                message: format!("token rejected (HTTP {})", status.as_u16()),
            });
        }

        let login: LoginResponse = parse_body(resp).await?;
        let key = login.authkey.ok_or_else(|| Error::Authentication {
            message: "login response carried no auth key".into(),
        })?;
        debug!(version = ?login.version, "hub session established");
        Ok(key)
    }

    /// Return a valid session key, logging in when none is held or it aged out.
    async fn auth_key(&self) -> Result<String, Error> {
        let mut session = self.session.lock().await;
        if let Some(current) = session.as_ref().filter(|s| s.is_fresh()) {
            return Ok(current.auth_key.clone());
        }
        let key = self.open_session().await?;
        *session = Some(Session {
            auth_key: key.clone(),
            created: Instant::now(),
        });
        Ok(key)
    }

    async fn invalidate_session(&self) {
        *self.session.lock().await = None;
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Send an authenticated request, re-authenticating once on HTTP 401.
    async fn send_authed(
        &self,
        build: impl Fn(&str) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, Error> {
        let mut retried = false;
        loop {
            let key = self.auth_key().await?;
            let resp = build(&key).send().await?;
            if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
                self.invalidate_session().await;
                if retried {
                    return Err(Error::Authentication {
                        message: "auth key rejected after re-login".into(),
                    });
                }
                debug!("session key rejected, logging in again");
                retried = true;
                continue;
            }
            return Ok(resp);
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let resp = self
            .send_authed(|key| self.http.get(url.clone()).header(AUTH_KEY_HEADER, key))
            .await?;
        parse_body(resp).await
    }

    pub(crate) async fn post(&self, path: &str, body: Option<&impl Serialize>) -> Result<(), Error> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        let resp = self
            .send_authed(|key| {
                let req = self.http.post(url.clone()).header(AUTH_KEY_HEADER, key);
                match body {
                    Some(b) => req.json(b),
                    None => req,
                }
            })
            .await?;
        check_status(resp).await.map(drop)
    }

    // ── Rooms ────────────────────────────────────────────────────────

    /// Re-read `/rooms` into the cache and return it.
    pub async fn refresh_rooms(&self) -> Result<Arc<Vec<Room>>, Error> {
        let envelope: RoomsEnvelope = self.get("rooms").await?;
        trace!(rooms = envelope.rooms.len(), "room cache refreshed");
        let rooms = Arc::new(envelope.rooms);
        self.rooms.store(Arc::clone(&rooms));
        Ok(rooms)
    }
}

#[async_trait]
impl HubApi for HubClient {
    async fn get_devices(
        &self,
        enabled_types: &[String],
        _ignored_patterns: &[String],
    ) -> Result<Vec<RawRecord>, Error> {
        let want_scenes = enabled_types.iter().any(|t| t == SCENE_TYPE);

        let (devices, scenes, rooms) = tokio::try_join!(
            self.get::<DevicesEnvelope>("devices"),
            async {
                if want_scenes {
                    self.get::<ScenesEnvelope>("scenes").await.map(|s| s.scenes)
                } else {
                    Ok(Vec::new())
                }
            },
            self.refresh_rooms(),
        )?;

        let names: HashMap<u32, &str> = rooms.iter().map(|r| (r.id, r.name.as_str())).collect();

        let mut records = into_records(devices.devices);
        let mut scene_records = into_records(scenes);
        for scene in &mut scene_records {
            if !scene.contains_key("type") && !scene.contains_key("subType") {
                scene.insert("type".into(), Value::from("Scene"));
            }
        }
        records.extend(scene_records);

        for record in &mut records {
            if record.contains_key("roomName") {
                continue;
            }
            let room = record
                .get("roomId")
                .and_then(Value::as_u64)
                .and_then(|id| u32::try_from(id).ok())
                .and_then(|id| names.get(&id));
            if let Some(name) = room {
                record.insert("roomName".into(), Value::from(*name));
            }
        }

        Ok(records)
    }

    async fn get_sensors(&self, _ignored_patterns: &[String]) -> Result<Vec<RawRecord>, Error> {
        let envelope: SensorsEnvelope = self.get("sensors").await?;
        Ok(into_records(envelope.sensors))
    }

    async fn get_thermostats(&self) -> Result<Vec<RawRecord>, Error> {
        let envelope: ThermostatsEnvelope = self.get("thermostats").await?;
        Ok(into_records(envelope.thermostats))
    }

    fn rooms(&self) -> Vec<Room> {
        self.rooms.load().as_ref().clone()
    }

    async fn set_light_state(
        &self,
        id: u32,
        level: u32,
        transition_secs: u32,
    ) -> Result<(), Error> {
        let body = LightsBody {
            lights: vec![LightState {
                id,
                level,
                time: transition_secs,
            }],
        };
        self.post("lights/SetState", Some(&body)).await
    }

    async fn set_shade_position(&self, id: u32, position: u32) -> Result<(), Error> {
        let body = ShadesBody {
            shades: vec![ShadeState { id, position }],
        };
        self.post("shades/SetState", Some(&body)).await
    }

    async fn get_shade_state(&self, id: u32) -> Result<RawRecord, Error> {
        let envelope: ShadesEnvelope = self.get(&format!("shades/{id}")).await?;
        into_records(envelope.shades)
            .into_iter()
            .find(|r| record_id(r) == Some(id))
            .ok_or_else(|| Error::Api {
                status: 404,
                message: format!("shade {id} missing from response"),
            })
    }

    async fn recall_scene(&self, id: u32) -> Result<(), Error> {
        self.post(&format!("scenes/recall/{id}"), None::<&()>).await
    }

    async fn set_thermostat_mode(&self, id: u32, mode: &str) -> Result<(), Error> {
        let body = ThermostatModesBody {
            thermostats: vec![ThermostatMode { id, mode }],
        };
        self.post("thermostats/mode", Some(&body)).await
    }

    async fn set_thermostat_setpoint(
        &self,
        id: u32,
        kind: &str,
        temperature: i32,
    ) -> Result<(), Error> {
        let body = SetPointBody {
            id,
            setpoints: vec![SetPoint { kind, temperature }],
        };
        self.post("thermostats/SetPoint", Some(&body)).await
    }

    async fn set_thermostat_fan_mode(&self, id: u32, mode: &str) -> Result<(), Error> {
        let body = ThermostatModesBody {
            thermostats: vec![ThermostatMode { id, mode }],
        };
        self.post("thermostats/fanmode", Some(&body)).await
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "session expired or invalid auth key".into(),
        });
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "hub returned an error status");
    Err(Error::Api {
        status: status.as_u16(),
        message: if body.is_empty() {
            status.canonical_reason().unwrap_or("unknown error").into()
        } else {
            body
        },
    })
}

async fn parse_body<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let resp = check_status(resp).await?;
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}
