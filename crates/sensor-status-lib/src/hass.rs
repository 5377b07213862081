//! Home Assistant communication — trait + REST backend.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ── Error type ──

/// Home Assistant communication errors.
///
/// String payloads follow the convention **"context: details"** where
/// *context* names the request (e.g. `"GET /api/states"`) and *details*
/// describes what went wrong.
#[derive(Debug)]
pub enum HassError {
    /// The access token was rejected (HTTP 401/403).
    Unauthorized,
    /// The request never produced a response (DNS, refused, timeout).
    Transport(String),
    /// Home Assistant answered with an unexpected status code.
    Status { code: u16, context: String },
    /// The response body could not be decoded.
    Decode(String),
    /// The entity is not attached to any device.
    NoDevice(String),
}

impl fmt::Display for HassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HassError::Unauthorized => write!(f, "Home Assistant rejected the access token"),
            HassError::Transport(e) => write!(f, "Request failed: {e}"),
            HassError::Status { code, context } => {
                write!(f, "Unexpected HTTP status {code}: {context}")
            }
            HassError::Decode(e) => write!(f, "Invalid response: {e}"),
            HassError::NoDevice(entity) => write!(f, "Entity has no device: {entity}"),
        }
    }
}

impl std::error::Error for HassError {}

pub type Result<T> = std::result::Result<T, HassError>;

// ── Instance info ──

/// Identity of the connected Home Assistant instance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HassInfo {
    pub url: String,
    pub version: String,
    pub location_name: String,
}

/// Entity id → current state string, as of one poll.
pub type StateSnapshot = HashMap<String, String>;

/// One row of `GET /api/states`. Attributes are not needed.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiConfig {
    #[serde(default)]
    version: String,
    #[serde(default)]
    location_name: String,
}

// ── Trait ──

pub trait HomeAssistant {
    fn info(&self) -> &HassInfo;
    /// Current state of every entity.
    fn states(&self) -> Result<StateSnapshot>;
    /// Current state of one entity, `None` if the entity does not exist.
    fn state(&self, entity_id: &str) -> Result<Option<String>>;
    /// Device registry id of the device owning `entity_id`.
    fn device_id(&self, entity_id: &str) -> Result<String>;
    fn call_service(&self, domain: &str, service: &str, data: &serde_json::Value) -> Result<()>;
}

// ── REST backend ──

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Join the configured base URL and an API path.
pub fn endpoint_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Jinja template that renders the device id of an entity.
pub fn device_id_template(entity_id: &str) -> String {
    format!("{{{{ device_id('{entity_id}') }}}}")
}

/// Interpret a rendered `device_id()` template.
///
/// Home Assistant renders a missing device as `None`.
pub fn parse_device_id(entity_id: &str, rendered: &str) -> Result<String> {
    let id = rendered.trim();
    if id.is_empty() || id == "None" {
        return Err(HassError::NoDevice(entity_id.to_string()));
    }
    Ok(id.to_string())
}

/// Build a snapshot from a `GET /api/states` listing.
pub fn snapshot_from(states: Vec<EntityState>) -> StateSnapshot {
    states
        .into_iter()
        .map(|s| (s.entity_id, s.state))
        .collect()
}

/// Blocking client for the Home Assistant REST API.
pub struct RestClient {
    http: Client,
    token: String,
    info: HassInfo,
    /// Device ids never change while we run, so lookups are cached.
    device_ids: RefCell<HashMap<String, String>>,
}

impl RestClient {
    /// Connect to Home Assistant and verify the token.
    pub fn connect(url: &str, token: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("sensor-status/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HassError::Transport(format!("HTTP client: {e}")))?;

        let mut client = RestClient {
            http,
            token: token.to_string(),
            info: HassInfo {
                url: url.trim_end_matches('/').to_string(),
                ..HassInfo::default()
            },
            device_ids: RefCell::new(HashMap::new()),
        };

        let ping: ApiMessage = client.get_json("/api/")?;
        log::debug!("GET /api/: {}", ping.message);

        let config: ApiConfig = client.get_json("/api/config")?;
        client.info.version = config.version;
        client.info.location_name = config.location_name;
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        endpoint_url(&self.info.url, path)
    }

    fn execute(&self, context: &str, request: RequestBuilder) -> Result<Response> {
        request
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| HassError::Transport(format!("{context}: {e}")))
    }

    fn check(context: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(HassError::Unauthorized);
        }
        if !status.is_success() {
            return Err(HassError::Status {
                code: status.as_u16(),
                context: context.to_string(),
            });
        }
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let context = format!("GET {path}");
        let response = self.execute(&context, self.http.get(self.url(path)))?;
        Self::check(&context, response)?
            .json()
            .map_err(|e| HassError::Decode(format!("{context}: {e}")))
    }
}

impl HomeAssistant for RestClient {
    fn info(&self) -> &HassInfo {
        &self.info
    }

    fn states(&self) -> Result<StateSnapshot> {
        let states: Vec<EntityState> = self.get_json("/api/states")?;
        Ok(snapshot_from(states))
    }

    fn state(&self, entity_id: &str) -> Result<Option<String>> {
        let path = format!("/api/states/{entity_id}");
        let context = format!("GET {path}");
        let response = self.execute(&context, self.http.get(self.url(&path)))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let state: EntityState = Self::check(&context, response)?
            .json()
            .map_err(|e| HassError::Decode(format!("{context}: {e}")))?;
        Ok(Some(state.state))
    }

    fn device_id(&self, entity_id: &str) -> Result<String> {
        if let Some(id) = self.device_ids.borrow().get(entity_id) {
            return Ok(id.clone());
        }
        let context = "POST /api/template";
        let body = serde_json::json!({ "template": device_id_template(entity_id) });
        let response = self.execute(
            context,
            self.http.post(self.url("/api/template")).json(&body),
        )?;
        let rendered = Self::check(context, response)?
            .text()
            .map_err(|e| HassError::Decode(format!("{context}: {e}")))?;
        let id = parse_device_id(entity_id, &rendered)?;
        self.device_ids
            .borrow_mut()
            .insert(entity_id.to_string(), id.clone());
        Ok(id)
    }

    fn call_service(&self, domain: &str, service: &str, data: &serde_json::Value) -> Result<()> {
        let path = format!("/api/services/{domain}/{service}");
        let context = format!("POST {path}");
        let response = self.execute(&context, self.http.post(self.url(&path)).json(data))?;
        Self::check(&context, response)?;
        Ok(())
    }
}

// ── Mock client for testing ──

/// In-memory Home Assistant for unit and integration tests.
///
/// Always compiled, hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;

    /// A recorded `call_service` invocation.
    #[derive(Debug, Clone, PartialEq)]
    pub struct ServiceCall {
        pub domain: String,
        pub service: String,
        pub data: serde_json::Value,
    }

    /// In-memory instance. Entities without an explicit device id resolve
    /// to `"dev-<entity_id>"`.
    pub struct MockHass {
        info: HassInfo,
        pub states: RefCell<StateSnapshot>,
        pub device_ids: RefCell<HashMap<String, String>>,
        /// Entities whose device lookup fails with `NoDevice`.
        pub orphans: RefCell<Vec<String>>,
        pub calls: RefCell<Vec<ServiceCall>>,
        /// If true, `call_service` returns an error.
        pub fail_calls: Cell<bool>,
        /// If true, `states` and `state` return an error.
        pub fail_states: Cell<bool>,
    }

    impl Default for MockHass {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockHass {
        pub fn new() -> Self {
            MockHass {
                info: HassInfo {
                    url: "mock://homeassistant".into(),
                    version: "2024.1.0".into(),
                    location_name: "Mock Home".into(),
                },
                states: RefCell::new(HashMap::new()),
                device_ids: RefCell::new(HashMap::new()),
                orphans: RefCell::new(Vec::new()),
                calls: RefCell::new(Vec::new()),
                fail_calls: Cell::new(false),
                fail_states: Cell::new(false),
            }
        }

        pub fn set_state(&self, entity_id: &str, state: &str) {
            self.states
                .borrow_mut()
                .insert(entity_id.to_string(), state.to_string());
        }

        pub fn remove_state(&self, entity_id: &str) {
            self.states.borrow_mut().remove(entity_id);
        }

        /// `(device_id, parameter, value)` of every recorded config write.
        pub fn config_writes(&self) -> Vec<(String, u64, u64)> {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c.domain == "zwave_js" && c.service == "set_config_parameter")
                .map(|c| {
                    (
                        c.data["device_id"].as_str().unwrap_or_default().to_string(),
                        c.data["parameter"].as_u64().unwrap_or_default(),
                        c.data["value"].as_u64().unwrap_or_default(),
                    )
                })
                .collect()
        }

        pub fn clear_calls(&self) {
            self.calls.borrow_mut().clear();
        }
    }

    impl HomeAssistant for MockHass {
        fn info(&self) -> &HassInfo {
            &self.info
        }

        fn states(&self) -> Result<StateSnapshot> {
            if self.fail_states.get() {
                return Err(HassError::Transport(
                    "mock: states failure injected".into(),
                ));
            }
            Ok(self.states.borrow().clone())
        }

        fn state(&self, entity_id: &str) -> Result<Option<String>> {
            if self.fail_states.get() {
                return Err(HassError::Transport("mock: state failure injected".into()));
            }
            Ok(self.states.borrow().get(entity_id).cloned())
        }

        fn device_id(&self, entity_id: &str) -> Result<String> {
            if self.orphans.borrow().iter().any(|e| e == entity_id) {
                return Err(HassError::NoDevice(entity_id.to_string()));
            }
            Ok(self
                .device_ids
                .borrow()
                .get(entity_id)
                .cloned()
                .unwrap_or_else(|| format!("dev-{entity_id}")))
        }

        fn call_service(
            &self,
            domain: &str,
            service: &str,
            data: &serde_json::Value,
        ) -> Result<()> {
            if self.fail_calls.get() {
                return Err(HassError::Status {
                    code: 500,
                    context: format!("mock: POST /api/services/{domain}/{service}"),
                });
            }
            self.calls.borrow_mut().push(ServiceCall {
                domain: domain.to_string(),
                service: service.to_string(),
                data: data.clone(),
            });
            Ok(())
        }
    }
}
