//! Wire protocol
//!
//! One JSON object per line in each direction over a plain TCP stream.
//!
//! Request:  `{"requestId", "service", "method", "params"}`
//! Response: `{"requestId", "success", "data"?, "error"?}`
//!
//! Server pushes reuse the response envelope with an empty `requestId`
//! and a `data.event` discriminator.

mod command;
mod event;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use command::{Command, JoinStatus};
pub use event::Event;
pub(crate) use event::effectiveness_name;

/// Protocol-level errors. These are answered, never fatal.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown method {method} for {service}")]
    UnknownMethod { service: Service, method: String },

    #[error("missing parameter '{0}'")]
    MissingParam(&'static str),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParam { name: &'static str, reason: String },
}

/// Service selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    BattleService,
    UserService,
    PokemonService,
    TeamService,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Service::BattleService => "BattleService",
            Service::UserService => "UserService",
            Service::PokemonService => "PokemonService",
            Service::TeamService => "TeamService",
        };
        write!(f, "{}", s)
    }
}

/// Request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_id: String,
    pub service: Service,
    pub method: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Request {
    /// Build a request with a fresh request id
    pub fn new(service: Service, method: &str, params: Map<String, Value>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            service,
            method: method.to_string(),
            params,
        }
    }

    /// Parse one request line
    pub fn from_line(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub request_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Successful response carrying `data`
    pub fn ok(request_id: &str, data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                request_id: request_id.to_string(),
                success: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Self::error(request_id, format!("failed to encode response: {}", e)),
        }
    }

    /// Failed response
    pub fn error(request_id: &str, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.to_string(),
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Unsolicited server push
    pub fn push(event: &Event) -> Self {
        Self::ok("", event)
    }

    /// Whether this is a push rather than a reply
    pub fn is_event(&self) -> bool {
        self.request_id.is_empty() && self.data.as_ref().is_some_and(|d| d.get("event").is_some())
    }

    /// Decode the pushed event, if this is one
    pub fn event(&self) -> Option<Event> {
        if !self.is_event() {
            return None;
        }
        self.data
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Parse one response line
    pub fn from_line(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Serialize a message as a single newline-terminated line
pub fn to_line<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Read an integer parameter.
///
/// Clients send numbers as floating point; the fractional part is
/// truncated. Numeric strings are accepted as well.
pub fn int_param(params: &Map<String, Value>, name: &'static str) -> Result<i64, ProtocolError> {
    let value = params.get(name).ok_or(ProtocolError::MissingParam(name))?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => Ok(n.trunc() as i64),
        _ => Err(ProtocolError::InvalidParam {
            name,
            reason: format!("expected a number, got {}", value),
        }),
    }
}

/// Read a non-negative integer parameter as an index or count
pub fn index_param(
    params: &Map<String, Value>,
    name: &'static str,
) -> Result<usize, ProtocolError> {
    let n = int_param(params, name)?;
    usize::try_from(n).map_err(|_| ProtocolError::InvalidParam {
        name,
        reason: format!("must not be negative, got {}", n),
    })
}

/// Read a string parameter
pub fn str_param(params: &Map<String, Value>, name: &'static str) -> Result<String, ProtocolError> {
    match params.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ProtocolError::InvalidParam {
            name,
            reason: format!("expected a string, got {}", other),
        }),
        None => Err(ProtocolError::MissingParam(name)),
    }
}
