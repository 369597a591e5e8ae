//! Connector schema and outcome types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Which kind of research task a connector serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityScope {
    /// Company-level signals, shared by every lead at that company
    Company,
    /// Person-level signals for a single lead
    Profile,
}

impl fmt::Display for EntityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Company => write!(f, "company"),
            Self::Profile => write!(f, "profile"),
        }
    }
}

/// Declared type of a connector argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl ParamType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

/// One named argument in a connector schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Declared contract of a connector: name, scope, and argument schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSchema {
    pub name: String,
    pub description: String,
    pub scope: EntityScope,
    pub params: Vec<ParamSpec>,
}

impl ConnectorSchema {
    /// Create a schema with no parameters
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        scope: EntityScope,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            scope,
            params: Vec::new(),
        }
    }

    /// Add a required parameter
    pub fn required(mut self, name: &str, ty: ParamType, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            ty,
            description: description.to_string(),
            required: true,
            default: None,
        });
        self
    }

    /// Add an optional parameter with a default value
    pub fn optional(
        mut self,
        name: &str,
        ty: ParamType,
        description: &str,
        default: Value,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            ty,
            description: description.to_string(),
            required: false,
            default: Some(default),
        });
        self
    }

    /// Validate an argument object against this schema
    ///
    /// Returns the argument object with defaults filled in. Unknown fields,
    /// missing required fields and type mismatches are rejected. A `null`
    /// value counts as absent.
    pub fn validate(&self, args: &Value) -> Result<Value, SchemaError> {
        let empty = Map::new();
        let given = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(SchemaError::NotAnObject),
        };

        if let Some(unknown) = given
            .keys()
            .find(|key| !self.params.iter().any(|p| &p.name == *key))
        {
            return Err(SchemaError::UnknownParameter(unknown.clone()));
        }

        let mut out = Map::new();
        for param in &self.params {
            match given.get(&param.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    if !param.ty.accepts(value) {
                        return Err(SchemaError::InvalidParameter {
                            name: param.name.clone(),
                            expected: param.ty.as_str(),
                        });
                    }
                    out.insert(param.name.clone(), value.clone());
                }
                None if param.required => {
                    return Err(SchemaError::MissingParameter(param.name.clone()));
                }
                None => {
                    if let Some(default) = &param.default {
                        out.insert(param.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(Value::Object(out))
    }

    /// Compact single-line signature used when listing connectors to a model
    ///
    /// e.g. `get_linkedin_activity(linkedin_url: string, limit?: integer = 10)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let opt = if p.required { "" } else { "?" };
                match &p.default {
                    Some(d) => format!("{}{}: {} = {}", p.name, opt, p.ty.as_str(), d),
                    None => format!("{}{}: {}", p.name, opt, p.ty.as_str()),
                }
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// Read access to a validated argument object
#[derive(Debug, Clone, Copy)]
pub struct ConnectorArgs<'a> {
    inner: &'a Value,
}

impl<'a> ConnectorArgs<'a> {
    pub fn new(inner: &'a Value) -> Self {
        Self { inner }
    }

    /// Get a string parameter
    pub fn param_str(&self, key: &str) -> Result<&'a str, SchemaError> {
        self.inner
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::MissingParameter(key.to_string()))
    }

    /// Get an optional i64 parameter
    pub fn param_i64_opt(&self, key: &str) -> Option<i64> {
        self.inner.get(key).and_then(|v| v.as_i64())
    }

    /// Get an optional bool parameter
    pub fn param_bool_opt(&self, key: &str) -> Option<bool> {
        self.inner.get(key).and_then(|v| v.as_bool())
    }
}

/// Argument validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Arguments must be a JSON object")]
    NotAnObject,

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid parameter: {name} (expected {expected})")]
    InvalidParameter { name: String, expected: &'static str },
}

/// Classification of an expected connector failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingCredential,
    NotFound,
    RateLimited,
    Timeout,
    BadResponse,
    Network,
    InvalidArguments,
    Unavailable,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingCredential => "missing_credential",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::BadResponse => "bad_response",
            Self::Network => "network",
            Self::InvalidArguments => "invalid_arguments",
            Self::Unavailable => "unavailable",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Typed failure payload of a connector call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl fmt::Display for ConnectorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

/// Outcome of a connector invocation
///
/// Exactly one of a result payload or a failure. Serializes as
/// `{"ok": <payload>}` or `{"error": {"kind": .., "reason": ..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConnectorOutput {
    #[serde(rename = "ok")]
    Success(Value),
    #[serde(rename = "error")]
    Failure(ConnectorFailure),
}

impl ConnectorOutput {
    /// Create a successful outcome
    pub fn ok(payload: Value) -> Self {
        Self::Success(payload)
    }

    /// Create a failed outcome
    pub fn fail(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self::Failure(ConnectorFailure {
            kind,
            reason: reason.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success(v) => Some(v),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ConnectorFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(f) => Some(f),
        }
    }
}
