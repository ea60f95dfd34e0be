use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::JSONRPC_VERSION;
use crate::error::{ErrorObject, ErrorResponse};
use crate::types::RequestId;

/// Parameters of a JSON-RPC call.
///
/// The shape is decided once at parse time and pattern-matched at invocation;
/// an absent member and an explicit `params: null` both end up as
/// `Option::None` on [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    /// Positional parameters as an array
    Positional(Vec<Value>),
    /// Named parameters as an object
    Named(Map<String, Value>),
}

impl Params {
    /// Get a parameter by name (for named params only)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Params::Named(map) => map.get(key),
            Params::Positional(_) => None,
        }
    }

    /// Get a parameter by index (for positional params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            Params::Positional(items) => items.get(index),
            Params::Named(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Params::Positional(items) => items.len(),
            Params::Named(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to a `serde_json::Value` for serialization
    pub fn to_value(&self) -> Value {
        match self {
            Params::Positional(items) => Value::Array(items.clone()),
            Params::Named(map) => Value::Object(map.clone()),
        }
    }
}

impl From<Vec<Value>> for Params {
    fn from(items: Vec<Value>) -> Self {
        Params::Positional(items)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params::Named(map)
    }
}

/// A validated inbound JSON-RPC request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Method name, possibly namespace-qualified (`"sys.ping"`).
    pub method: String,
    pub params: Option<Params>,
    /// `None` when the id member was absent from the payload (notification);
    /// `Some(RequestId::Null)` when it was an explicit null.
    pub id: Option<RequestId>,
}

/// Raw state of the id member before the id rule runs. Earlier failing rules
/// attach the id to their error only when it parsed as a legal id type.
enum IdField {
    Absent,
    Valid(RequestId),
    Invalid,
}

impl IdField {
    fn of(object: &Map<String, Value>) -> Self {
        match object.get("id") {
            None => IdField::Absent,
            Some(Value::String(s)) => IdField::Valid(RequestId::String(s.clone())),
            Some(Value::Number(n)) => IdField::Valid(RequestId::Number(n.clone())),
            Some(Value::Null) => IdField::Valid(RequestId::Null),
            Some(_) => IdField::Invalid,
        }
    }

    fn attachable(&self) -> RequestId {
        match self {
            IdField::Valid(id) => id.clone(),
            _ => RequestId::Null,
        }
    }
}

impl Request {
    /// Parse and validate a decoded JSON value as a request object.
    pub fn from_value(value: &Value) -> Result<Request, ErrorResponse> {
        match value.as_object() {
            Some(object) => Self::from_object(object),
            None => Err(ErrorResponse::invalid_request(RequestId::Null)),
        }
    }

    /// Parse and validate the members of a request object.
    ///
    /// Validation order is load-bearing: the first failing field decides
    /// which error code reaches the client (jsonrpc, then method, then
    /// params, then id).
    pub fn from_object(object: &Map<String, Value>) -> Result<Request, ErrorResponse> {
        let id = IdField::of(object);

        if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(ErrorResponse::new(
                id.attachable(),
                ErrorObject::invalid_version(),
            ));
        }

        let method = match object.get("method") {
            Some(Value::String(method)) if !method.is_empty() => method.clone(),
            _ => {
                return Err(ErrorResponse::new(
                    id.attachable(),
                    ErrorObject::method_not_found(),
                ));
            }
        };

        let params = match object.get("params") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(Params::Positional(items.clone())),
            Some(Value::Object(map)) => Some(Params::Named(map.clone())),
            Some(_) => {
                return Err(ErrorResponse::new(
                    id.attachable(),
                    ErrorObject::invalid_params(),
                ));
            }
        };

        let id = match id {
            IdField::Absent => None,
            IdField::Valid(id) => Some(id),
            IdField::Invalid => {
                return Err(ErrorResponse::new(
                    RequestId::Null,
                    ErrorObject::invalid_request(Some(Value::String("Invalid id".to_string()))),
                ));
            }
        };

        Ok(Request { method, params, id })
    }

    /// A request is a notification iff the id member was never present.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// The id to echo on the response envelope; null for notifications.
    pub fn response_id(&self) -> RequestId {
        self.id.clone().unwrap_or(RequestId::Null)
    }
}
