/// Wire messages between a remote provider and the namespace it browses
use crate::provider::Metadata;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Messages sent from the browsing side to the owning context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// List variable names in namespace order
    ListNames,

    /// Fetch one value
    GetValue { name: String },

    /// Assign (or create) a variable
    SetValue { name: String, value: Value },

    /// Delete several variables at once
    RemoveValues { names: Vec<String> },

    /// Deep-copy a variable under a new name
    CopyValue { source: String, target: String },

    /// Run a command for its side effects
    Execute { command: String },

    /// Size/type/traits for a page of variables
    Describe { names: Vec<String> },
}

/// One entry of a `Described` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescribedEntry {
    pub name: String,
    pub metadata: Metadata,
}

/// Messages sent back by the owning context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Names { names: Vec<String> },

    Value { value: Value },

    /// Entries for the requested names that still exist, in request order
    Described { entries: Vec<DescribedEntry> },

    /// Mutation or command accepted
    Done,

    /// The named variable does not exist
    NotFound { name: String },

    /// Error occurred
    Error { message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_are_tagged_by_type() {
        let text = serde_json::to_string(&Request::GetValue { name: "x".to_string() }).unwrap();
        assert_eq!(text, r#"{"type":"GetValue","name":"x"}"#);
        let unit = serde_json::to_string(&Request::ListNames).unwrap();
        assert_eq!(unit, r#"{"type":"ListNames"}"#);
    }

    #[test]
    fn test_response_carries_values() {
        let response = Response::Value {
            value: Value::list(vec![Value::Int(1), Value::str("a")]),
        };
        let text = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&text).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn test_not_found_names_the_variable() {
        let text = serde_json::to_string(&Response::NotFound { name: "data".to_string() }).unwrap();
        assert_eq!(text, r#"{"type":"NotFound","name":"data"}"#);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let parsed: Result<Request, _> = serde_json::from_str(r#"{"type":"Shutdown"}"#);
        assert!(parsed.is_err());
    }
}
