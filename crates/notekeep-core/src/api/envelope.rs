use serde_json::Value;

/// Key some responses use to nest the real payload
pub const DATA_KEY: &str = "data";

/// A response body, either nested under `data` or returned as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Wrapped(T),
    Raw(T),
}

impl Envelope<Value> {
    /// Classify a parsed body by the presence of a `data` key.
    pub fn from_value(body: Value) -> Self {
        match body {
            Value::Object(mut map) => match map.remove(DATA_KEY) {
                Some(data) => Envelope::Wrapped(data),
                None => Envelope::Raw(Value::Object(map)),
            },
            other => Envelope::Raw(other),
        }
    }
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped(inner) | Envelope::Raw(inner) => inner,
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, Envelope::Wrapped(_))
    }
}
