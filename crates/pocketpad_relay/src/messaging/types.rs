//! Payload types for the relay wire protocol.
//!
//! Input payloads are an open record: the relay forwards the exact object it
//! received and only builds a typed view ([`InputKind`]) on the side for
//! registration and logging.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::connection::ConnectionId;

/// Application-level player label supplied by a client.
///
/// The phone UI sends integers (`?player=2`), other clients may send strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerIdentity {
    Number(i64),
    Text(String),
}

impl PlayerIdentity {
    /// Reads an identity from a JSON value.
    ///
    /// `null`, empty strings and non-scalar values carry no identity.
    /// Non-integer numbers are kept in their textual form.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Number(i)),
                None => Some(Self::Text(n.to_string())),
            },
            Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PlayerIdentity {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for PlayerIdentity {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for PlayerIdentity {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Typed view of an input event's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    /// Discrete button. `value` is 1/0 for buttons, a fraction for triggers.
    Button { name: String, value: f64 },
    /// Continuous stick axis in [-1, 1] (not enforced).
    Axis { name: String, value: f64 },
    /// Any other `type`, or a button/axis missing its name or value.
    Other(Option<String>),
}

impl InputKind {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Button { name, .. } | Self::Axis { name, .. } => Some(name),
            Self::Other(_) => None,
        }
    }
}

/// Reason a payload could not be treated as an input event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("input payload must be a JSON object, got {0}")]
pub struct MalformedInput(pub &'static str);

/// One controller input event.
///
/// Wraps the original JSON object; serialization writes it back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    fields: Map<String, Value>,
}

impl InputEvent {
    pub fn from_value(value: Value) -> Result<Self, MalformedInput> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(MalformedInput(json_type_name(&other))),
        }
    }

    pub fn button(player: impl Into<PlayerIdentity>, name: &str, value: f64) -> Self {
        Self::build(player.into(), "BUTTON", "button", name, value)
    }

    pub fn axis(player: impl Into<PlayerIdentity>, name: &str, value: f64) -> Self {
        Self::build(player.into(), "AXIS", "axis", name, value)
    }

    fn build(player: PlayerIdentity, kind: &str, name_key: &str, name: &str, value: f64) -> Self {
        let mut fields = Map::new();
        fields.insert("player".into(), serde_json::to_value(player).unwrap_or(Value::Null));
        fields.insert("type".into(), Value::from(kind));
        fields.insert(name_key.into(), Value::from(name));
        fields.insert("value".into(), Value::from(value));
        Self { fields }
    }

    /// Player identity carried by the event, if any.
    pub fn player(&self) -> Option<PlayerIdentity> {
        self.fields.get("player").and_then(PlayerIdentity::from_value)
    }

    pub fn kind(&self) -> InputKind {
        let kind = self.fields.get("type").and_then(Value::as_str);
        let value = self.fields.get("value").and_then(value_as_f64);
        let name = |key: &str| {
            self.fields
                .get(key)
                .or_else(|| self.fields.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        match (kind, value) {
            (Some("BUTTON"), Some(value)) => match name("button") {
                Some(name) => InputKind::Button { name, value },
                None => InputKind::Other(kind.map(str::to_string)),
            },
            (Some("AXIS"), Some(value)) => match name("axis") {
                Some(name) => InputKind::Axis { name, value },
                None => InputKind::Other(kind.map(str::to_string)),
            },
            _ => InputKind::Other(kind.map(str::to_string)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Serialize for InputEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InputEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::deserialize(deserializer)?;
        Ok(Self { fields })
    }
}

/// Liveness probe payload, `{t}` in server epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub t: u64,
}

impl Probe {
    /// Reads an echoed probe. Browsers may echo `t` as a float.
    pub fn from_value(value: &Value) -> Option<Self> {
        let t = value.get("t")?;
        let t = t
            .as_u64()
            .or_else(|| t.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))?;
        Some(Self { t })
    }
}

/// One round-trip measurement for a registered player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatencySample {
    pub connection: ConnectionId,
    pub player: PlayerIdentity,
    pub latency_ms: u64,
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => other.as_f64(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_player_identity_from_value() {
        assert_eq!(PlayerIdentity::from_value(&json!(2)), Some(PlayerIdentity::Number(2)));
        assert_eq!(PlayerIdentity::from_value(&json!("p1")), Some(PlayerIdentity::from("p1")));
        assert_eq!(PlayerIdentity::from_value(&json!(1.5)), Some(PlayerIdentity::from("1.5")));
        assert_eq!(PlayerIdentity::from_value(&json!(0)), Some(PlayerIdentity::Number(0)));
        assert_eq!(PlayerIdentity::from_value(&json!("")), None);
        assert_eq!(PlayerIdentity::from_value(&Value::Null), None);
        assert_eq!(PlayerIdentity::from_value(&json!({"id": 1})), None);
    }

    #[test]
    fn test_axis_event_view() {
        let event = InputEvent::from_value(json!({
            "player": 1, "type": "AXIS", "axis": "LX", "value": 0.5
        }))
        .unwrap();
        assert_eq!(event.player(), Some(PlayerIdentity::Number(1)));
        assert_eq!(
            event.kind(),
            InputKind::Axis { name: "LX".into(), value: 0.5 }
        );
    }

    #[test]
    fn test_button_event_view_and_trigger() {
        let press = InputEvent::from_value(json!({
            "player": 3, "type": "BUTTON", "button": "A", "value": 1
        }))
        .unwrap();
        assert_eq!(press.kind(), InputKind::Button { name: "A".into(), value: 1.0 });

        let trigger = InputEvent::from_value(json!({
            "player": 3, "type": "BUTTON", "button": "XUSB_GAMEPAD_LEFT_TRIGGER", "value": 0.25
        }))
        .unwrap();
        assert_eq!(trigger.kind().name(), Some("XUSB_GAMEPAD_LEFT_TRIGGER"));
    }

    #[test]
    fn test_generic_name_field_accepted() {
        let event = InputEvent::from_value(json!({"type": "AXIS", "name": "RY", "value": -1}))
            .unwrap();
        assert_eq!(event.kind(), InputKind::Axis { name: "RY".into(), value: -1.0 });
        assert_eq!(event.player(), None);
    }

    #[test]
    fn test_unknown_shapes_are_other() {
        let legacy = InputEvent::from_value(json!({"type": "BUTTON_PRESS", "button": "A"})).unwrap();
        assert_eq!(legacy.kind(), InputKind::Other(Some("BUTTON_PRESS".into())));

        let nameless = InputEvent::from_value(json!({"type": "AXIS", "value": 0.1})).unwrap();
        assert_eq!(nameless.kind(), InputKind::Other(Some("AXIS".into())));

        let untyped = InputEvent::from_value(json!({"player": 1})).unwrap();
        assert_eq!(untyped.kind(), InputKind::Other(None));
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert_eq!(InputEvent::from_value(json!("A")), Err(MalformedInput("string")));
        assert_eq!(InputEvent::from_value(json!([1, 2])), Err(MalformedInput("array")));
        assert_eq!(InputEvent::from_value(Value::Null), Err(MalformedInput("null")));
    }

    #[test]
    fn test_serialization_preserves_unknown_fields() {
        let original = json!({
            "player": "pad-7", "type": "GYRO", "x": 0.1, "y": -0.2, "seq": 42
        });
        let event = InputEvent::from_value(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&event).unwrap(), original);
    }

    #[test]
    fn test_constructors_match_phone_ui_shape() {
        let event = InputEvent::axis(1, "LX", 0.5);
        assert_eq!(
            event.into_value(),
            json!({"player": 1, "type": "AXIS", "axis": "LX", "value": 0.5})
        );
        let event = InputEvent::button("p2", "START", 0.0);
        assert_eq!(event.get("button"), Some(&json!("START")));
    }

    #[test]
    fn test_probe_from_value() {
        assert_eq!(Probe::from_value(&json!({"t": 1000})), Some(Probe { t: 1000 }));
        assert_eq!(Probe::from_value(&json!({"t": 1000.0})), Some(Probe { t: 1000 }));
        assert_eq!(Probe::from_value(&json!({"t": "soon"})), None);
        assert_eq!(Probe::from_value(&json!({})), None);
        assert_eq!(Probe::from_value(&json!(5)), None);
    }
}
