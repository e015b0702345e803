//! Values crossing the script boundary and serialized field overrides.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tether_core::ecs::EntityId;

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Unit,
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(String),
    Entity(EntityId),
}

/// Field types that can be injected into a script instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Int,
    Float,
    Bool,
    String,
}

impl FieldKind {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "bool" => Some(Self::Bool),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// A public field declared by a script class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

/// Decode a stored override. Numbers and bools are base64 of their
/// little-endian bytes; strings are stored as-is.
pub fn decode_override(kind: FieldKind, raw: &str) -> Option<ScriptValue> {
    if kind == FieldKind::String {
        return Some(ScriptValue::Str(raw.to_string()));
    }
    let bytes = STANDARD.decode(raw).ok()?;
    match kind {
        FieldKind::Int => {
            let bytes: [u8; 4] = bytes.as_slice().try_into().ok()?;
            Some(ScriptValue::Int(i32::from_le_bytes(bytes)))
        }
        FieldKind::Float => {
            let bytes: [u8; 4] = bytes.as_slice().try_into().ok()?;
            Some(ScriptValue::Float(f32::from_le_bytes(bytes)))
        }
        FieldKind::Bool => match bytes.as_slice() {
            [byte] => Some(ScriptValue::Bool(*byte != 0)),
            _ => None,
        },
        FieldKind::String => None,
    }
}

/// Inverse of [`decode_override`], used by tooling that writes overrides.
pub fn encode_override(value: &ScriptValue) -> Option<String> {
    match value {
        ScriptValue::Int(v) => Some(STANDARD.encode(v.to_le_bytes())),
        ScriptValue::Float(v) => Some(STANDARD.encode(v.to_le_bytes())),
        ScriptValue::Bool(v) => Some(STANDARD.encode([u8::from(*v)])),
        ScriptValue::Str(v) => Some(v.clone()),
        ScriptValue::Unit | ScriptValue::Entity(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_payloads() {
        let float = STANDARD.encode(2.5f32.to_le_bytes());
        assert_eq!(
            decode_override(FieldKind::Float, &float),
            Some(ScriptValue::Float(2.5))
        );
        let int = STANDARD.encode((-7i32).to_le_bytes());
        assert_eq!(decode_override(FieldKind::Int, &int), Some(ScriptValue::Int(-7)));
        assert_eq!(
            decode_override(FieldKind::Bool, "AQ=="),
            Some(ScriptValue::Bool(true))
        );
        assert_eq!(
            decode_override(FieldKind::String, "plain text"),
            Some(ScriptValue::Str("plain text".into()))
        );
    }

    #[test]
    fn rejects_bad_payloads() {
        assert_eq!(decode_override(FieldKind::Int, "not base64!"), None);
        // Two bytes is neither an i32 nor a bool.
        assert_eq!(decode_override(FieldKind::Int, "AAA="), None);
        assert_eq!(decode_override(FieldKind::Bool, "AAA="), None);
    }

    #[test]
    fn encode_matches_decode() {
        let encoded = encode_override(&ScriptValue::Float(0.75)).unwrap();
        assert_eq!(
            decode_override(FieldKind::Float, &encoded),
            Some(ScriptValue::Float(0.75))
        );
        assert_eq!(encode_override(&ScriptValue::Unit), None);
    }

    #[test]
    fn field_kind_tags() {
        assert_eq!(FieldKind::parse("float"), Some(FieldKind::Float));
        assert_eq!(FieldKind::parse("vector"), None);
    }
}
