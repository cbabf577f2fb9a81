//! Simulation data types and raw value decoding
//!
//! The simulator hands back each variable as a little-endian byte buffer.
//! How to interpret it is decided by the [`DataType`] recorded when the
//! variable was registered.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

/// Wire type of a simulation variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int32,
    Int64,
    Float32,
    Float64,
    String8,
    String32,
    String64,
    String128,
    String256,
    String260,
    /// Variable-length, NUL-terminated string
    StringV,
}

impl DataType {
    /// Parse a type name as sent by clients (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        let ty = match name.trim().to_ascii_lowercase().as_str() {
            "int32" => DataType::Int32,
            "int64" => DataType::Int64,
            "float32" => DataType::Float32,
            "float64" => DataType::Float64,
            "string8" => DataType::String8,
            "string32" => DataType::String32,
            "string64" => DataType::String64,
            "string128" => DataType::String128,
            "string256" => DataType::String256,
            "string260" => DataType::String260,
            "stringv" => DataType::StringV,
            _ => return None,
        };
        Some(ty)
    }

    /// Parse a type name, falling back to `Float64` for unknown names
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or(DataType::Float64)
    }

    /// Canonical lower-case name
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::String8 => "string8",
            DataType::String32 => "string32",
            DataType::String64 => "string64",
            DataType::String128 => "string128",
            DataType::String256 => "string256",
            DataType::String260 => "string260",
            DataType::StringV => "stringv",
        }
    }

    /// Size of the raw value in bytes (`None` for variable-length strings)
    pub fn width(&self) -> Option<usize> {
        match self {
            DataType::Int32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::Float64 | DataType::String8 => Some(8),
            DataType::String32 => Some(32),
            DataType::String64 => Some(64),
            DataType::String128 => Some(128),
            DataType::String256 => Some(256),
            DataType::String260 => Some(260),
            DataType::StringV => None,
        }
    }

    /// Whether values of this type decode to text
    pub fn is_string(&self) -> bool {
        !matches!(
            self,
            DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64
        )
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded variable value, serialized as a bare JSON scalar
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SimValue {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
}

impl SimValue {
    /// Decode a raw buffer according to `data_type`
    ///
    /// Returns `None` when the buffer is too short for a numeric type.
    pub fn decode(data_type: DataType, raw: &[u8]) -> Option<Self> {
        let value = match data_type {
            DataType::Int32 => SimValue::Int32(i32::from_le_bytes(raw.get(..4)?.try_into().ok()?)),
            DataType::Int64 => SimValue::Int64(i64::from_le_bytes(raw.get(..8)?.try_into().ok()?)),
            DataType::Float32 => {
                SimValue::Float32(f32::from_le_bytes(raw.get(..4)?.try_into().ok()?))
            }
            DataType::Float64 => {
                SimValue::Float64(f64::from_le_bytes(raw.get(..8)?.try_into().ok()?))
            }
            _ => {
                let limit = data_type.width().unwrap_or(raw.len()).min(raw.len());
                let field = &raw[..limit];
                let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
                SimValue::Text(String::from_utf8_lossy(&field[..end]).into_owned())
            }
        };
        Some(value)
    }

    /// Encode into the raw little-endian layout the simulator uses
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        match self {
            SimValue::Int32(v) => buf.put_i32_le(*v),
            SimValue::Int64(v) => buf.put_i64_le(*v),
            SimValue::Float32(v) => buf.put_f32_le(*v),
            SimValue::Float64(v) => buf.put_f64_le(*v),
            SimValue::Text(s) => {
                buf.put_slice(s.as_bytes());
                buf.put_u8(0);
            }
        }
        buf.freeze()
    }

    /// Convert a written `f64` into the layout of `data_type`
    pub fn from_f64(data_type: DataType, value: f64) -> Self {
        match data_type {
            DataType::Int32 => SimValue::Int32(value as i32),
            DataType::Int64 => SimValue::Int64(value as i64),
            DataType::Float32 => SimValue::Float32(value as f32),
            DataType::Float64 => SimValue::Float64(value),
            _ => SimValue::Text(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(DataType::parse("float64"), Some(DataType::Float64));
        assert_eq!(DataType::parse("INT32"), Some(DataType::Int32));
        assert_eq!(DataType::parse(" StringV "), Some(DataType::StringV));
        assert_eq!(DataType::parse("double"), None);
    }

    #[test]
    fn test_unknown_name_falls_back_to_float64() {
        assert_eq!(DataType::from_name(""), DataType::Float64);
        assert_eq!(DataType::from_name("bogus"), DataType::Float64);
    }

    #[test]
    fn test_decode_numeric() {
        assert_eq!(
            SimValue::decode(DataType::Int32, &(-42i32).to_le_bytes()),
            Some(SimValue::Int32(-42))
        );
        assert_eq!(
            SimValue::decode(DataType::Int64, &(1i64 << 40).to_le_bytes()),
            Some(SimValue::Int64(1 << 40))
        );
        assert_eq!(
            SimValue::decode(DataType::Float64, &47.3f64.to_le_bytes()),
            Some(SimValue::Float64(47.3))
        );
        assert_eq!(
            SimValue::decode(DataType::Float32, &1.5f32.to_le_bytes()),
            Some(SimValue::Float32(1.5))
        );
    }

    #[test]
    fn test_decode_short_buffer() {
        assert_eq!(SimValue::decode(DataType::Float64, &[0, 1, 2]), None);
        assert_eq!(SimValue::decode(DataType::Int32, &[]), None);
    }

    #[test]
    fn test_decode_fixed_string_stops_at_nul() {
        let mut raw = vec![0u8; 32];
        raw[..6].copy_from_slice(b"Cessna");
        assert_eq!(
            SimValue::decode(DataType::String32, &raw),
            Some(SimValue::Text("Cessna".into()))
        );
    }

    #[test]
    fn test_decode_fixed_string_respects_width() {
        let raw = b"ABCDEFGHIJKL";
        assert_eq!(
            SimValue::decode(DataType::String8, raw),
            Some(SimValue::Text("ABCDEFGH".into()))
        );
    }

    #[test]
    fn test_decode_variable_string() {
        let raw = SimValue::Text("KSEA".into()).to_bytes();
        assert_eq!(
            SimValue::decode(DataType::StringV, &raw),
            Some(SimValue::Text("KSEA".into()))
        );
    }

    #[test]
    fn test_serializes_as_bare_scalar() {
        let json = serde_json::to_string(&SimValue::Float64(8.5)).unwrap();
        assert_eq!(json, "8.5");
        let json = serde_json::to_string(&SimValue::Text("N172SP".into())).unwrap();
        assert_eq!(json, "\"N172SP\"");
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(SimValue::from_f64(DataType::Int32, 3.9), SimValue::Int32(3));
        assert_eq!(SimValue::from_f64(DataType::Float64, 3.9), SimValue::Float64(3.9));
    }
}
