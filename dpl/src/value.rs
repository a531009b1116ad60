//! Typed node values
//!
//! A `Value` pairs a typed array payload with an optional unit expression.
//! Scalars are zero-dimensional arrays, so every value supports slicing and
//! shape checks the same way.

use crate::settings::{keyword, VALUE_PRECISION};
use dpl_core::{is_close, DplError, Magnitude, NdArray, Result, SliceSpec};
use dpl_units::Quantity;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

// ========== Data types ==========

/// Type keyword of a value node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Bool,
    Int { unsigned: bool, bits: u32 },
    Float { bits: u32 },
    Str,
}

impl DataType {
    pub const INT: DataType = DataType::Int { unsigned: false, bits: 32 };
    pub const FLOAT: DataType = DataType::Float { bits: 64 };

    /// Parse `bool`, `str`, `int`, `uint16`, `float32` and friends
    pub fn parse(word: &str) -> Option<DataType> {
        match word {
            "bool" => return Some(DataType::Bool),
            "str" => return Some(DataType::Str),
            _ => {}
        }
        let (unsigned, rest) = match word.strip_prefix('u') {
            Some(rest) => (true, rest),
            None => (false, word),
        };
        if let Some(bits) = rest.strip_prefix("int") {
            let bits = match bits {
                "" => 32,
                "16" => 16,
                "32" => 32,
                "64" => 64,
                _ => return None,
            };
            return Some(DataType::Int { unsigned, bits });
        }
        if unsigned {
            return None;
        }
        let bits = match rest.strip_prefix("float")? {
            "" => 64,
            "32" => 32,
            "64" => 64,
            "128" => 128,
            _ => return None,
        };
        Some(DataType::Float { bits })
    }

    /// Keyword without precision; values of one keyword may replace each other
    pub fn keyword(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int { .. } => "int",
            DataType::Float { .. } => "float",
            DataType::Str => "str",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int { .. } | DataType::Float { .. })
    }

    fn int_range(&self) -> Option<(i128, i128)> {
        match *self {
            DataType::Int { unsigned: true, bits } => Some((0, (1i128 << bits) - 1)),
            DataType::Int { unsigned: false, bits } => {
                Some((-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1))
            }
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int { unsigned, bits } => {
                write!(f, "{}int{}", if *unsigned { "u" } else { "" }, bits)
            }
            DataType::Float { bits } => write!(f, "float{}", bits),
            other => write!(f, "{}", other.keyword()),
        }
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ========== Raw values ==========

/// Value of a node before it is cast to the node type
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Literal text or a JSON array
    Text(String),
    /// Table column cells
    Items(Vec<String>),
    /// Result of a reference, expression or function
    Computed(Value),
}

impl RawValue {
    pub fn is_none(&self) -> bool {
        matches!(self, RawValue::Text(text) if text == keyword::NONE)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(text) => write!(f, "{}", text),
            RawValue::Items(items) => write!(f, "[{}]", items.join(", ")),
            RawValue::Computed(value) => write!(f, "{}", value.payload),
        }
    }
}

// ========== Payload ==========

/// Typed array data
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bool(NdArray<bool>),
    Int(NdArray<i128>),
    Float(NdArray<f64>),
    Str(NdArray<String>),
}

fn cast_error(text: impl fmt::Display, dtype: DataType) -> DplError {
    DplError::invalid_input("Could not convert raw value to type")
        .with_arg(text)
        .with_arg(dtype)
}

fn parse_bool(text: &str) -> Result<bool> {
    match text.trim() {
        keyword::TRUE => Ok(true),
        keyword::FALSE => Ok(false),
        other => Err(cast_error(other, DataType::Bool)),
    }
}

fn parse_int(text: &str, dtype: DataType) -> Result<i128> {
    text.trim().parse::<i128>().map_err(|_| cast_error(text, dtype))
}

fn parse_float(text: &str, dtype: DataType) -> Result<f64> {
    text.trim().parse::<f64>().map_err(|_| cast_error(text, dtype))
}

fn json_text(json: &JsonValue) -> String {
    match json {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Payload {
    // ========== Parsing ==========

    /// Parse literal text: a scalar or a (nested) JSON array
    pub fn parse(text: &str, dtype: DataType) -> Result<Payload> {
        let trimmed = text.trim();
        if trimmed.starts_with('[') {
            match serde_json::from_str::<JsonValue>(trimmed) {
                Ok(json) => return Payload::from_json(&json, dtype),
                Err(err) if dtype != DataType::Str => {
                    return Err(cast_error(trimmed, dtype).with_note(err.to_string()));
                }
                Err(_) => {}
            }
        }
        Ok(match dtype {
            DataType::Bool => Payload::Bool(NdArray::scalar(parse_bool(trimmed)?)),
            DataType::Int { .. } => Payload::Int(NdArray::scalar(parse_int(trimmed, dtype)?)),
            DataType::Float { .. } => Payload::Float(NdArray::scalar(parse_float(trimmed, dtype)?)),
            DataType::Str => Payload::Str(NdArray::scalar(text.to_string())),
        })
    }

    /// Build from a JSON value; string leaves are parsed as literals
    pub fn from_json(json: &JsonValue, dtype: DataType) -> Result<Payload> {
        Ok(match dtype {
            DataType::Bool => Payload::Bool(NdArray::from_json(json, |leaf| match leaf {
                JsonValue::Bool(b) => Ok(*b),
                other => parse_bool(&json_text(other)),
            })?),
            DataType::Int { .. } => Payload::Int(NdArray::from_json(json, move |leaf| match leaf {
                JsonValue::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
                    (Some(i), _, _) => Ok(i as i128),
                    (_, Some(u), _) => Ok(u as i128),
                    (_, _, Some(f)) if f.fract() == 0.0 => Ok(f as i128),
                    _ => Err(cast_error(n, dtype)),
                },
                other => parse_int(&json_text(other), dtype),
            })?),
            DataType::Float { .. } => Payload::Float(NdArray::from_json(json, move |leaf| match leaf {
                JsonValue::Number(n) => n.as_f64().ok_or_else(|| cast_error(n, dtype)),
                other => parse_float(&json_text(other), dtype),
            })?),
            DataType::Str => Payload::Str(NdArray::from_json(json, |leaf| Ok(json_text(leaf)))?),
        })
    }

    // ========== Accessors ==========

    pub fn keyword(&self) -> &'static str {
        match self {
            Payload::Bool(_) => "bool",
            Payload::Int(_) => "int",
            Payload::Float(_) => "float",
            Payload::Str(_) => "str",
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Payload::Bool(a) => a.shape(),
            Payload::Int(a) => a.shape(),
            Payload::Float(a) => a.shape(),
            Payload::Str(a) => a.shape(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.shape().is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Payload::Int(_) | Payload::Float(_))
    }

    /// Scalar boolean, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Payload::Bool(a) => a.as_scalar().copied(),
            _ => None,
        }
    }

    /// Numbers as floats
    pub fn to_f64(&self) -> Result<NdArray<f64>> {
        match self {
            Payload::Int(a) => Ok(a.map(|v| *v as f64)),
            Payload::Float(a) => Ok(a.clone()),
            other => Err(DplError::invalid_input("Value is not numerical").with_arg(other)),
        }
    }

    pub fn slice(&self, specs: &[SliceSpec]) -> Result<Payload> {
        Ok(match self {
            Payload::Bool(a) => Payload::Bool(a.slice(specs)?),
            Payload::Int(a) => Payload::Int(a.slice(specs)?),
            Payload::Float(a) => Payload::Float(a.slice(specs)?),
            Payload::Str(a) => Payload::Str(a.slice(specs)?),
        })
    }

    // ========== Conversion ==========

    /// Convert to another type keyword; floats are rounded into integers
    pub fn cast(self, dtype: DataType) -> Result<Payload> {
        match (self, dtype) {
            (p @ Payload::Bool(_), DataType::Bool) => Ok(p),
            (p @ Payload::Int(_), DataType::Int { .. }) => Ok(p),
            (p @ Payload::Float(_), DataType::Float { .. }) => Ok(p),
            (p @ Payload::Str(_), DataType::Str) => Ok(p),
            (Payload::Int(a), DataType::Float { .. }) => Ok(Payload::Float(a.map(|v| *v as f64))),
            (Payload::Float(a), DataType::Int { .. }) => {
                Ok(Payload::Int(a.map(|v| v.round_ties_even() as i128)))
            }
            (Payload::Str(a), dtype) => match a.as_scalar() {
                Some(text) => Payload::parse(text, dtype),
                None => Payload::from_json(&a.to_json(|s| JsonValue::String(s.clone())), dtype),
            },
            (other, dtype) => Err(cast_error(&other, dtype)),
        }
    }

    /// Fail when integers do not fit the precision of the type
    pub fn check_range(&self, dtype: DataType) -> Result<()> {
        if let (Payload::Int(a), Some((min, max))) = (self, dtype.int_range()) {
            if let Some(v) = a.data().iter().find(|v| **v < min || **v > max) {
                return Err(DplError::invalid_input("Integer value out of range")
                    .with_arg(v)
                    .with_arg(dtype));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Payload::Bool(a) => a.to_json(|v| JsonValue::Bool(*v)),
            Payload::Int(a) => a.to_json(|v| int_json(*v)),
            Payload::Float(a) => a.to_json(|v| (*v).into()),
            Payload::Str(a) => a.to_json(|v| JsonValue::String(v.clone())),
        }
    }

    /// Elements as display strings
    fn rendered(&self, quote: bool) -> NdArray<String> {
        match self {
            Payload::Bool(a) => a.map(|v| v.to_string()),
            Payload::Int(a) => a.map(|v| v.to_string()),
            Payload::Float(a) => a.map(|v| format_float(*v)),
            Payload::Str(a) if quote => a.map(|v| format!("'{}'", v)),
            Payload::Str(a) => a.clone(),
        }
    }
}

fn int_json(v: i128) -> JsonValue {
    if let Ok(v) = i64::try_from(v) {
        JsonValue::from(v)
    } else if let Ok(v) = u64::try_from(v) {
        JsonValue::from(v)
    } else {
        JsonValue::from(v as f64)
    }
}

/// Shortest float text that keeps a decimal point or exponent: `1.0`, `0.25`, `1e-07`
pub fn format_float(v: f64) -> String {
    if !v.is_finite() {
        return if v.is_nan() { "nan".into() } else if v > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let s = format!("{:e}", v);
        return match s.split_once('e') {
            Some((mantissa, exp)) => {
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exp.abs())
            }
            None => s,
        };
    }
    if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quote = !self.is_scalar();
        write!(f, "{}", self.rendered(quote))
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ========== Value ==========

/// Typed payload with an optional unit expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Value {
    pub payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Value {
    pub fn new(payload: Payload, unit: Option<String>) -> Self {
        let unit = unit.filter(|u| !u.trim().is_empty());
        Value { payload, unit }
    }

    pub fn bool(value: bool) -> Self {
        Value::new(Payload::Bool(NdArray::scalar(value)), None)
    }

    pub fn int(value: i128) -> Self {
        Value::new(Payload::Int(NdArray::scalar(value)), None)
    }

    pub fn float(value: f64, unit: Option<&str>) -> Self {
        Value::new(Payload::Float(NdArray::scalar(value)), unit.map(str::to_string))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::new(Payload::Str(NdArray::scalar(value.into())), None)
    }

    /// Numbers expressed in the given units
    pub fn from_quantity(quantity: &Quantity, unit: Option<&str>) -> Result<Self> {
        match unit {
            Some(unit) => {
                let magnitude = quantity.value_in(unit)?;
                Ok(Value::new(Payload::Float(magnitude.value), Some(unit.to_string())))
            }
            None => Ok(Value::new(
                Payload::Float(quantity.magnitude.value.clone()),
                Some(quantity.units()),
            )),
        }
    }

    pub fn unit_str(&self) -> &str {
        self.unit.as_deref().unwrap_or("")
    }

    pub fn quantity(&self) -> Result<Quantity> {
        let values = self.payload.to_f64()?;
        Quantity::parse(Magnitude::from_array(values), self.unit_str())
    }

    /// Express numbers in other units; the payload becomes a float array
    pub fn convert(&self, unit: &str) -> Result<Value> {
        if self.unit_str() == unit {
            return Ok(self.clone());
        }
        let quantity = self.quantity()?;
        let values = quantity.value_in(unit)?.value;
        Ok(Value::new(Payload::Float(values), Some(unit.to_string())))
    }

    pub fn slice(&self, specs: &[SliceSpec]) -> Result<Value> {
        Ok(Value::new(self.payload.slice(specs)?, self.unit.clone()))
    }

    /// Equality after unit conversion, numbers within `VALUE_PRECISION`
    pub fn equals(&self, other: &Value) -> Result<bool> {
        match (&self.payload, &other.payload) {
            (Payload::Bool(a), Payload::Bool(b)) => Ok(a == b),
            (Payload::Str(a), Payload::Str(b)) => Ok(a == b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let other = match (&self.unit, &other.unit) {
                    (Some(unit), Some(_)) => other.convert(unit)?,
                    _ => other.clone(),
                };
                let left = self.payload.to_f64()?;
                let right = other.payload.to_f64()?;
                if left.shape() != right.shape() && !left.is_scalar() && !right.is_scalar() {
                    return Ok(false);
                }
                let close = left.zip_with(&right, |a, b| is_close(*a, *b, VALUE_PRECISION))?;
                Ok(close.all(|c| *c))
            }
            _ => Ok(false),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{} {}", self.payload, unit),
            None => write!(f, "{}", self.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpl_core::ErrorKind;

    #[test]
    fn test_datatype_parse() {
        assert_eq!(DataType::parse("int"), Some(DataType::INT));
        assert_eq!(DataType::parse("uint16"), Some(DataType::Int { unsigned: true, bits: 16 }));
        assert_eq!(DataType::parse("float128"), Some(DataType::Float { bits: 128 }));
        assert_eq!(DataType::parse("ufloat"), None);
        assert_eq!(DataType::parse("int8"), None);
        assert_eq!(DataType::parse("uint64").unwrap().to_string(), "uint64");
        assert_eq!(DataType::FLOAT.to_string(), "float64");
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(Payload::parse("true", DataType::Bool).unwrap().as_bool(), Some(true));
        assert!(Payload::parse("yes", DataType::Bool).unwrap_err().is(ErrorKind::InvalidInput));
        assert_eq!(
            Payload::parse("42", DataType::INT).unwrap(),
            Payload::Int(NdArray::scalar(42))
        );
        assert!(Payload::parse("4.2", DataType::INT).is_err());
        assert_eq!(
            Payload::parse("1e3", DataType::FLOAT).unwrap(),
            Payload::Float(NdArray::scalar(1000.0))
        );
        assert_eq!(
            Payload::parse("[not json", DataType::Str).unwrap(),
            Payload::Str(NdArray::scalar("[not json".to_string()))
        );
    }

    #[test]
    fn test_parse_arrays() {
        let matrix = Payload::parse("[[42,34,35],[23,34,64],[35,23,23]]", DataType::INT).unwrap();
        assert_eq!(matrix.shape(), &[3, 3]);
        let words = Payload::parse("[\"a\", 2]", DataType::Str).unwrap();
        assert_eq!(words.to_string(), "['a', '2']");
        let flags = Payload::parse("[true, \"false\"]", DataType::Bool).unwrap();
        assert_eq!(flags.to_json(), serde_json::json!([true, false]));
        assert!(Payload::parse("[1, 2", DataType::FLOAT).is_err());
    }

    #[test]
    fn test_int_range() {
        let dtype = DataType::Int { unsigned: true, bits: 16 };
        assert!(Payload::parse("65535", dtype).unwrap().check_range(dtype).is_ok());
        assert!(Payload::parse("65536", dtype).unwrap().check_range(dtype).is_err());
        assert!(Payload::parse("-1", dtype).unwrap().check_range(dtype).is_err());
        let dtype = DataType::Int { unsigned: false, bits: 16 };
        assert!(Payload::parse("-32768", dtype).unwrap().check_range(dtype).is_ok());
    }

    #[test]
    fn test_cast() {
        let rounded = Payload::Float(NdArray::from_vec(vec![2.5, 3.7])).cast(DataType::INT).unwrap();
        assert_eq!(rounded, Payload::Int(NdArray::from_vec(vec![2, 4])));
        let text = Payload::Str(NdArray::scalar("12".into())).cast(DataType::FLOAT).unwrap();
        assert_eq!(text, Payload::Float(NdArray::scalar(12.0)));
        assert!(Payload::Bool(NdArray::scalar(true)).cast(DataType::INT).is_err());
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(1221.424), "1221.424");
        assert_eq!(format_float(1e-7), "1e-07");
        assert_eq!(format_float(2.5e20), "2.5e+20");
        assert_eq!(Value::float(3.0, Some("cm")).to_string(), "3.0 cm");
    }

    #[test]
    fn test_value_conversion() {
        let size = Value::float(23.0, Some("m"));
        let converted = size.convert("cm").unwrap();
        assert_eq!(converted.unit.as_deref(), Some("cm"));
        assert!(is_close(converted.payload.to_f64().unwrap().data()[0], 2300.0, 1e-9));
        assert!(size.equals(&Value::float(2300.0, Some("cm"))).unwrap());
        assert!(!size.equals(&Value::float(23.0, Some("cm"))).unwrap());
        assert!(size.convert("s").unwrap_err().is(ErrorKind::DimensionMismatch));
    }

    #[test]
    fn test_value_serialize() {
        let json = serde_json::to_value(Value::float(2.0, Some("km"))).unwrap();
        assert_eq!(json, serde_json::json!({"payload": 2.0, "unit": "km"}));
    }
}
