//! Field descriptors and per-type value casting.

use crate::TableError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::sync::OnceLock;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const URI_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9+.\-]*:\S+$";

const TRUE_VALUES: [&str; 4] = ["true", "True", "TRUE", "1"];
const FALSE_VALUES: [&str; 4] = ["false", "False", "FALSE", "0"];

const ANY_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];
const ANY_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Date,
    Datetime,
    Year,
    Object,
    Array,
    Any,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Year => "year",
            Self::Object => "object",
            Self::Array => "array",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default)]
    pub constraints: Constraints,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            format: None,
            constraints: Constraints::default(),
        }
    }

    /// The declared format, with `None` and `"default"` folded together.
    fn custom_format(&self) -> Option<&str> {
        self.format.as_deref().filter(|f| *f != "default")
    }

    /// Cast one cell. Strings are parsed according to the field type; other
    /// JSON values are accepted when they already have the right shape.
    /// Cells equal to one of `missing_values` (and `null`) become `null`,
    /// unless the field is required.
    pub fn cast(&self, value: &Value, missing_values: &[String]) -> Result<Value, TableError> {
        let missing = match value {
            Value::Null => true,
            Value::String(s) => missing_values.iter().any(|m| m == s),
            _ => false,
        };
        if missing {
            if self.constraints.required {
                return Err(TableError::MissingRequired {
                    field: self.name.clone(),
                });
            }
            return Ok(Value::Null);
        }

        match value {
            Value::String(s) => self.cast_str(s),
            other => self.cast_native(other),
        }
    }

    fn invalid(&self, value: impl fmt::Display, reason: impl Into<String>) -> TableError {
        TableError::InvalidValue {
            field: self.name.clone(),
            field_type: self.field_type,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn cast_str(&self, raw: &str) -> Result<Value, TableError> {
        match self.field_type {
            FieldType::String => self.cast_string(raw),
            FieldType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| self.invalid(raw, e.to_string())),
            FieldType::Number => self.cast_number(raw),
            FieldType::Boolean => {
                let v = raw.trim();
                if TRUE_VALUES.contains(&v) {
                    Ok(Value::Bool(true))
                } else if FALSE_VALUES.contains(&v) {
                    Ok(Value::Bool(false))
                } else {
                    Err(self.invalid(raw, "not a recognized boolean"))
                }
            }
            FieldType::Date => self.cast_date(raw),
            FieldType::Datetime => self.cast_datetime(raw),
            FieldType::Year => match raw.trim().parse::<i64>() {
                Ok(year) if (0..=9999).contains(&year) => Ok(Value::from(year)),
                Ok(_) => Err(self.invalid(raw, "year out of range")),
                Err(e) => Err(self.invalid(raw, e.to_string())),
            },
            FieldType::Object => match serde_json::from_str::<Value>(raw) {
                Ok(v @ Value::Object(_)) => Ok(v),
                Ok(_) => Err(self.invalid(raw, "not a JSON object")),
                Err(e) => Err(self.invalid(raw, e.to_string())),
            },
            FieldType::Array => match serde_json::from_str::<Value>(raw) {
                Ok(v @ Value::Array(_)) => Ok(v),
                Ok(_) => Err(self.invalid(raw, "not a JSON array")),
                Err(e) => Err(self.invalid(raw, e.to_string())),
            },
            FieldType::Any => Ok(Value::String(raw.to_owned())),
        }
    }

    fn cast_native(&self, value: &Value) -> Result<Value, TableError> {
        let ok = match (self.field_type, value) {
            (FieldType::Any, _)
            | (FieldType::Number, Value::Number(_))
            | (FieldType::Boolean, Value::Bool(_))
            | (FieldType::Object, Value::Object(_))
            | (FieldType::Array, Value::Array(_)) => true,
            (FieldType::Integer | FieldType::Year, Value::Number(n)) => n.is_i64(),
            _ => false,
        };
        if ok {
            Ok(value.clone())
        } else {
            Err(self.invalid(value, format!("expected a {} value", self.field_type)))
        }
    }

    fn cast_string(&self, raw: &str) -> Result<Value, TableError> {
        let check = match self.custom_format() {
            Some("email") => Some((email_regex(), "not a valid email address")),
            Some("uri") => Some((uri_regex(), "not a valid URI")),
            _ => None,
        };
        if let Some((re, reason)) = check {
            let re = re.map_err(|e| TableError::InvalidSchema(e.to_string()))?;
            if !re.is_match(raw) {
                return Err(self.invalid(raw, reason));
            }
        }
        Ok(Value::String(raw.to_owned()))
    }

    fn cast_number(&self, raw: &str) -> Result<Value, TableError> {
        let v = raw.trim();
        if let Ok(i) = v.parse::<i64>() {
            return Ok(Value::from(i));
        }
        let f = v
            .parse::<f64>()
            .map_err(|e| self.invalid(raw, e.to_string()))?;
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| self.invalid(raw, "not a finite number"))
    }

    fn cast_date(&self, raw: &str) -> Result<Value, TableError> {
        let v = raw.trim();
        let parsed = match self.custom_format() {
            None => NaiveDate::parse_from_str(v, "%Y-%m-%d").ok(),
            Some("any") => ANY_DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(v, f).ok()),
            Some(pattern) => {
                NaiveDate::parse_from_str(v, pattern.trim_start_matches("fmt:")).ok()
            }
        };
        parsed
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| self.invalid(raw, "not a valid date"))
    }

    fn cast_datetime(&self, raw: &str) -> Result<Value, TableError> {
        let v = raw.trim();
        let rfc3339 = || {
            DateTime::parse_from_rfc3339(v)
                .ok()
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        };
        let naive = |pattern: &str| {
            NaiveDateTime::parse_from_str(v, pattern)
                .ok()
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        };
        let parsed = match self.custom_format() {
            None => rfc3339(),
            Some("any") => rfc3339().or_else(|| ANY_DATETIME_FORMATS.iter().find_map(|f| naive(*f))),
            Some(pattern) => naive(pattern.trim_start_matches("fmt:")),
        };
        parsed
            .map(Value::String)
            .ok_or_else(|| self.invalid(raw, "not a valid datetime"))
    }
}

fn email_regex() -> Result<&'static Regex, &'static regex::Error> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN)).as_ref()
}

fn uri_regex() -> Result<&'static Regex, &'static regex::Error> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(URI_PATTERN)).as_ref()
}
