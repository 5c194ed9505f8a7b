//! Typed access to an element's raw fields.
//!
//! The editor stores numbers either as JSON numbers or as strings, and leaves
//! unset fields as `""` or `null`. Both of those read as missing.

use serde_json::Value;
use sf_network::ValidationError;
use std::collections::{BTreeMap, BTreeSet};

pub(crate) type Fields = BTreeMap<String, Value>;

pub(crate) struct FieldReader<'a> {
    element: &'a str,
    fields: &'a Fields,
    fallback: Option<&'a Fields>,
    prefix: &'static str,
    used: BTreeSet<&'a str>,
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl<'a> FieldReader<'a> {
    pub fn new(element: &'a str, fields: &'a Fields) -> Self {
        Self {
            element,
            fields,
            fallback: None,
            prefix: "",
            used: BTreeSet::new(),
        }
    }

    /// Values missing here are taken from `fallback`.
    pub fn with_fallback(mut self, fallback: Option<&'a Fields>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Reader for a nested object; reported field names get `prefix`.
    pub fn nested(element: &'a str, fields: &'a Fields, prefix: &'static str) -> Self {
        Self {
            prefix,
            ..Self::new(element, fields)
        }
    }

    fn field_name(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    pub fn missing(&self, key: &str) -> ValidationError {
        ValidationError::MissingParameter {
            element: self.element.to_string(),
            field: self.field_name(key),
        }
    }

    pub fn invalid(&self, key: &str, reason: impl Into<String>) -> ValidationError {
        ValidationError::InvalidParameter {
            element: self.element.to_string(),
            field: self.field_name(key),
            reason: reason.into(),
        }
    }

    /// Raw value, or `None` when absent or blank here and in the fallback.
    pub fn raw(&mut self, key: &'a str) -> Option<&'a Value> {
        self.used.insert(key);
        let own = self.fields.get(key).filter(|v| !is_blank(v));
        own.or_else(|| {
            self.fallback
                .and_then(|f| f.get(key))
                .filter(|v| !is_blank(v))
        })
    }

    pub fn number(&mut self, key: &'a str) -> Result<Option<f64>, ValidationError> {
        let Some(v) = self.raw(key) else {
            return Ok(None);
        };
        self.parse_number(key, v).map(Some)
    }

    pub fn required(&mut self, key: &'a str) -> Result<f64, ValidationError> {
        self.number(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn or(&mut self, key: &'a str, default: f64) -> Result<f64, ValidationError> {
        Ok(self.number(key)?.unwrap_or(default))
    }

    /// Positive whole number.
    pub fn count(&mut self, key: &'a str) -> Result<u32, ValidationError> {
        let v = self.required(key)?;
        if v < 1.0 || v.fract() != 0.0 || v > f64::from(u32::MAX) {
            return Err(self.invalid(key, format!("expected a positive whole number, got {v}")));
        }
        Ok(v as u32)
    }

    pub fn text(&mut self, key: &'a str) -> Result<Option<&'a str>, ValidationError> {
        match self.raw(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim())),
            Some(other) => Err(self.invalid(key, format!("expected text, got {other}"))),
        }
    }

    /// `[[t, value], ...]` with numeric entries.
    pub fn pairs(&mut self, key: &'a str) -> Result<Vec<(f64, f64)>, ValidationError> {
        let Some(v) = self.raw(key) else {
            return Ok(Vec::new());
        };
        let Value::Array(rows) = v else {
            return Err(self.invalid(key, "expected a list of [time, value] rows"));
        };
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match row.as_array().map(Vec::as_slice) {
                Some([a, b]) => out.push((self.parse_number(key, a)?, self.parse_number(key, b)?)),
                // Blank rows left behind by the editor's sheet
                Some(cells) if cells.iter().all(is_blank) => {}
                _ => return Err(self.invalid(key, format!("bad row {row}"))),
            }
        }
        Ok(out)
    }

    /// Nested object, copied into a field map.
    pub fn object(&mut self, key: &'a str) -> Result<Option<Fields>, ValidationError> {
        match self.raw(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            Some(other) => Err(self.invalid(key, format!("expected an object, got {other}"))),
        }
    }

    fn parse_number(&self, key: &str, v: &Value) -> Result<f64, ValidationError> {
        let parsed = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(x) if x.is_finite() => Ok(x),
            _ => Err(self.invalid(key, format!("expected a number, got {v}"))),
        }
    }

    /// Fail on the first field that no reader asked for.
    pub fn finish(self) -> Result<(), ValidationError> {
        match self.fields.keys().find(|k| !self.used.contains(k.as_str())) {
            Some(unknown) => Err(ValidationError::UnknownField {
                element: self.element.to_string(),
                field: self.field_name(unknown),
            }),
            None => Ok(()),
        }
    }
}
