use crate::indicators::IndicatorError;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A parsed indicator parameter. Configuration files carry parameters as JSON
/// strings or numbers; numeric strings are coerced to numbers once at load so
/// the functions never re-parse.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    Flag(bool),
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorParams {
    values: HashMap<String, ParamValue>,
}

impl IndicatorParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(parameters: &Map<String, Value>) -> Self {
        let mut params = Self::new();
        for (key, value) in parameters {
            let parsed = match value {
                Value::Number(n) => ParamValue::Number(n.as_f64().unwrap_or(f64::NAN)),
                Value::String(s) => match s.trim().parse::<f64>() {
                    Ok(n) => ParamValue::Number(n),
                    Err(_) => ParamValue::Text(s.clone()),
                },
                Value::Bool(b) => ParamValue::Flag(*b),
                other => ParamValue::Text(other.to_string()),
            };
            params.values.insert(key.clone(), parsed);
        }
        params
    }

    pub fn set(&mut self, key: &str, value: ParamValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn integer(&self, key: &str) -> Result<usize, IndicatorError> {
        match self.values.get(key) {
            Some(ParamValue::Number(n)) if n.is_finite() && *n >= 1.0 => Ok(*n as usize),
            Some(_) => Err(IndicatorError::InvalidParameter {
                name: key.to_string(),
                reason: "expected a positive integer".to_string(),
            }),
            None => Err(IndicatorError::MissingParameter(key.to_string())),
        }
    }

    pub fn integer_or(&self, key: &str, default: usize) -> Result<usize, IndicatorError> {
        if self.values.contains_key(key) {
            self.integer(key)
        } else {
            Ok(default)
        }
    }

    pub fn float(&self, key: &str) -> Result<f64, IndicatorError> {
        match self.values.get(key) {
            Some(ParamValue::Number(n)) if n.is_finite() => Ok(*n),
            Some(_) => Err(IndicatorError::InvalidParameter {
                name: key.to_string(),
                reason: "expected a number".to_string(),
            }),
            None => Err(IndicatorError::MissingParameter(key.to_string())),
        }
    }

    pub fn float_or(&self, key: &str, default: f64) -> Result<f64, IndicatorError> {
        if self.values.contains_key(key) {
            self.float(key)
        } else {
            Ok(default)
        }
    }

    pub fn text(&self, key: &str) -> Result<String, IndicatorError> {
        match self.values.get(key) {
            Some(ParamValue::Text(s)) => Ok(s.clone()),
            Some(_) => Err(IndicatorError::InvalidParameter {
                name: key.to_string(),
                reason: "expected a column name".to_string(),
            }),
            None => Err(IndicatorError::MissingParameter(key.to_string())),
        }
    }

    pub fn text_or(&self, key: &str, default: &str) -> Result<String, IndicatorError> {
        if self.values.contains_key(key) {
            self.text(key)
        } else {
            Ok(default.to_string())
        }
    }
}
