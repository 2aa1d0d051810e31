//! Parameter schema and immutable parameter sets.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, GswError};

/// One named column of a campaign schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Full parameter name, used as the manifest header.
    pub name: String,
    /// Abbreviation used when composing job identifiers.
    pub short: String,
    /// Fixed number of decimals used whenever a value of this field is rendered.
    pub decimals: usize,
}

impl Field {
    /// Renders a value with the field's canonical precision.
    pub fn format_value(&self, value: f64) -> String {
        let rendered = format!("{:.*}", self.decimals, value);
        // "-0" and "-0.0" would otherwise leak into identifiers.
        if rendered.starts_with('-') && rendered[1..].chars().all(|c| c == '0' || c == '.') {
            rendered[1..].to_string()
        } else {
            rendered
        }
    }
}

/// Ordered field list shared by every [`ParameterSet`] of a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Validates the field list and wraps it for sharing across parameter sets.
    pub fn new(fields: Vec<Field>) -> Result<Arc<Self>, GswError> {
        if fields.is_empty() {
            return Err(GswError::config(
                "gsw_core.schema_empty",
                "a campaign needs at least one parameter",
            ));
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(GswError::config(
                    "gsw_core.field_name",
                    "parameter name must not be empty",
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(GswError::Configuration(
                    ErrorInfo::new("gsw_core.duplicate_field", "two parameters share a name")
                        .with_context("name", field.name.clone()),
                ));
            }
        }
        Ok(Arc::new(Self { fields }))
    }

    /// Returns the fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the parameter names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    /// Number of parameters in the schema.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a validated schema.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Serializable snapshot of one parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEntry {
    /// Parameter name.
    pub name: String,
    /// Raw numeric value.
    pub value: f64,
}

/// An ordered mapping from parameter name to value, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    schema: Arc<Schema>,
    values: Vec<f64>,
}

impl ParameterSet {
    /// Binds values to a schema. The value count must match and all values must be finite.
    pub fn new(schema: Arc<Schema>, values: Vec<f64>) -> Result<Self, GswError> {
        if values.len() != schema.len() {
            return Err(GswError::Configuration(
                ErrorInfo::new("gsw_core.arity", "value count does not match schema")
                    .with_context("expected", schema.len().to_string())
                    .with_context("actual", values.len().to_string()),
            ));
        }
        if let Some((field, value)) = schema
            .fields()
            .iter()
            .zip(&values)
            .find(|(_, value)| !value.is_finite())
        {
            return Err(GswError::Configuration(
                ErrorInfo::new("gsw_core.non_finite", "parameter values must be finite")
                    .with_context("name", field.name.clone())
                    .with_context("value", value.to_string()),
            ));
        }
        Ok(Self { schema, values })
    }

    /// Returns the schema shared with the rest of the campaign.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the raw values in schema order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Looks up a value by parameter name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema
            .fields()
            .iter()
            .position(|field| field.name == name)
            .map(|idx| self.values[idx])
    }

    /// Iterates over `(field, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&Field, f64)> + '_ {
        self.schema.fields().iter().zip(self.values.iter().copied())
    }

    /// Values rendered with each field's canonical precision.
    pub fn formatted_values(&self) -> Vec<String> {
        self.iter()
            .map(|(field, value)| field.format_value(value))
            .collect()
    }

    /// Snapshot suitable for reports.
    pub fn entries(&self) -> Vec<ParamEntry> {
        self.iter()
            .map(|(field, value)| ParamEntry {
                name: field.name.clone(),
                value,
            })
            .collect()
    }
}
