use std::collections::HashMap;
use std::sync::Arc;

use gsw_core::errors::{ErrorInfo, GswError};
use gsw_core::params::{Field, ParameterSet, Schema};

use crate::id::{validate_component, JobId};
use crate::space::{infer_decimals, Axis, ScenarioParameter, Space};

#[derive(Debug, Clone)]
enum Points {
    Product(Vec<Vec<f64>>),
    Scenario { name: String, values: Vec<f64> },
}

/// Enumerates the parameter space of a campaign.
///
/// Grids are traversed as nested loops: the first declared axis varies
/// slowest and the last declared axis varies fastest. A scenario yields
/// exactly one parameter set whose identifier is the scenario name.
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    schema: Arc<Schema>,
    points: Points,
    len: usize,
}

impl ParameterGrid {
    /// Builds the grid or scenario a plan declares.
    pub fn from_space(space: &Space) -> Result<Self, GswError> {
        match space {
            Space::Grid { axes } => Self::grid(axes),
            Space::Scenario { name, parameters } => Self::scenario(name, parameters),
        }
    }

    /// Builds a Cartesian grid. Fails on empty or duplicate axes.
    pub fn grid(axes: &[Axis]) -> Result<Self, GswError> {
        let mut fields = Vec::with_capacity(axes.len());
        let mut len = 1usize;
        for axis in axes {
            if axis.values.is_empty() {
                return Err(GswError::Configuration(
                    ErrorInfo::new("gsw_grid.empty_axis", "axis has no values")
                        .with_context("axis", axis.name.clone()),
                ));
            }
            validate_component(axis.short_name(), "axis short name")?;
            len = len.checked_mul(axis.values.len()).ok_or_else(|| {
                GswError::config("gsw_grid.too_large", "grid cardinality overflows usize")
            })?;
            fields.push(Field {
                name: axis.name.clone(),
                short: axis.short_name().to_string(),
                decimals: axis.resolved_decimals(),
            });
        }
        let schema = Schema::new(fields)?;
        if let Some(axis) = axes
            .iter()
            .find(|axis| axis.values.iter().any(|v| !v.is_finite()))
        {
            return Err(GswError::Configuration(
                ErrorInfo::new("gsw_grid.non_finite", "axis values must be finite")
                    .with_context("axis", axis.name.clone()),
            ));
        }
        Ok(Self {
            schema,
            points: Points::Product(axes.iter().map(|axis| axis.values.clone()).collect()),
            len,
        })
    }

    /// Builds a single named scenario.
    pub fn scenario(name: &str, parameters: &[ScenarioParameter]) -> Result<Self, GswError> {
        validate_component(name, "scenario name")?;
        let fields = parameters
            .iter()
            .map(|param| Field {
                name: param.name.clone(),
                short: param.name.clone(),
                decimals: param
                    .decimals
                    .unwrap_or_else(|| infer_decimals([param.value])),
            })
            .collect();
        let schema = Schema::new(fields)?;
        let values: Vec<f64> = parameters.iter().map(|param| param.value).collect();
        // Validates arity and finiteness up front.
        ParameterSet::new(schema.clone(), values.clone())?;
        Ok(Self {
            schema,
            points: Points::Scenario {
                name: name.to_string(),
                values,
            },
            len: 1,
        })
    }

    /// Field list shared by every parameter set of the grid.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of parameter sets the grid yields.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Never true for a validated grid.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lazily enumerates the parameter sets in traversal order.
    pub fn iter(&self) -> GridIter<'_> {
        GridIter {
            grid: self,
            cursor: vec![0; self.schema.len()],
            remaining: self.len,
        }
    }

    /// Formats the identifier of a parameter set drawn from this grid.
    pub fn identifier(&self, set: &ParameterSet) -> Result<JobId, GswError> {
        match &self.points {
            Points::Scenario { name, .. } => JobId::new(name.clone()),
            Points::Product(_) => {
                let parts: Vec<String> = set
                    .iter()
                    .map(|(field, value)| format!("{}{}", field.short, field.format_value(value)))
                    .collect();
                JobId::new(parts.join("_"))
            }
        }
    }

    /// Enumerates `(identifier, parameter set)` pairs without validating injectivity.
    pub fn jobs(&self) -> impl Iterator<Item = Result<(JobId, ParameterSet), GswError>> + '_ {
        self.iter()
            .map(move |set| self.identifier(&set).map(|id| (id, set)))
    }

    /// Formats every identifier and fails if two parameter sets collide.
    ///
    /// Must be called before any job is dispatched; the returned identifiers
    /// are in traversal order.
    pub fn validate_identifiers(&self) -> Result<Vec<JobId>, GswError> {
        let mut seen: HashMap<JobId, usize> = HashMap::with_capacity(self.len);
        let mut ids = Vec::with_capacity(self.len);
        for (index, job) in self.jobs().enumerate() {
            let (id, _) = job?;
            if let Some(first) = seen.insert(id.clone(), index) {
                return Err(GswError::Configuration(
                    ErrorInfo::new(
                        "gsw_grid.collision",
                        "distinct grid points format to the same identifier",
                    )
                    .with_context("id", id.to_string())
                    .with_context("first_index", first.to_string())
                    .with_context("second_index", index.to_string())
                    .with_hint("raise `decimals` on the colliding axis or use distinct short names"),
                ));
            }
            ids.push(id);
        }
        Ok(ids)
    }

    /// Declared values per parameter, rendered canonically, for progress logs.
    pub fn axis_summary(&self) -> Vec<(String, Vec<String>)> {
        let fields = self.schema.fields();
        match &self.points {
            Points::Product(axes) => fields
                .iter()
                .zip(axes)
                .map(|(field, values)| {
                    let rendered = values.iter().map(|v| field.format_value(*v)).collect();
                    (field.name.clone(), rendered)
                })
                .collect(),
            Points::Scenario { values, .. } => fields
                .iter()
                .zip(values)
                .map(|(field, value)| (field.name.clone(), vec![field.format_value(*value)]))
                .collect(),
        }
    }

    fn point_at(&self, cursor: &[usize]) -> Vec<f64> {
        match &self.points {
            Points::Product(axes) => axes
                .iter()
                .zip(cursor)
                .map(|(values, &idx)| values[idx])
                .collect(),
            Points::Scenario { values, .. } => values.clone(),
        }
    }
}

impl<'a> IntoIterator for &'a ParameterGrid {
    type Item = ParameterSet;
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Odometer-style iterator over a [`ParameterGrid`].
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    grid: &'a ParameterGrid,
    cursor: Vec<usize>,
    remaining: usize,
}

impl Iterator for GridIter<'_> {
    type Item = ParameterSet;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let values = self.grid.point_at(&self.cursor);
        self.remaining -= 1;
        if let Points::Product(axes) = &self.grid.points {
            for (slot, values) in self.cursor.iter_mut().zip(axes).rev() {
                *slot += 1;
                if *slot < values.len() {
                    break;
                }
                *slot = 0;
            }
        }
        // Values were validated when the grid was built.
        ParameterSet::new(self.grid.schema.clone(), values).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for GridIter<'_> {}
