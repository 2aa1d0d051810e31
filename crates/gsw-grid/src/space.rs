use serde::{Deserialize, Serialize};

/// Largest precision picked automatically when an axis omits `decimals`.
pub const MAX_INFERRED_DECIMALS: usize = 6;

/// One named parameter dimension with its ordered candidate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Full parameter name, used as the manifest header.
    pub name: String,
    /// Abbreviation used in identifiers; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    /// Candidate values in traversal order.
    pub values: Vec<f64>,
    /// Fixed rendering precision; inferred from `values` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<usize>,
}

impl Axis {
    /// Axis with inferred precision and `name` as its short form.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            short: None,
            values,
            decimals: None,
        }
    }

    /// Sets the abbreviation used in identifiers.
    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = Some(short.into());
        self
    }

    /// Pins the rendering precision.
    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = Some(decimals);
        self
    }

    /// Abbreviation used in identifiers.
    pub fn short_name(&self) -> &str {
        self.short.as_deref().unwrap_or(&self.name)
    }

    /// Declared precision, or the one inferred from `values`.
    pub fn resolved_decimals(&self) -> usize {
        self.decimals
            .unwrap_or_else(|| infer_decimals(self.values.iter().copied()))
    }
}

/// One fixed value of a named scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameter {
    /// Parameter name.
    pub name: String,
    /// Fixed value of the parameter.
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Rendering precision; inferred from `value` when omitted.
    pub decimals: Option<usize>,
}

impl ScenarioParameter {
    /// Parameter with inferred precision.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            decimals: None,
        }
    }
}

/// Parameter space declaration: a Cartesian grid or a single named scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Space {
    /// Cartesian product of the axes.
    Grid {
        /// Axes in declaration order; the last one varies fastest.
        axes: Vec<Axis>,
    },
    /// One job named after the scenario.
    Scenario {
        /// Scenario name, used as the job identifier.
        name: String,
        /// Parameter values in manifest order.
        parameters: Vec<ScenarioParameter>,
    },
}

/// Number of fractional digits needed to print every value in its shortest
/// round-trip form, capped at [`MAX_INFERRED_DECIMALS`].
pub fn infer_decimals(values: impl IntoIterator<Item = f64>) -> usize {
    values
        .into_iter()
        .map(|value| {
            let text = value.to_string();
            text.split_once('.')
                .map(|(_, frac)| frac.len())
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0)
        .min(MAX_INFERRED_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_axes_infer_zero_decimals() {
        assert_eq!(infer_decimals([50.0, 100.0, 300.0]), 0);
    }

    #[test]
    fn mixed_axes_use_widest_fraction() {
        assert_eq!(infer_decimals([0.5, 1.0, 1.25]), 2);
        assert_eq!(infer_decimals([1e-9]), MAX_INFERRED_DECIMALS);
    }

    #[test]
    fn space_parses_tagged_yaml() {
        let yaml = "type: grid\naxes:\n  - name: n\n    values: [50, 100]\n  - name: b\n    values: [0.5, 1.0]\n";
        let space: Space = serde_yaml::from_str(yaml).expect("yaml");
        match space {
            Space::Grid { axes } => {
                assert_eq!(axes.len(), 2);
                assert_eq!(axes[1].resolved_decimals(), 1);
            }
            other => panic!("unexpected space {other:?}"),
        }
    }
}
