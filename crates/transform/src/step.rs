use crate::{PipelineError, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const DEFAULT_MAX_VALUE: f32 = 255.0;

/// One configured transform with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Divide every value by `max_value`.
    Standardize { max_value: f32 },
    /// Resize to exactly the output shape, each axis scaled independently.
    DetRescale,
    /// Uniform resize so the long side fits the output shape minus a margin.
    DetLongMaxRescale,
    /// Pad bottom and right up to the output shape.
    BotRightPad { pad_value: f32 },
    /// Pad evenly on all sides up to the output shape.
    CenterPad { pad_value: f32 },
    /// Per-channel `(v - mean) / std`.
    Normalize { mean: Vec<f32>, std: Vec<f32> },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StandardizeParams {
    #[serde(default = "default_max_value")]
    max_value: f32,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PadParams {
    pad_value: f32,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NormalizeParams {
    mean: Vec<f32>,
    std: Vec<f32>,
}

fn default_max_value() -> f32 {
    DEFAULT_MAX_VALUE
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Standardize { .. } => "Standardize",
            Step::DetRescale => "DetRescale",
            Step::DetLongMaxRescale => "DetLongMaxRescale",
            Step::BotRightPad { .. } => "BotRightPad",
            Step::CenterPad { .. } => "CenterPad",
            Step::Normalize { .. } => "Normalize",
        }
    }

    /// Whether the step moves pixels and therefore records positional metadata.
    pub fn is_geometric(&self) -> bool {
        !matches!(self, Step::Standardize { .. } | Step::Normalize { .. })
    }

    /// Build a step from its configured name and optional parameter object.
    pub fn from_config(name: &str, params: Option<&Value>) -> Result<Self> {
        let step = match name {
            "Standardize" => {
                let p: StandardizeParams = parse_params(name, params)?;
                Step::Standardize {
                    max_value: p.max_value,
                }
            }
            "DetRescale" => {
                expect_no_params(name, params)?;
                Step::DetRescale
            }
            "DetLongMaxRescale" => {
                expect_no_params(name, params)?;
                Step::DetLongMaxRescale
            }
            "BotRightPad" => {
                let p: PadParams = parse_params(name, params)?;
                Step::BotRightPad {
                    pad_value: p.pad_value,
                }
            }
            "CenterPad" => {
                let p: PadParams = parse_params(name, params)?;
                Step::CenterPad {
                    pad_value: p.pad_value,
                }
            }
            "Normalize" => {
                let p: NormalizeParams = parse_params(name, params)?;
                Step::Normalize {
                    mean: p.mean,
                    std: p.std,
                }
            }
            other => {
                return Err(PipelineError::configuration(format!(
                    "unknown step '{}'",
                    other
                )));
            }
        };

        step.validate()?;
        Ok(step)
    }

    fn validate(&self) -> Result<()> {
        match self {
            Step::Standardize { max_value } if *max_value == 0.0 || !max_value.is_finite() => Err(
                PipelineError::configuration(format!(
                    "Standardize max_value must be finite and non-zero, got {}",
                    max_value
                )),
            ),
            Step::Normalize { mean, std } => {
                if mean.is_empty() || std.is_empty() {
                    return Err(PipelineError::configuration(
                        "Normalize mean and std must not be empty",
                    ));
                }
                if std.iter().any(|s| *s == 0.0) {
                    return Err(PipelineError::configuration(
                        "Normalize std must not contain zero",
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn has_params(params: Option<&Value>) -> bool {
    match params {
        None | Some(Value::Null) => false,
        Some(Value::Object(map)) => !map.is_empty(),
        Some(_) => true,
    }
}

fn expect_no_params(name: &str, params: Option<&Value>) -> Result<()> {
    if has_params(params) {
        return Err(PipelineError::configuration(format!(
            "{} takes no parameters",
            name
        )));
    }
    Ok(())
}

fn parse_params<T: DeserializeOwned>(name: &str, params: Option<&Value>) -> Result<T> {
    let value = match params {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value.clone(),
    };

    serde_json::from_value(value).map_err(|e| {
        PipelineError::configuration(format!("invalid parameters for {}: {}", name, e))
    })
}

/// Ordered step configuration. Empty slots keep their position but do nothing.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct Steps {
    slots: Vec<Option<Step>>,
}

impl Steps {
    pub fn new(slots: Vec<Option<Step>>) -> Self {
        Self { slots }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| PipelineError::configuration(format!("invalid step list: {}", e)))?;
        Self::from_value(&value)
    }

    /// Parse a JSON array of slots. Each slot is `null`, `{}`, a bare step
    /// name, or a single-key object mapping the name to its parameters.
    pub fn from_value(value: &Value) -> Result<Self> {
        let entries = value
            .as_array()
            .ok_or_else(|| PipelineError::configuration("step list must be a JSON array"))?;

        let slots = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_slot(index, entry))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { slots })
    }

    pub fn slots(&self) -> &[Option<Step>] {
        &self.slots
    }

    /// Non-empty steps in configured order.
    pub fn active(&self) -> impl DoubleEndedIterator<Item = &Step> + '_ {
        self.slots.iter().flatten()
    }

    /// Number of trail entries a forward run over these steps produces.
    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl FromIterator<Step> for Steps {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Some).collect())
    }
}

impl TryFrom<Vec<Value>> for Steps {
    type Error = PipelineError;

    fn try_from(entries: Vec<Value>) -> Result<Self> {
        Self::from_value(&Value::Array(entries))
    }
}

fn parse_slot(index: usize, entry: &Value) -> Result<Option<Step>> {
    match entry {
        Value::Null => Ok(None),
        Value::String(name) => Step::from_config(name, None).map(Some),
        Value::Object(map) => {
            let mut entries = map.iter();
            match (entries.next(), entries.next()) {
                (None, _) => Ok(None),
                (Some((name, params)), None) => Step::from_config(name, Some(params)).map(Some),
                (Some(_), Some(_)) => Err(PipelineError::configuration(format!(
                    "step slot {} names {} steps, expected one",
                    index,
                    map.len()
                ))),
            }
        }
        other => Err(PipelineError::configuration(format!(
            "step slot {} must be an object, a name or null, got {}",
            index, other
        ))),
    }
}
