//! Processor specifications: pipeline steps as plain data.
//!
//! A spec is a processor name plus positional arguments. Specs are resolved
//! to behaviour only when a pipeline is composed, so they can live in config
//! files and on the command line:
//!
//! | Form | Example |
//! |---|---|
//! | TOML / JSON, bare | `"autorotate"` |
//! | TOML / JSON, with arguments | `["thumbnail", [300, 300]]` |
//! | CLI text | `thumbnail:300x300`, `crop:200x200`, `custom:1,2.5,label` |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpecError {
    #[error("Processor spec is empty")]
    Empty,
    #[error("Processor name must be a string, got {0}")]
    NameNotString(Value),
    #[error("Invalid processor name '{0}'")]
    InvalidName(String),
}

/// One pipeline step: a processor name and its positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpec", into = "RawSpec")]
pub struct ProcessorSpec {
    name: String,
    args: Vec<Value>,
}

/// Wire shape of a spec: either `"name"` or `["name", arg, ...]`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawSpec {
    Bare(String),
    WithArgs(Vec<Value>),
}

fn validate_name(name: &str) -> Result<(), SpecError> {
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == ':') {
        return Err(SpecError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl ProcessorSpec {
    /// A spec without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

impl From<&str> for ProcessorSpec {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl TryFrom<RawSpec> for ProcessorSpec {
    type Error = SpecError;

    fn try_from(raw: RawSpec) -> Result<Self, Self::Error> {
        match raw {
            RawSpec::Bare(name) => {
                validate_name(&name)?;
                Ok(Self::new(name))
            }
            RawSpec::WithArgs(values) => {
                let mut values = values.into_iter();
                match values.next() {
                    None => Err(SpecError::Empty),
                    Some(Value::String(name)) => {
                        validate_name(&name)?;
                        Ok(Self::with_args(name, values.collect()))
                    }
                    Some(other) => Err(SpecError::NameNotString(other)),
                }
            }
        }
    }
}

impl From<ProcessorSpec> for RawSpec {
    fn from(spec: ProcessorSpec) -> Self {
        if spec.args.is_empty() {
            RawSpec::Bare(spec.name)
        } else {
            let mut values = Vec::with_capacity(spec.args.len() + 1);
            values.push(Value::String(spec.name));
            values.extend(spec.args);
            RawSpec::WithArgs(values)
        }
    }
}

/// Interpret one CLI argument token.
///
/// `WxH` becomes a `[W, H]` pair, numbers become numbers, anything else is
/// kept as a string.
fn parse_arg(token: &str) -> Value {
    if let Some((w, h)) = token.split_once('x') {
        if let (Ok(w), Ok(h)) = (w.parse::<u64>(), h.parse::<u64>()) {
            return Value::Array(vec![Value::from(w), Value::from(h)]);
        }
    }
    if let Ok(n) = token.parse::<i64>() {
        return Value::from(n);
    }
    if let Some(n) = token
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(n);
    }
    Value::String(token.to_string())
}

impl FromStr for ProcessorSpec {
    type Err = SpecError;

    /// Parse `name[:arg[,arg]...]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SpecError::Empty);
        }
        let (name, args) = match s.split_once(':') {
            Some((name, rest)) => (
                name,
                rest.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(parse_arg)
                    .collect(),
            ),
            None => (s, Vec::new()),
        };
        validate_name(name)?;
        Ok(Self::with_args(name, args))
    }
}

impl fmt::Display for ProcessorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { ":" } else { "," })?;
            match arg {
                Value::Array(pair) if pair.len() == 2 && pair.iter().all(Value::is_u64) => {
                    write!(f, "{}x{}", pair[0], pair[1])?
                }
                Value::String(s) => f.write_str(s)?,
                other => write!(f, "{other}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_bare_name() {
        let spec: ProcessorSpec = serde_json::from_value(json!("autorotate")).unwrap();
        assert_eq!(spec, ProcessorSpec::new("autorotate"));
        assert!(spec.args().is_empty());
    }

    #[test]
    fn deserialize_name_with_args() {
        let spec: ProcessorSpec = serde_json::from_value(json!(["thumbnail", [300, 200]])).unwrap();
        assert_eq!(spec.name(), "thumbnail");
        assert_eq!(spec.args(), &[json!([300, 200])]);
    }

    #[test]
    fn deserialize_from_toml_array() {
        #[derive(Deserialize)]
        struct Wrapper {
            steps: Vec<ProcessorSpec>,
        }
        let parsed: Wrapper = toml::from_str(r#"steps = ["autorotate", ["crop", [10, 20]]]"#).unwrap();
        assert_eq!(parsed.steps.len(), 2);
        assert_eq!(parsed.steps[1].args(), &[json!([10, 20])]);
    }

    #[test]
    fn deserialize_rejects_bad_shapes() {
        assert!(serde_json::from_value::<ProcessorSpec>(json!([])).is_err());
        assert!(serde_json::from_value::<ProcessorSpec>(json!([3, 4])).is_err());
        assert!(serde_json::from_value::<ProcessorSpec>(json!("has space")).is_err());
    }

    #[test]
    fn serialize_round_trips_shape() {
        assert_eq!(
            serde_json::to_value(ProcessorSpec::new("autorotate")).unwrap(),
            json!("autorotate")
        );
        let spec = ProcessorSpec::with_args("crop", vec![json!([5, 6])]);
        assert_eq!(serde_json::to_value(spec).unwrap(), json!(["crop", [5, 6]]));
    }

    #[test]
    fn parse_cli_forms() {
        let spec: ProcessorSpec = "thumbnail:300x200".parse().unwrap();
        assert_eq!(spec, ProcessorSpec::with_args("thumbnail", vec![json!([300, 200])]));

        let spec: ProcessorSpec = "custom:1,2.5,label".parse().unwrap();
        assert_eq!(spec.args(), &[json!(1), json!(2.5), json!("label")]);

        let spec: ProcessorSpec = "autorotate".parse().unwrap();
        assert!(spec.args().is_empty());
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!("".parse::<ProcessorSpec>(), Err(SpecError::Empty));
        assert!(matches!(
            ":300x300".parse::<ProcessorSpec>(),
            Err(SpecError::InvalidName(_))
        ));
    }

    #[test]
    fn display_matches_cli_form() {
        let spec: ProcessorSpec = "crop:200x100".parse().unwrap();
        assert_eq!(spec.to_string(), "crop:200x100");
        assert_eq!(ProcessorSpec::new("autorotate").to_string(), "autorotate");
    }
}
