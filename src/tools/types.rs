//! Tool contracts: parameter specs, output shapes and typed arguments.

use crate::error::ToolError;
use serde::Serialize;
use serde_json::{json, Value};

/// Semantic type of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    String,
    Number,
    Integer,
    Boolean,
    StringList,
}

impl ParameterKind {
    pub fn name(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Number => "number",
            ParameterKind::Integer => "integer",
            ParameterKind::Boolean => "boolean",
            ParameterKind::StringList => "string[]",
        }
    }

    /// Convert an untrusted JSON value into a typed argument
    pub fn coerce(&self, value: &Value) -> Result<ArgValue, String> {
        match (self, value) {
            (ParameterKind::String, Value::String(s)) => Ok(ArgValue::String(s.clone())),
            (ParameterKind::String, Value::Number(n)) => Ok(ArgValue::String(n.to_string())),
            (ParameterKind::Number, Value::Number(n)) => n
                .as_f64()
                .map(ArgValue::Number)
                .ok_or_else(|| format!("{} is not a finite number", n)),
            (ParameterKind::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(ArgValue::Number)
                .map_err(|_| format!("'{}' is not a number", s)),
            (ParameterKind::Integer, Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(ArgValue::Integer(i)),
                (None, Some(f)) if f.fract() == 0.0 => Ok(ArgValue::Integer(f as i64)),
                _ => Err(format!("{} is not an integer", n)),
            },
            (ParameterKind::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(ArgValue::Integer)
                .map_err(|_| format!("'{}' is not an integer", s)),
            (ParameterKind::Boolean, Value::Bool(b)) => Ok(ArgValue::Boolean(*b)),
            (ParameterKind::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str()
            {
                "true" | "yes" => Ok(ArgValue::Boolean(true)),
                "false" | "no" => Ok(ArgValue::Boolean(false)),
                _ => Err(format!("'{}' is not a boolean", s)),
            },
            (ParameterKind::StringList, Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(format!("list item {} is not a string", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(ArgValue::StringList),
            (ParameterKind::StringList, Value::String(s)) => Ok(ArgValue::StringList(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            (kind, other) => Err(format!("expected {}, got {}", kind.name(), other)),
        }
    }
}

/// One declared parameter of a tool
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParameterKind,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<Value>,
    /// Value denotes a tradable asset and is resolved through the symbol table
    pub asset_reference: bool,
}

impl ParameterSpec {
    pub fn required(name: &'static str, kind: ParameterKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
            default: None,
            asset_reference: false,
        }
    }

    pub fn optional(name: &'static str, kind: ParameterKind, description: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn asset_reference(mut self) -> Self {
        self.asset_reference = true;
        self
    }
}

/// Shape of a tool's output, used to pick a dedicated formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    /// `{current, previous, lastUpdated, priceChange24h}`
    PricedAsset,
    /// Canonical asset id → priced asset
    PricedAssetMap,
    /// `{id, tokens[], reserves[], fee, tvl, apr}`
    PoolSnapshot,
    /// Array of pool snapshots
    PoolList,
    /// Bare number: price of one unit of `coin_in` in `coin_out`
    SpotPrice,
    /// Bare number
    Scalar,
}

impl OutputShape {
    pub fn describe(&self) -> &'static str {
        match self {
            OutputShape::PricedAsset => {
                "{ current, previous, lastUpdated, priceChange24h } (USD, percent)"
            }
            OutputShape::PricedAssetMap => {
                "{ <coin type or SYMBOL>: { current, previous, lastUpdated, priceChange24h } }"
            }
            OutputShape::PoolSnapshot => "{ id, tokens[], reserves[], fee, tvl, apr }",
            OutputShape::PoolList => "[ { id, tokens[], reserves[], fee, tvl, apr } ]",
            OutputShape::SpotPrice => "number (units of coin_out per coin_in)",
            OutputShape::Scalar => "number",
        }
    }
}

/// Immutable description of a registered tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
    pub output: OutputShape,
}

impl ToolDefinition {
    pub fn new(name: &'static str, description: &'static str, output: OutputShape) -> Self {
        Self {
            name,
            description,
            parameters: Vec::new(),
            output,
        }
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// Names of parameters a plan must supply (required with no default)
    pub fn required_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parameters
            .iter()
            .filter(|p| p.required && p.default.is_none())
            .map(|p| p.name)
    }
}

/// Typed argument value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    StringList(Vec<String>),
}

impl ArgValue {
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::String(s) => json!(s),
            ArgValue::Number(n) => json!(n),
            ArgValue::Integer(i) => json!(i),
            ArgValue::Boolean(b) => json!(b),
            ArgValue::StringList(items) => json!(items),
        }
    }
}

/// Ordered argument list, assembled in parameter-spec order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: Vec<(&'static str, ArgValue)>,
}

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, value: ArgValue) {
        self.values.push((name, value));
    }

    pub fn with(mut self, name: &'static str, value: ArgValue) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ArgValue)> {
        self.values.iter().map(|(n, v)| (*n, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        match self.get(name) {
            Some(ArgValue::String(s)) => Ok(s),
            Some(other) => Err(mismatch(name, "string", other)),
            None => Err(missing(name)),
        }
    }

    pub fn number(&self, name: &str) -> Result<f64, ToolError> {
        match self.get(name) {
            Some(ArgValue::Number(n)) => Ok(*n),
            Some(ArgValue::Integer(i)) => Ok(*i as f64),
            Some(other) => Err(mismatch(name, "number", other)),
            None => Err(missing(name)),
        }
    }

    pub fn integer(&self, name: &str) -> Result<i64, ToolError> {
        match self.get(name) {
            Some(ArgValue::Integer(i)) => Ok(*i),
            Some(other) => Err(mismatch(name, "integer", other)),
            None => Err(missing(name)),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool, ToolError> {
        match self.get(name) {
            Some(ArgValue::Boolean(b)) => Ok(*b),
            Some(other) => Err(mismatch(name, "boolean", other)),
            None => Err(missing(name)),
        }
    }

    pub fn string_list(&self, name: &str) -> Result<&[String], ToolError> {
        match self.get(name) {
            Some(ArgValue::StringList(items)) => Ok(items),
            Some(other) => Err(mismatch(name, "string list", other)),
            None => Err(missing(name)),
        }
    }

    /// Arguments as a JSON object, for logging
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_json()))
                .collect(),
        )
    }
}

fn missing(name: &str) -> ToolError {
    ToolError::InvalidArgument(format!("Missing '{}'", name))
}

fn mismatch(name: &str, expected: &str, got: &ArgValue) -> ToolError {
    ToolError::InvalidArgument(format!("'{}' should be a {}, got {:?}", name, expected, got))
}
