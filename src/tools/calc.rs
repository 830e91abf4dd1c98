//! Stateless yield and liquidity formulas exposed as tools.
//!
//! All rates are in percent units (12.5 means 12.5%).

use super::types::{OutputShape, ParameterKind, ParameterSpec, ToolArgs, ToolDefinition};
use super::{ToolHandler, TOOL_APR_TO_APY, TOOL_APY_TO_APR, TOOL_IMPERMANENT_LOSS};
use crate::error::ToolError;
use async_trait::async_trait;
use serde_json::{json, Value};

fn compounds_per_year(args: &ToolArgs) -> Result<f64, ToolError> {
    let n = args.integer("compounds_per_year")?;
    if n < 1 {
        return Err(ToolError::InvalidArgument(
            "'compounds_per_year' must be at least 1".to_string(),
        ));
    }
    Ok(n as f64)
}

fn compounds_param() -> ParameterSpec {
    ParameterSpec::optional(
        "compounds_per_year",
        ParameterKind::Integer,
        "Compounding periods per year",
    )
    .with_default(json!(365))
}

pub fn apr_to_apy(apr: f64, n: f64) -> f64 {
    ((1.0 + apr / 100.0 / n).powf(n) - 1.0) * 100.0
}

pub fn apy_to_apr(apy: f64, n: f64) -> f64 {
    n * ((1.0 + apy / 100.0).powf(1.0 / n) - 1.0) * 100.0
}

/// Loss versus holding, in percent (negative), for a price ratio change
pub fn impermanent_loss(price_ratio: f64) -> f64 {
    (2.0 * price_ratio.sqrt() / (1.0 + price_ratio) - 1.0) * 100.0
}

fn finite(value: f64) -> Result<Value, ToolError> {
    if value.is_finite() {
        Ok(json!(value))
    } else {
        Err(ToolError::Computation("result is not a finite number".to_string()))
    }
}

pub struct AprToApyTool;

#[async_trait]
impl ToolHandler for AprToApyTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_APR_TO_APY,
            "Convert a simple APR (percent) into a compounded APY (percent)",
            OutputShape::Scalar,
        )
        .param(ParameterSpec::required(
            "apr",
            ParameterKind::Number,
            "Annual percentage rate",
        ))
        .param(compounds_param())
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        finite(apr_to_apy(args.number("apr")?, compounds_per_year(args)?))
    }
}

pub struct ApyToAprTool;

#[async_trait]
impl ToolHandler for ApyToAprTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_APY_TO_APR,
            "Convert a compounded APY (percent) back into a simple APR (percent)",
            OutputShape::Scalar,
        )
        .param(ParameterSpec::required(
            "apy",
            ParameterKind::Number,
            "Annual percentage yield",
        ))
        .param(compounds_param())
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        finite(apy_to_apr(args.number("apy")?, compounds_per_year(args)?))
    }
}

pub struct ImpermanentLossTool;

#[async_trait]
impl ToolHandler for ImpermanentLossTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_IMPERMANENT_LOSS,
            "Impermanent loss (percent, negative) of a 50/50 pool position when the \
             price of one asset changes by the given ratio",
            OutputShape::Scalar,
        )
        .param(ParameterSpec::required(
            "price_ratio",
            ParameterKind::Number,
            "New price divided by entry price, e.g. 2 for a doubling",
        ))
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let ratio = args.number("price_ratio")?;
        if ratio <= 0.0 {
            return Err(ToolError::InvalidArgument(
                "'price_ratio' must be positive".to_string(),
            ));
        }
        finite(impermanent_loss(ratio))
    }
}
