//! Response renderer
//!
//! Turns executed results and the plan's answer template into the final
//! answer text. A template with no `${...}` placeholders is kept as a heading
//! over the dedicated formatters' output. Otherwise each placeholder is
//! resolved against the results and formatted by its leaf type.
//!
//! Rendering never fails. A placeholder that does not parse or resolve is
//! left in the output verbatim.

pub mod format;
pub mod path;

use crate::agent::ActionResult;
use crate::tokens::SymbolTable;
use crate::tools::OutputShape;
use format::{dump, format_number, NO_DATA, NO_DATA_AVAILABLE};
use path::{PathExpr, Root, Segment};
use serde_json::Value;

/// A value reached while walking a path, with what is known about its shape
#[derive(Debug)]
struct Node<'v> {
    value: &'v Value,
    shape: Option<OutputShape>,
    /// Display name for a priced asset
    label: Option<String>,
    /// Dispatched input of the owning action, for spot price labels
    input: Option<&'v Value>,
}

pub struct Renderer<'a> {
    symbols: &'a SymbolTable,
}

impl<'a> Renderer<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self { symbols }
    }

    pub fn render(&self, template: &str, results: &[ActionResult]) -> String {
        if !template.contains("${") {
            return self.render_dedicated(template, results);
        }
        self.substitute(template, results)
    }

    /// Heading (if any) followed by one formatted block per result
    fn render_dedicated(&self, heading: &str, results: &[ActionResult]) -> String {
        let mut blocks = Vec::with_capacity(results.len() + 1);
        let heading = heading.trim();
        if !heading.is_empty() {
            blocks.push(heading.to_string());
        }
        blocks.extend(results.iter().map(|r| self.format_result(r)));
        if blocks.is_empty() {
            return NO_DATA_AVAILABLE.to_string();
        }
        blocks.join("\n")
    }

    fn format_result(&self, result: &ActionResult) -> String {
        self.format_node(&self.result_node(result))
    }

    fn result_node<'v>(&self, result: &'v ActionResult) -> Node<'v> {
        let label = match result.shape {
            OutputShape::PricedAsset => result
                .input
                .get("symbol")
                .and_then(Value::as_str)
                .map(|id| self.symbols.display_name(id)),
            _ => None,
        };
        Node {
            value: &result.output,
            shape: Some(result.shape),
            label,
            input: Some(&result.input),
        }
    }

    /// Dedicated layout when the shape is known, leaf rules otherwise
    fn format_node(&self, node: &Node<'_>) -> String {
        let formatted = match node.shape {
            Some(OutputShape::PricedAsset) => {
                let label = node.label.as_deref().unwrap_or("Price");
                format::format_priced_asset(label, node.value)
            }
            Some(OutputShape::PricedAssetMap) => {
                format::format_priced_asset_map(node.value, self.symbols)
            }
            Some(OutputShape::PoolSnapshot) => format::format_pool(node.value, self.symbols),
            Some(OutputShape::PoolList) => format::format_pool_list(node.value, self.symbols),
            Some(OutputShape::SpotPrice) => node.input.and_then(|input| {
                format::format_spot_price(input, node.value, self.symbols)
            }),
            Some(OutputShape::Scalar) | None => None,
        };
        formatted.unwrap_or_else(|| format_leaf(node.value))
    }

    fn substitute(&self, template: &str, results: &[ActionResult]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = placeholder_end(after) else {
                tracing::debug!(placeholder = rest[start..].trim(), "Unterminated placeholder");
                out.push_str(&rest[start..]);
                return out;
            };

            let expr = &after[..end];
            match self.evaluate(expr, results) {
                Some(text) => out.push_str(&text),
                None => out.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        out
    }

    fn evaluate(&self, expr: &str, results: &[ActionResult]) -> Option<String> {
        let path = match path::parse(expr) {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(expr = expr, error = %e, "Leaving unparseable placeholder");
                return None;
            }
        };
        let resolved = self.resolve(&path, results);
        if resolved.is_none() {
            tracing::debug!(expr = expr, "Leaving unresolved placeholder");
        }
        resolved
    }

    fn resolve(&self, path: &PathExpr, results: &[ActionResult]) -> Option<String> {
        let (mut node, segments) = match (path.root, path.segments.split_first()) {
            (Root::Result, None) => return results.first().map(|r| self.format_result(r)),
            (Root::Results, None) if results.is_empty() => return None,
            (Root::Results, None) => return Some(self.render_dedicated("", results)),
            (Root::Result, Some(_)) => (self.result_node(results.first()?), &path.segments[..]),
            (Root::Results, Some((first, rest))) => (self.keyed_result(results, first)?, rest),
        };

        for segment in segments {
            node = self.child(&node, segment)?;
        }
        Some(self.format_node(&node))
    }

    /// `results[...]` lookup: action index, then tool name, then a priced
    /// asset inside a multi-price result by coin type or symbol
    fn keyed_result<'v>(&self, results: &'v [ActionResult], key: &Segment) -> Option<Node<'v>> {
        if let Some(result) = key.as_index().and_then(|i| results.get(i)) {
            return Some(self.result_node(result));
        }

        let key = key.as_key();
        if let Some(result) = results.iter().find(|r| r.tool == key) {
            return Some(self.result_node(result));
        }

        results
            .iter()
            .filter(|r| r.shape == OutputShape::PricedAssetMap)
            .find_map(|r| self.priced_asset_entry(&r.output, &key))
    }

    fn priced_asset_entry<'v>(&self, map: &'v Value, key: &str) -> Option<Node<'v>> {
        let entries = map.as_object()?;
        let (id, value) = entries
            .iter()
            .find(|(id, _)| id.as_str() == key)
            .or_else(|| {
                entries
                    .iter()
                    .find(|(id, _)| self.symbols.display_name(id).eq_ignore_ascii_case(key))
            })?;
        Some(Node {
            value,
            shape: Some(OutputShape::PricedAsset),
            label: Some(self.symbols.display_name(id)),
            input: None,
        })
    }

    fn child<'v>(&self, node: &Node<'v>, segment: &Segment) -> Option<Node<'v>> {
        match node.value {
            Value::Object(_) if node.shape == Some(OutputShape::PricedAssetMap) => {
                self.priced_asset_entry(node.value, &segment.as_key())
            }
            Value::Object(map) => Some(Node {
                value: map.get(&segment.as_key())?,
                shape: None,
                label: None,
                input: None,
            }),
            Value::Array(items) => Some(Node {
                value: items.get(segment.as_index()?)?,
                shape: match node.shape {
                    Some(OutputShape::PoolList) => Some(OutputShape::PoolSnapshot),
                    _ => None,
                },
                label: None,
                input: None,
            }),
            _ => None,
        }
    }
}

/// Offset of the `}` closing a placeholder. Braces inside a bracketed
/// quoted key do not count.
fn placeholder_end(expr: &str) -> Option<usize> {
    let mut quote = None;
    let mut after_bracket = false;
    for (i, c) in expr.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '}' => return Some(i),
                '\'' | '"' if after_bracket => quote = Some(c),
                _ => {}
            },
        }
        if !c.is_whitespace() {
            after_bracket = quote.is_none() && c == '[';
        }
    }
    None
}

/// Leaf rules: number, array, object, then everything else
fn format_leaf(value: &Value) -> String {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(format_number)
            .unwrap_or_else(|| n.to_string()),
        Value::Array(items) if items.is_empty() => NO_DATA.to_string(),
        Value::Array(_) | Value::Object(_) => dump(value),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Null => NO_DATA_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::coin_types::{SUI, USDC};
    use serde_json::json;

    fn result(tool: &str, shape: OutputShape, input: Value, output: Value) -> ActionResult {
        ActionResult {
            tool: tool.to_string(),
            input,
            output,
            shape,
        }
    }

    fn sui_price() -> ActionResult {
        result(
            "get_token_price",
            OutputShape::PricedAsset,
            json!({"symbol": SUI}),
            json!({"current": 1.23, "previous": 1.20, "lastUpdated": 0, "priceChange24h": 2.50}),
        )
    }

    fn prices() -> ActionResult {
        result(
            "get_token_prices",
            OutputShape::PricedAssetMap,
            json!({"symbols": [SUI, USDC]}),
            json!({
                SUI: {"current": 1.23, "previous": 1.20, "priceChange24h": 2.50},
                USDC: {"current": 1.0, "previous": 1.0, "priceChange24h": 0.0}
            }),
        )
    }

    fn render(template: &str, results: &[ActionResult]) -> String {
        let symbols = SymbolTable::builtin();
        Renderer::new(&symbols).render(template, results)
    }

    #[test]
    fn test_numeric_leaf_has_three_decimals() {
        assert_eq!(render("${result.current}", &[sui_price()]), "1.230");
        let scalar = result("apr_to_apy", OutputShape::Scalar, json!({}), json!(1234.5));
        assert_eq!(render("APY: ${result}%", &[scalar]), "APY: 1234.500%");
    }

    #[test]
    fn test_dedicated_price_formatter() {
        assert_eq!(render("", &[sui_price()]), "SUI: $1.2300 (+2.50%)");
        assert_eq!(
            render("Here is the price:", &[sui_price()]),
            "Here is the price:\nSUI: $1.2300 (+2.50%)"
        );
        assert_eq!(render("${result}", &[sui_price()]), "SUI: $1.2300 (+2.50%)");
    }

    #[test]
    fn test_keyed_results() {
        let results = [prices()];
        assert_eq!(render("${results['SUI'].current}", &results), "1.230");
        assert_eq!(
            render("${results['get_token_prices']['usdc'].current}", &results),
            "1.000"
        );
        assert_eq!(
            render(&format!("${{results['{}'].previous}}", SUI), &results),
            "1.200"
        );
        assert_eq!(render("${results.SUI}", &results), "SUI: $1.2300 (+2.50%)");
    }

    #[test]
    fn test_results_by_index() {
        let results = [prices(), sui_price()];
        assert_eq!(render("${results[1].priceChange24h}", &results), "2.500");
        assert_eq!(render("${results.0.SUI.current}", &results), "1.230");
    }

    #[test]
    fn test_unresolvable_placeholders_left_verbatim() {
        let results = [sui_price()];
        assert_eq!(
            render("Price ${result.missing} and ${results['DOGE'].current}", &results),
            "Price ${result.missing} and ${results['DOGE'].current}"
        );
        assert_eq!(render("${price * 2}", &results), "${price * 2}");
        assert_eq!(render("Now ${result.current", &results), "Now ${result.current");
        assert_eq!(render("${result.current}", &[]), "${result.current}");
    }

    #[test]
    fn test_braces_inside_quoted_keys() {
        let odd = result(
            "custom",
            OutputShape::Scalar,
            json!({}),
            json!({"a}b": {"x": 7}, "{c}": 2}),
        );
        assert_eq!(render("A ${result['a}b'].x} B", &[odd.clone()]), "A 7.000 B");
        assert_eq!(render(r#"${result["{c}"]}!"#, &[odd.clone()]), "2.000!");
        assert_eq!(render("${results[0]['a}b'].x}", &[odd.clone()]), "7.000");
        assert_eq!(render("${result['a}b'", &[odd]), "${result['a}b'");
    }

    #[test]
    fn test_leaf_sentinels() {
        let pools = result("get_all_pools", OutputShape::PoolList, json!({}), json!([]));
        assert_eq!(render("Pools: ${result}", &[pools.clone()]), "Pools: No pools found");

        let raw = result(
            "get_pool_info",
            OutputShape::PoolSnapshot,
            json!({"pool_id": "0x1"}),
            json!({"id": "0x1", "tokens": [], "apr": null, "meta": {"a": 1}}),
        );
        assert_eq!(render("${result.tokens}", &[raw.clone()]), "No data");
        assert_eq!(render("${result.apr}", &[raw.clone()]), "No data available");
        assert_eq!(render("${result.id}", &[raw.clone()]), "0x1");
        assert_eq!(render("${result.meta}", &[raw]), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_pool_list_elements_use_pool_formatter() {
        let pools = result(
            "get_top_pools",
            OutputShape::PoolList,
            json!({"limit": 1, "sort_by": "tvl"}),
            json!([{
                "id": "0x5eb2dfcdd1b15d2021328258f6d5ec081e9a0cdcfa9e13a0eaeb9b5f7505ca78",
                "tokens": [SUI, USDC],
                "reserves": [1.0, 2.0],
                "fee": 0.25,
                "tvl": 3.0,
                "apr": 18.42
            }]),
        );
        let text = render("Best: ${result[0]}", &[pools.clone()]);
        assert!(text.starts_with("Best: Pool SUI/USDC (0x5eb2...ca78)"));
        assert_eq!(render("${result[0].tokens[1]}", &[pools]), USDC);
    }

    #[test]
    fn test_spot_price_formatter() {
        let spot = result(
            "get_spot_price",
            OutputShape::SpotPrice,
            json!({"pool_id": "0x1", "coin_in": SUI, "coin_out": USDC, "with_fees": true}),
            json!(1.229175),
        );
        assert_eq!(render("", &[spot.clone()]), "1 SUI = 1.229175 USDC");
        assert_eq!(render("Rate: ${result}", &[spot]), "Rate: 1 SUI = 1.229175 USDC");
    }

    #[test]
    fn test_no_results_and_no_template() {
        assert_eq!(render("  ", &[]), NO_DATA_AVAILABLE);
    }
}
