//! Prompt builder
//!
//! Renders the tool catalog, the symbol table and the user query into the
//! single instruction sent to the LLM.

use crate::tokens::SymbolTable;
use crate::tools::{ToolDefinition, ToolRegistry};
use std::fmt::Write;

const PREAMBLE: &str = "You are a DeFi analytics assistant for the Sui blockchain. \
You answer questions about token prices, liquidity pools and swap rates by planning \
calls to the tools listed below. You never invent numbers: every figure in your answer \
must come from a tool result.";

const TEMPLATE_RULES: &str = "\
The answerTemplate is plain text with ${...} placeholders filled from tool results:
- ${result.field} reads a field of the first action's result, e.g. ${result.current}
- ${results['get_token_prices']['SUI'].current} reads a keyed result; results are keyed by \
tool name, by action index ('0', '1', ...) and, for multi-token prices, by token symbol
- ${result.tokens[0]} indexes into arrays
- ${result} or ${results} alone inserts a formatted summary of the whole result
Numbers are rendered with three decimals. Leave the template empty to get the default \
formatted summary.";

const EXAMPLES: &str = r#"Example 1 (enough information):
Question: What is the price of SUI?
{
  "status": "success",
  "reasoning": "The user wants the current SUI price.",
  "actions": [{ "tool": "get_token_price", "input": { "symbol": "SUI" } }],
  "answerTemplate": "SUI is trading at $${result.current} (${result.priceChange24h}% in 24h)."
}

Example 2 (missing information):
Question: How deep is the pool?
{
  "status": "needs_info",
  "reasoning": "No pool was named.",
  "request": "Which pool do you mean? Please give its id or its token pair."
}

Example 3 (outside the tools):
Question: What will SUI be worth next year?
{
  "status": "error",
  "reasoning": "Price predictions are not available from any tool.",
  "errorMessage": "I can only report current market data, not predictions."
}"#;

/// Builds the instruction for one query. Holds only shared read-only state.
pub struct PromptBuilder<'a> {
    registry: &'a ToolRegistry,
    symbols: &'a SymbolTable,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(registry: &'a ToolRegistry, symbols: &'a SymbolTable) -> Self {
        Self { registry, symbols }
    }

    pub fn build(&self, query: &str) -> String {
        let mut prompt = String::with_capacity(4096);
        prompt.push_str(PREAMBLE);
        prompt.push_str("\n\n## Tools\n");
        for definition in self.registry.definitions() {
            write_tool(&mut prompt, definition);
        }

        prompt.push_str("\n## Known token symbols\n");
        let symbols: Vec<&str> = self.symbols.entries().map(|(symbol, _)| symbol).collect();
        prompt.push_str(&symbols.join(", "));
        prompt.push_str(
            "\nRefer to tokens by symbol; they are translated to coin types for you. \
             Full coin types (0x...::module::NAME) are accepted too.\n",
        );

        prompt.push_str("\n## Response format\n");
        prompt.push_str(
            "Reply with a single JSON object with these fields:\n\
             - status: \"success\", \"needs_info\" or \"error\"\n\
             - reasoning: one sentence on how you read the question\n\
             - actions: list of { \"tool\": <name>, \"input\": { <parameter>: <value> } }, \
             executed in order (only for success)\n\
             - answerTemplate: the answer text (only for success)\n\
             - request: the question to ask the user (only for needs_info)\n\
             - errorMessage: why the question cannot be answered (only for error)\n\n",
        );
        prompt.push_str(TEMPLATE_RULES);
        prompt.push_str("\n\n## Examples\n");
        prompt.push_str(EXAMPLES);

        prompt.push_str("\n\n## Question\n");
        prompt.push_str(query);
        prompt.push_str("\n\nReturn only the JSON object, with no other text.");
        prompt
    }
}

fn write_tool(prompt: &mut String, definition: &ToolDefinition) {
    let _ = writeln!(prompt, "- {}: {}", definition.name, definition.description);
    for param in &definition.parameters {
        let requirement = match (&param.default, param.required) {
            (Some(default), _) => format!("optional, default {}", default),
            (None, true) => "required".to_string(),
            (None, false) => "optional".to_string(),
        };
        let _ = writeln!(
            prompt,
            "    {} ({}, {}): {}",
            param.name,
            param.kind.name(),
            requirement,
            param.description
        );
    }
    let required: Vec<&str> = definition.required_names().collect();
    if !required.is_empty() {
        let _ = writeln!(prompt, "    required: {}", required.join(", "));
    }
    let _ = writeln!(prompt, "    returns: {}", definition.output.describe());
}
