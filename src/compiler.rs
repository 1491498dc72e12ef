use crate::ast::*;
use crate::error::{CompileError, Result};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

/// Generates the code fragment for a `{{name args...}}` call.
pub trait Helper: Send + Sync {
    fn generate(&self, call: &Call, compiler: &Compiler) -> Result<String>;
}

impl<F> Helper for F
where
    F: Fn(&Call, &Compiler) -> Result<String> + Send + Sync,
{
    fn generate(&self, call: &Call, compiler: &Compiler) -> Result<String> {
        self(call, compiler)
    }
}

/// Generates the code fragment for a `{{#name}}...{{/name}}` block. The
/// helper decides which sections are rendered and how.
pub trait BlockHelper: Send + Sync {
    fn generate(&self, block: &Block, compiler: &Compiler) -> Result<String>;
}

impl<F> BlockHelper for F
where
    F: Fn(&Block, &Compiler) -> Result<String> + Send + Sync,
{
    fn generate(&self, block: &Block, compiler: &Compiler) -> Result<String> {
        self(block, compiler)
    }
}

/// Turns the text of a tag-free template into the final artifact.
pub type StringResultStrategy = Box<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Parameter name of the generated function; variables read from it.
    pub context_name: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            context_name: "params".to_string(),
        }
    }
}

/// Compiles template ASTs to JavaScript function source.
pub struct Compiler {
    config: CompilerConfig,
    helpers: HashMap<String, Box<dyn Helper>>,
    block_helpers: HashMap<String, Box<dyn BlockHelper>>,
    string_result: StringResultStrategy,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut helpers: Vec<_> = self.helpers.keys().collect();
        helpers.sort();
        let mut block_helpers: Vec<_> = self.block_helpers.keys().collect();
        block_helpers.sort();
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .field("helpers", &helpers)
            .field("block_helpers", &block_helpers)
            .finish_non_exhaustive()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_config(CompilerConfig::default())
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        Self {
            config,
            helpers: HashMap::new(),
            block_helpers: HashMap::new(),
            string_result: Box::new(|text: &str| {
                format!("function(){{return {};}}", Compiler::string_literal(text))
            }),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn register_helper(
        &mut self,
        name: impl Into<String>,
        helper: impl Helper + 'static,
    ) -> &mut Self {
        let name = name.into();
        trace!(helper = %name, "registered helper");
        self.helpers.insert(name, Box::new(helper));
        self
    }

    pub fn register_block_helper(
        &mut self,
        name: impl Into<String>,
        helper: impl BlockHelper + 'static,
    ) -> &mut Self {
        let name = name.into();
        trace!(block_helper = %name, "registered block helper");
        self.block_helpers.insert(name, Box::new(helper));
        self
    }

    /// Replaces how tag-free templates are emitted. The default wraps the
    /// text in a zero-argument function.
    pub fn set_string_result_strategy(
        &mut self,
        strategy: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> &mut Self {
        self.string_result = Box::new(strategy);
        self
    }

    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn has_block_helper(&self, name: &str) -> bool {
        self.block_helpers.contains_key(name)
    }

    /// Compiles a whole template. Templates without tags skip the function
    /// wrapper and go through the string-result strategy.
    pub fn compile(&self, root: &Root) -> Result<String> {
        if let Some(text) = root.as_constant() {
            debug!(len = text.len(), "folded template to a constant");
            return Ok((self.string_result)(text));
        }
        let body = self.compile_items(&root.items)?;
        debug!(items = root.items.len(), "compiled template function");
        Ok(format!(
            "function({}){{return {};}}",
            self.config.context_name, body
        ))
    }

    /// Concatenation of the item fragments, `""` when there are none.
    pub fn compile_items(&self, items: &[Item]) -> Result<String> {
        if items.is_empty() {
            return Ok(Self::string_literal(""));
        }
        let fragments = items
            .iter()
            .map(|item| self.compile_item(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(fragments.join("+"))
    }

    pub fn compile_section(&self, section: &Section) -> Result<String> {
        self.compile_items(&section.items)
    }

    pub fn compile_item(&self, item: &Item) -> Result<String> {
        match item {
            Item::Text(text) => Ok(Self::string_literal(text)),
            Item::Expression(value) => Ok(self.generate_expression(value)),
            Item::Call(call) => {
                let helper = self
                    .helpers
                    .get(&call.name)
                    .ok_or_else(|| CompileError::UnknownHelper(call.name.clone()))?;
                helper.generate(call, self)
            }
            Item::Block(block) => {
                let helper = self
                    .block_helpers
                    .get(&block.name)
                    .ok_or_else(|| CompileError::UnknownBlockHelper(block.name.clone()))?;
                helper.generate(block, self)
            }
        }
    }

    pub fn generate_expression(&self, value: &Value) -> String {
        match value {
            Value::Logical(expr) => format!(
                "({}{}{})",
                self.generate_expression(&expr.left),
                expr.operator,
                self.generate_expression(&expr.right)
            ),
            Value::String(text) => Self::string_literal(text),
            Value::Number(raw) => raw.clone(),
            Value::Variable(name) => self.generate_variable(name),
        }
    }

    pub fn generate_variable(&self, name: &str) -> String {
        format!("{}.{}", self.config.context_name, name)
    }

    /// A double-quoted, JSON-escaped string literal.
    pub fn string_literal(text: &str) -> String {
        serde_json::Value::String(text.to_string()).to_string()
    }
}
