//! compact-tl: a small template language compiled to JavaScript function
//! source.
//!
//! A template is literal text with `{{ ... }}` tags. Compiling it yields
//! either a constant (templates without tags) or the source of a one-argument
//! function that renders the template against a context object:
//!
//! ```text
//! before{{x}}after   =>   function(params){return "before"+params.x+"after";}
//! ```
//!
//! Supported syntax:
//! - `{{ name }}` reads a field of the context.
//! - `{{ "text" }}`, `{{ 'text' }}` and `{{ 42 }}` are literals.
//! - `{{ a == b }}` with `==`, `!=`, `>`, `<`, `>=`, `<=` compares two
//!   operands (variables or strings).
//! - `{{ helper arg key=value }}` calls a registered helper.
//! - `{{#block arg}} ... {{/block}}` hands a body to a registered block
//!   helper. Keywords registered for a block (e.g. `else` for `if`) split its
//!   body into named sections. Blocks may nest up to [`DEFAULT_MAX_DEPTH`]
//!   levels unless [`AstBuilder::set_max_depth`] says otherwise.
//!
//! The crate ships no helpers of its own; they are supplied through
//! [`Extension`]s.
//!
//! Pipeline: [`lexer`] tokens → [`AstBuilder`] tree → [`Compiler`] code.

pub mod ast;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Arguments, Block, Call, Item, LogicalExpression, Operator, Root, Section, Value};
pub use compiler::{BlockHelper, Compiler, CompilerConfig, Helper, StringResultStrategy};
pub use error::{CompileError, Error, Result, SyntaxError, SyntaxErrorKind};
pub use parser::{AstBuilder, DEFAULT_MAX_DEPTH};

/// Registers grammar and helpers on an [`Engine`].
pub trait Extension {
    fn register(self, builder: &mut AstBuilder, compiler: &mut Compiler);
}

impl<F> Extension for F
where
    F: FnOnce(&mut AstBuilder, &mut Compiler),
{
    fn register(self, builder: &mut AstBuilder, compiler: &mut Compiler) {
        self(builder, compiler)
    }
}

/// Builder and compiler wired together.
///
/// Configure with [`Engine::use_extension`] first; [`Engine::process`] only
/// needs `&self`, so a configured engine can be shared between threads.
#[derive(Debug, Default)]
pub struct Engine {
    builder: AstBuilder,
    compiler: Compiler,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        Self {
            builder: AstBuilder::new(),
            compiler: Compiler::with_config(config),
        }
    }

    pub fn use_extension(&mut self, extension: impl Extension) -> &mut Self {
        extension.register(&mut self.builder, &mut self.compiler);
        self
    }

    /// Compiles `source` into JavaScript source.
    pub fn process(&self, source: &str) -> Result<String> {
        let root = self.builder.build(source)?;
        self.compiler.compile(&root)
    }

    /// Parses `source` without compiling it.
    pub fn parse(&self, source: &str) -> Result<Root> {
        self.builder.build(source)
    }

    pub fn builder(&self) -> &AstBuilder {
        &self.builder
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }
}
