use crate::ast::*;
use crate::error::{Result, SyntaxError, SyntaxErrorKind};
use crate::lexer::{TokenKind, TokenStream};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Deepest block nesting [`AstBuilder::build`] accepts unless reconfigured.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Builds template ASTs. Holds the table of section keywords each block name
/// accepts, e.g. `else` inside `if`.
#[derive(Debug, Clone)]
pub struct AstBuilder {
    sections: HashMap<String, HashSet<String>>,
    max_depth: usize,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self {
            sections: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps how many blocks may be open at once. Deeper templates fail with
    /// [`SyntaxErrorKind::NestingTooDeep`] instead of exhausting the stack.
    pub fn set_max_depth(&mut self, limit: usize) -> &mut Self {
        self.max_depth = limit;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Lets `{{keyword ...}}` open a new section inside `{{#block_name}}`.
    pub fn register_block_section(
        &mut self,
        block_name: impl Into<String>,
        keyword: impl Into<String>,
    ) -> &mut Self {
        let (block_name, keyword) = (block_name.into(), keyword.into());
        trace!(block = %block_name, keyword = %keyword, "registered block section");
        self.sections.entry(block_name).or_default().insert(keyword);
        self
    }

    pub fn is_section_keyword(&self, block_name: &str, keyword: &str) -> bool {
        self.sections
            .get(block_name)
            .is_some_and(|keywords| keywords.contains(keyword))
    }

    /// Parses `source` into a tree. Fails on the first syntax error.
    pub fn build(&self, source: &str) -> Result<Root> {
        let mut parser = Parser {
            tokens: TokenStream::new(source),
            builder: self,
            depth: 0,
        };
        let mut root = Root::default();
        parser.parse_items(&mut root.items, None)?;
        parser.tokens.expect(TokenKind::EndOfInput, None)?;
        debug!(items = root.items.len(), "built template ast");
        Ok(root)
    }
}

/// Why [`Parser::parse_items`] stopped.
enum Stop {
    EndOfInput,
    /// Sitting on `{{/` of the enclosing block.
    BlockClose,
    /// A section keyword of the enclosing block was consumed.
    Section(Section),
}

struct Parser<'a, 'b> {
    tokens: TokenStream<'a>,
    builder: &'b AstBuilder,
    /// Blocks currently open.
    depth: usize,
}

impl Parser<'_, '_> {
    fn parse_items(&mut self, items: &mut Vec<Item>, block: Option<&str>) -> Result<Stop> {
        loop {
            match self.tokens.current().kind {
                TokenKind::EndOfInput => return Ok(Stop::EndOfInput),
                TokenKind::Text => {
                    let text = self.tokens.advance().into_value();
                    items.push(Item::Text(text));
                }
                TokenKind::TagOpen => {
                    self.tokens.advance();
                    if let Some(section) = self.parse_section_keyword(block)? {
                        return Ok(Stop::Section(section));
                    }
                    items.push(self.parse_tag()?);
                }
                TokenKind::BlockOpen => {
                    let limit = self.builder.max_depth;
                    if self.depth >= limit {
                        return Err(self
                            .tokens
                            .error(SyntaxErrorKind::NestingTooDeep { limit })
                            .into());
                    }
                    self.tokens.advance();
                    self.depth += 1;
                    let block = self.parse_block()?;
                    self.depth -= 1;
                    items.push(Item::Block(block));
                }
                TokenKind::BlockClose => {
                    if let Some(name) = block {
                        if self.tokens.peek_next_is(TokenKind::Identifier, Some(name)) {
                            return Ok(Stop::BlockClose);
                        }
                    }
                    return Err(self.close_error(block).into());
                }
                // Text mode never yields these.
                TokenKind::TagClose
                | TokenKind::Operator
                | TokenKind::Identifier
                | TokenKind::String
                | TokenKind::Number
                | TokenKind::Unknown => {
                    return Err(self.tokens.unexpected(TokenKind::Text, None).into())
                }
            }
        }
    }

    /// Consumes `keyword args... }}` when the current identifier is a
    /// registered section keyword of `block`.
    fn parse_section_keyword(&mut self, block: Option<&str>) -> Result<Option<Section>> {
        let Some(block) = block else {
            return Ok(None);
        };
        let token = self.tokens.current();
        let is_keyword = token.kind == TokenKind::Identifier
            && token
                .value
                .as_deref()
                .is_some_and(|keyword| self.builder.is_section_keyword(block, keyword));
        if !is_keyword {
            return Ok(None);
        }

        let keyword = self.tokens.advance().into_value();
        let arguments = self.parse_arguments()?;
        self.close_tag()?;
        trace!(block, section = %keyword, "opened section");
        Ok(Some(Section::named(keyword, arguments)))
    }

    /// The inside of a `{{ ... }}` tag that is not a section keyword.
    fn parse_tag(&mut self) -> Result<Item> {
        let item = if self.tokens.peek_is(TokenKind::Identifier, None) {
            if self.tokens.peek_next_is(TokenKind::TagClose, None) {
                Item::Expression(Value::Variable(self.tokens.advance().into_value()))
            } else if self.next_is_comparison() {
                Item::Expression(self.parse_expression()?)
            } else {
                let name = self.tokens.advance().into_value();
                let arguments = self.parse_arguments()?;
                Item::Call(Call { name, arguments })
            }
        } else {
            Item::Expression(self.parse_expression()?)
        };
        self.close_tag()?;
        Ok(item)
    }

    fn parse_block(&mut self) -> Result<Block> {
        self.tokens.expect(TokenKind::Identifier, None)?;
        let name = self.tokens.advance().into_value();
        let arguments = self.parse_arguments()?;
        self.close_tag()?;
        trace!(block = %name, "opened block");

        let mut block = Block {
            name,
            arguments,
            main_section: Section::default(),
            sections: Vec::new(),
        };
        let mut stop = self.parse_items(&mut block.main_section.items, Some(&block.name))?;
        while let Stop::Section(mut section) = stop {
            stop = self.parse_items(&mut section.items, Some(&block.name))?;
            block.sections.push(section);
        }

        self.tokens.expect(TokenKind::BlockClose, None)?;
        self.tokens.advance();
        self.tokens.expect(TokenKind::Identifier, Some(&block.name))?;
        self.tokens.advance();
        self.close_tag()?;
        Ok(block)
    }

    /// Arguments up to (not including) the closing `}}`.
    fn parse_arguments(&mut self) -> Result<Arguments> {
        let mut arguments = Arguments::default();
        while !self.tokens.peek_is(TokenKind::TagClose, None) {
            match self.tokens.current().kind {
                TokenKind::String | TokenKind::Number => {
                    arguments.positional.push(self.parse_expression()?);
                }
                TokenKind::Identifier => {
                    if self.tokens.peek_next_is(TokenKind::Operator, Some("=")) {
                        let name = self.tokens.advance().into_value();
                        self.tokens.advance();
                        let value = self.parse_expression()?;
                        arguments.named.insert(name, value);
                    } else {
                        arguments.positional.push(self.parse_expression()?);
                    }
                }
                _ => return Err(self.tokens.unexpected(TokenKind::TagClose, None).into()),
            }
        }
        Ok(arguments)
    }

    /// A tag or argument-level expression: a number or operand, optionally
    /// compared against one more operand.
    fn parse_expression(&mut self) -> Result<Value> {
        let left = if self.tokens.peek_is(TokenKind::Number, None) {
            Value::Number(self.tokens.advance().into_value())
        } else {
            self.parse_sub_expression()?
        };

        let Some(operator) = self.comparison() else {
            return Ok(left);
        };
        self.tokens.advance();
        let right = self.parse_sub_expression()?;
        Ok(Value::Logical(LogicalExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    /// An operand: a variable or a string literal.
    fn parse_sub_expression(&mut self) -> Result<Value> {
        match self.tokens.current().kind {
            TokenKind::Identifier => Ok(Value::Variable(self.tokens.advance().into_value())),
            TokenKind::String => Ok(Value::String(self.tokens.advance().into_value())),
            _ => Err(self.tokens.unexpected(TokenKind::Identifier, None).into()),
        }
    }

    fn comparison(&self) -> Option<Operator> {
        let token = self.tokens.current();
        if token.kind != TokenKind::Operator {
            return None;
        }
        token.value.as_deref().and_then(Operator::from_symbol)
    }

    fn next_is_comparison(&mut self) -> bool {
        ["==", "!=", ">", "<", ">=", "<="]
            .iter()
            .any(|op| self.tokens.peek_next_is(TokenKind::Operator, Some(op)))
    }

    fn close_tag(&mut self) -> Result<()> {
        self.tokens.expect(TokenKind::TagClose, None)?;
        self.tokens.advance();
        Ok(())
    }

    /// Error for a `{{/name}}` that does not belong to the innermost block.
    fn close_error(&mut self, block: Option<&str>) -> SyntaxError {
        let position = self.tokens.advance().position;
        let token = self.tokens.current();
        if token.kind != TokenKind::Identifier {
            return self.tokens.unexpected(TokenKind::Identifier, None);
        }
        let found = token.value.clone().unwrap_or_default();
        let kind = match block {
            Some(open) => SyntaxErrorKind::MismatchedClose {
                expected: open.to_string(),
                found,
            },
            None => SyntaxErrorKind::StrayClose { name: found },
        };
        self.tokens.error_at(kind, position)
    }
}
