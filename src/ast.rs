use indexmap::IndexMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Comparison operators allowed between two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Operator {
    Eq,    // ==
    NotEq, // !=
    Gt,    // >
    Lt,    // <
    GtEq,  // >=
    LtEq,  // <=
}

impl Operator {
    /// Maps an operator token to a comparison. `=` is not one.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(Operator::Eq),
            "!=" => Some(Operator::NotEq),
            ">" => Some(Operator::Gt),
            "<" => Some(Operator::Lt),
            ">=" => Some(Operator::GtEq),
            "<=" => Some(Operator::LtEq),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::GtEq => ">=",
            Operator::LtEq => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Value {
    Variable(String),
    String(String),
    /// Digits exactly as written in the source.
    Number(String),
    Logical(LogicalExpression),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LogicalExpression {
    pub operator: Operator,
    pub left: Box<Value>,
    pub right: Box<Value>,
}

/// Positional and named arguments of a call, block or section tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Arguments {
    pub positional: Vec<Value>,
    /// Keeps source order for stable output; equality ignores it.
    pub named: IndexMap<String, Value>,
}

impl Arguments {
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Item {
    Text(String),
    Expression(Value),
    Call(Call),
    Block(Block),
}

/// `{{name args...}}`, handed to the helper registered under `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Call {
    pub name: String,
    pub arguments: Arguments,
}

/// `{{#name args...}} ... {{/name}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Block {
    pub name: String,
    pub arguments: Arguments,
    /// Items before the first section keyword (or the close tag).
    pub main_section: Section,
    /// Keyword sections in source order.
    pub sections: Vec<Section>,
}

impl Block {
    /// First section introduced by `keyword`.
    pub fn section(&self, keyword: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.name.as_deref() == Some(keyword))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Section {
    /// `None` for a block's main section.
    pub name: Option<String>,
    pub arguments: Arguments,
    pub items: Vec<Item>,
}

impl Section {
    pub fn named(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            name: Some(name.into()),
            arguments,
            items: Vec::new(),
        }
    }

    pub fn is_main(&self) -> bool {
        self.name.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Root {
    pub items: Vec<Item>,
}

impl Root {
    /// The literal text this template reduces to, when it has no tags.
    pub fn as_constant(&self) -> Option<&str> {
        match self.items.as_slice() {
            [] => Some(""),
            [Item::Text(text)] => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_roots() {
        assert_eq!(Root::default().as_constant(), Some(""));
        let text = Root {
            items: vec![Item::Text("hi".into())],
        };
        assert_eq!(text.as_constant(), Some("hi"));
        let expression = Root {
            items: vec![Item::Expression(Value::Variable("x".into()))],
        };
        assert_eq!(expression.as_constant(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_blocks_with_sections() {
        use serde_json::json;

        let mut builder = crate::AstBuilder::new();
        builder.register_block_section("if", "else");
        let root = builder
            .build(r#"{{#if a > "b"}}x{{else}}y{{/if}}"#)
            .unwrap();
        let empty = json!({ "positional": [], "named": {} });
        assert_eq!(
            serde_json::to_value(&root).unwrap(),
            json!({
                "items": [{
                    "Block": {
                        "name": "if",
                        "arguments": {
                            "positional": [{
                                "Logical": {
                                    "operator": "Gt",
                                    "left": { "Variable": "a" },
                                    "right": { "String": "b" }
                                }
                            }],
                            "named": {}
                        },
                        "main_section": {
                            "name": null,
                            "arguments": empty,
                            "items": [{ "Text": "x" }]
                        },
                        "sections": [{
                            "name": "else",
                            "arguments": empty,
                            "items": [{ "Text": "y" }]
                        }]
                    }
                }]
            })
        );
    }
}
