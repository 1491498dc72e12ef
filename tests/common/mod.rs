#![allow(dead_code)]

use compact_tl::{AstBuilder, Block, Call, CompileError, Compiler, Engine, Result};

/// `if`/`else`, `switch`/`case`/`default`, `each` and a `json` helper, enough
/// to drive every path of the compiler from templates.
pub fn control_flow(builder: &mut AstBuilder, compiler: &mut Compiler) {
    builder
        .register_block_section("if", "else")
        .register_block_section("switch", "case")
        .register_block_section("switch", "default");

    compiler
        .register_block_helper("if", if_block)
        .register_block_helper("switch", switch_block)
        .register_block_helper("each", each_block)
        .register_helper("json", json_helper);
}

pub fn engine() -> Engine {
    let mut engine = Engine::new();
    engine.use_extension(control_flow);
    engine
}

fn if_block(block: &Block, compiler: &Compiler) -> Result<String> {
    let condition = block
        .arguments
        .get(0)
        .ok_or_else(|| CompileError::helper("if", "expected a condition"))?;
    let otherwise = match block.section("else") {
        Some(section) => compiler.compile_section(section)?,
        None => Compiler::string_literal(""),
    };
    Ok(format!(
        "({}?{}:{})",
        compiler.generate_expression(condition),
        compiler.compile_section(&block.main_section)?,
        otherwise
    ))
}

fn switch_block(block: &Block, compiler: &Compiler) -> Result<String> {
    let subject = block
        .arguments
        .get(0)
        .ok_or_else(|| CompileError::helper("switch", "expected a subject"))?;
    let subject = compiler.generate_expression(subject);

    let mut fallback = Compiler::string_literal("");
    let mut cases = Vec::new();
    for section in &block.sections {
        match section.name.as_deref() {
            Some("case") => {
                let label = section
                    .arguments
                    .get(0)
                    .ok_or_else(|| CompileError::helper("switch", "case without a label"))?;
                cases.push((
                    compiler.generate_expression(label),
                    compiler.compile_section(section)?,
                ));
            }
            _ => fallback = compiler.compile_section(section)?,
        }
    }

    Ok(cases
        .into_iter()
        .rev()
        .fold(fallback, |rest, (label, body)| {
            format!("({subject}=={label}?{body}:{rest})")
        }))
}

fn each_block(block: &Block, compiler: &Compiler) -> Result<String> {
    let Some(compact_tl::Value::Variable(list)) = block.arguments.get(0) else {
        return Err(CompileError::helper("each", "expected a list variable").into());
    };
    Ok(format!(
        "{}.map(function(){{return {};}}).join(\"\")",
        compiler.generate_variable(list),
        compiler.compile_section(&block.main_section)?
    ))
}

fn json_helper(call: &Call, compiler: &Compiler) -> Result<String> {
    match call.arguments.positional.as_slice() {
        [value] => Ok(format!(
            "JSON.stringify({})",
            compiler.generate_expression(value)
        )),
        _ => Err(CompileError::helper("json", "expected exactly one argument").into()),
    }
}
