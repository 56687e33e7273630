//! Construction of the [`Program`] arena from the parser's tree.
use tracing::{event, Level};

use super::super::ast::{
    position_of, BlockBody, MacroNode, OperandNode, SectionNode, SourceFile, StatementNode,
    SymbolNode, VariableNode,
};
use super::super::collections::{ErrorList, OneOrMore};
use super::super::error::{AssembleError, ErrorKind};
use super::super::value::Value;
use super::{
    BlockId, BlockKind, Instruction, JumpAttribute, Label, LabelTarget, Macrocall, Operand,
    Program, Statement, Symbol, Variable,
};

/// Build the program tree.  All array length errors are reported
/// together.
pub(crate) fn build_program(source: &SourceFile) -> Result<Program, OneOrMore<AssembleError>> {
    let mut program = Program::default();
    let mut errors: ErrorList<AssembleError> = ErrorList::default();
    for section in &source.sections {
        build_section(&mut program, section, &mut errors);
    }
    event!(
        Level::DEBUG,
        "built program tree with {} sections and {} blocks",
        program.sections.len(),
        program.blocks.len()
    );
    errors.into_result(program)
}

fn build_section(program: &mut Program, node: &SectionNode, errors: &mut ErrorList<AssembleError>) {
    let id = program.new_block(
        node.name.clone(),
        None,
        BlockKind::Section {
            startup: node.startup,
            all_instructions: Vec::new(),
        },
        position_of(node.position.as_ref()),
    );
    fill_block(program, id, &node.body, errors);
}

fn fill_block(
    program: &mut Program,
    block: BlockId,
    body: &BlockBody,
    errors: &mut ErrorList<AssembleError>,
) {
    for v in &body.variables {
        if let Some(variable) = errors.record(build_variable(program, block, v)) {
            program.add_variable(variable);
        }
    }
    for s in &body.symbols {
        program.add_symbol(build_symbol(block, s));
    }
    for m in &body.macros {
        let def = build_macro(program, block, m, errors);
        program.block_mut(block).macro_definitions.push(def);
    }
    for stmt in &body.statements {
        let statement = build_statement(program, block, stmt, errors);
        program.block_mut(block).statements.push(statement);
    }
}

fn build_macro(
    program: &mut Program,
    parent: BlockId,
    node: &MacroNode,
    errors: &mut ErrorList<AssembleError>,
) -> BlockId {
    let def = program.new_block(
        node.name.clone(),
        Some(parent),
        BlockKind::MacroDefinition {
            arguments: node.arguments.clone(),
        },
        position_of(node.position.as_ref()),
    );
    fill_block(program, def, &node.body, errors);
    def
}

fn build_symbol(block: BlockId, node: &SymbolNode) -> Symbol {
    Symbol {
        name: node.name.clone(),
        content: Value::from(&node.value),
        block,
        position: position_of(node.position.as_ref()),
    }
}

fn build_variable(
    program: &mut Program,
    block: BlockId,
    node: &VariableNode,
) -> Result<Variable, AssembleError> {
    let position = position_of(node.position.as_ref());
    let what = if node.constant { "Constant" } else { "Variable" };
    let length_error = |detail: String| {
        AssembleError::new(ErrorKind::ArrayLengthMismatch, detail, position.clone())
            .with_title(what)
    };
    let (initial_values, needs_initialization): (Vec<Value>, bool) =
        match (&node.values, node.length) {
            (None, None) => (vec![Value::ZERO], false),
            (values, length) => {
                let mut initial: Vec<Value> = values
                    .iter()
                    .flatten()
                    .map(Value::from)
                    .collect();
                let length: i32 = match length {
                    Some(n) => n,
                    None => i32::try_from(initial.len()).unwrap_or(i32::MAX),
                };
                if length <= 0 {
                    return Err(length_error(format!("{what} array length is invalid.")));
                }
                let length = length as usize;
                if length < initial.len() {
                    return Err(length_error(format!(
                        "{what} array length is too small for its initial values."
                    )));
                }
                initial.resize(length, Value::ZERO);
                (initial, true)
            }
        };
    Ok(Variable {
        name: node.name.clone(),
        is_constant: node.constant,
        needs_initialization: needs_initialization || node.constant,
        initial_values,
        position_hint: node.position_hint,
        address: program.new_address(),
        block,
        position,
        slots: Vec::new(),
    })
}

fn build_operand(program: &mut Program, node: &OperandNode) -> Operand {
    let address = program.new_address();
    let position = position_of(node.position.as_ref());
    Operand {
        value: Value::from(&node.value),
        address,
        labels: node
            .labels
            .iter()
            .map(|name| Label {
                name: name.clone(),
                target: LabelTarget::Address(address),
                position: position.clone(),
            })
            .collect(),
        position,
    }
}

fn build_statement(
    program: &mut Program,
    block: BlockId,
    node: &StatementNode,
    errors: &mut ErrorList<AssembleError>,
) -> Statement {
    match node {
        StatementNode::Instruction {
            mnemonic,
            operands,
            jump,
            labels,
            debug_text,
            position,
        } => {
            let address = program.new_address();
            let position = position_of(position.as_ref());
            let operands: Vec<Operand> = operands
                .iter()
                .map(|op| build_operand(program, op))
                .collect();
            Statement::Instruction(Instruction {
                mnemonic: mnemonic.clone(),
                operands,
                jump: jump.as_ref().map(|j| JumpAttribute {
                    mnemonic: j.mnemonic.clone(),
                    target: Value::from(&j.target),
                    position: position_of(j.position.as_ref()),
                }),
                labels: labels
                    .iter()
                    .map(|name| Label {
                        name: name.clone(),
                        target: LabelTarget::Address(address),
                        position: position.clone(),
                    })
                    .collect(),
                address,
                debug_text: debug_text.clone(),
                position,
            })
        }
        StatementNode::Macrocall {
            name,
            operands,
            labels,
            position,
        } => Statement::Macrocall(Macrocall {
            name: name.clone(),
            operands: operands.iter().map(Value::from).collect(),
            labels: labels.clone(),
            position: position_of(position.as_ref()),
        }),
        StatementNode::Block {
            name,
            labels,
            body,
            position,
        } => {
            let position = position_of(position.as_ref());
            let child = program.new_plain_block(name.clone(), Some(block), position.clone());
            program.block_mut(child).labels = labels
                .iter()
                .map(|label| Label {
                    name: label.clone(),
                    target: LabelTarget::Block(child),
                    position: position.clone(),
                })
                .collect();
            fill_block(program, child, body, errors);
            Statement::Block(child)
        }
    }
}
