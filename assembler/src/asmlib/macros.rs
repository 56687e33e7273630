//! Macro expansion.
//!
//! Each macrocall is replaced by a new block holding a copy of the
//! body of the macro definition, with the actual arguments
//! substituted for uses of the formal arguments.
use tracing::{event, span, Level};

use super::collections::{ErrorList, OneOrMore};
use super::error::{AssembleError, ErrorKind};
use super::program::{
    for_each_section, BlockId, BlockKind, Instruction, Label, LabelTarget, Macrocall, Operand,
    Program, Statement,
};
use super::value::Value;

/// Expansions nested deeper than this are taken to be runaway
/// recursion.
pub(crate) const MAX_EXPANSION_DEPTH: usize = 256;

/// Expand every macrocall in every section.
///
/// # Errors
///
/// All the macrocalls which could not be expanded are reported.
pub(crate) fn expand_all(program: &mut Program) -> Result<(), OneOrMore<AssembleError>> {
    let span = span!(Level::INFO, "expand macros");
    let _enter = span.enter();
    for_each_section(program, |program, section, errors| {
        expand_block(program, section, 0, errors);
    })
}

fn expand_block(
    program: &mut Program,
    block: BlockId,
    depth: usize,
    errors: &mut ErrorList<AssembleError>,
) {
    let mut index = 0;
    while index < program.block(block).statements.len() {
        match &program.block(block).statements[index] {
            Statement::Instruction(_) => (),
            Statement::Block(inner) => {
                let inner = *inner;
                expand_block(program, inner, depth, errors);
            }
            Statement::Macrocall(call) => {
                let call = call.clone();
                if let Some(expanded) = errors.record(expand_call(program, block, &call, depth)) {
                    program.block_mut(block).statements[index] = Statement::Block(expanded);
                    // The body may itself begin with (or consist of)
                    // macrocalls.
                    expand_block(program, expanded, depth + 1, errors);
                }
            }
        }
        index += 1;
    }
}

/// Find the definition of the macro `name` as seen from `block`:
/// first the definitions in `block` and its enclosing blocks, then
/// those at the top level of every section.
pub(crate) fn find_macro(program: &Program, block: BlockId, name: &str) -> Option<BlockId> {
    let defined_in = |b: BlockId| -> Option<BlockId> {
        program
            .block(b)
            .macro_definitions
            .iter()
            .copied()
            .find(|def| program.block(*def).name == name)
    };
    let mut current = Some(block);
    while let Some(b) = current {
        if let Some(def) = defined_in(b) {
            return Some(def);
        }
        current = program.block(b).parent;
    }
    program.sections().iter().copied().find_map(defined_in)
}

fn expand_call(
    program: &mut Program,
    caller: BlockId,
    call: &Macrocall,
    depth: usize,
) -> Result<BlockId, AssembleError> {
    let Some(definition) = find_macro(program, caller, &call.name) else {
        return Err(AssembleError::new(
            ErrorKind::MacroNotFound,
            format!("Macro definition '{}' not found.", call.name),
            call.position.clone(),
        ));
    };
    let arguments: Vec<String> = match &program.block(definition).kind {
        BlockKind::MacroDefinition { arguments } => arguments.clone(),
        _ => Vec::new(),
    };
    if arguments.len() != call.operands.len() {
        return Err(AssembleError::new(
            ErrorKind::MacroArgumentMismatch,
            format!(
                "Macro '{}' takes {} arguments, but {} were given.",
                call.name,
                arguments.len(),
                call.operands.len()
            ),
            call.position.clone(),
        ));
    }
    if depth >= MAX_EXPANSION_DEPTH {
        return Err(AssembleError::new(
            ErrorKind::MacroRecursionLimit,
            format!(
                "Macro '{}' is expanded more than {MAX_EXPANSION_DEPTH} levels deep.",
                call.name
            ),
            call.position.clone(),
        ));
    }

    let expanded = program.new_plain_block(
        format!("{}_expanded", call.name),
        Some(caller),
        call.position.clone(),
    );
    copy_contents(program, definition, expanded);
    substitute(program, expanded, &arguments, &call.operands);
    let labels: Vec<Label> = call
        .labels
        .iter()
        .map(|name| Label {
            name: name.clone(),
            target: LabelTarget::Block(expanded),
            position: call.position.clone(),
        })
        .collect();
    program.block_mut(expanded).labels.extend(labels);
    event!(
        Level::DEBUG,
        "expanded macrocall '{}' at {} into block {}",
        call.name,
        call.position.location_text(),
        program.block_path_prefix(expanded)
    );
    Ok(expanded)
}

/// Copy the variables, symbols, nested macro definitions and
/// statements of `source` into `destination`.  Each copy gets its own
/// storage, and labels are bound to the copies.
fn copy_contents(program: &mut Program, source: BlockId, destination: BlockId) {
    let src = program.block(source).clone();
    for v in src.variables {
        let mut variable = program.variable(v).clone();
        variable.address = program.new_address();
        variable.block = destination;
        variable.slots.clear();
        program.add_variable(variable);
    }
    for s in src.symbols {
        let mut symbol = program.symbol(s).clone();
        symbol.block = destination;
        program.add_symbol(symbol);
    }
    for def in src.macro_definitions {
        let copy = copy_block(program, def, destination);
        program.block_mut(destination).macro_definitions.push(copy);
    }
    for statement in &src.statements {
        let copy = copy_statement(program, statement, destination);
        program.block_mut(destination).statements.push(copy);
    }
}

fn copy_block(program: &mut Program, source: BlockId, parent: BlockId) -> BlockId {
    let (name, kind, position, labels) = {
        let b = program.block(source);
        (
            b.name.clone(),
            b.kind.clone(),
            b.position.clone(),
            b.labels.clone(),
        )
    };
    let copy = program.new_block(name, Some(parent), kind, position);
    program.block_mut(copy).labels = labels
        .into_iter()
        .map(|label| Label {
            target: LabelTarget::Block(copy),
            ..label
        })
        .collect();
    copy_contents(program, source, copy);
    copy
}

fn relabel(labels: &[Label], target: LabelTarget) -> Vec<Label> {
    labels
        .iter()
        .map(|label| Label {
            target,
            ..label.clone()
        })
        .collect()
}

fn copy_statement(program: &mut Program, statement: &Statement, parent: BlockId) -> Statement {
    match statement {
        Statement::Instruction(instruction) => {
            let address = program.new_address();
            let operands: Vec<Operand> = instruction
                .operands
                .iter()
                .map(|operand| {
                    let address = program.new_address();
                    Operand {
                        value: operand.value.clone(),
                        address,
                        labels: relabel(&operand.labels, LabelTarget::Address(address)),
                        position: operand.position.clone(),
                    }
                })
                .collect();
            Statement::Instruction(Instruction {
                mnemonic: instruction.mnemonic.clone(),
                operands,
                jump: instruction.jump.clone(),
                labels: relabel(&instruction.labels, LabelTarget::Address(address)),
                address,
                debug_text: instruction.debug_text.clone(),
                position: instruction.position.clone(),
            })
        }
        Statement::Macrocall(call) => Statement::Macrocall(call.clone()),
        Statement::Block(inner) => Statement::Block(copy_block(program, *inner, parent)),
    }
}

fn substitute_value(value: &mut Value, formals: &[String], actuals: &[Value]) {
    if let Some(i) = formals.iter().position(|f| value.matches_argument(f)) {
        *value = actuals[i].clone();
    }
}

/// Replace uses of the formal arguments throughout `block`, including
/// nested blocks and macro definitions.
fn substitute(program: &mut Program, block: BlockId, formals: &[String], actuals: &[Value]) {
    let (variables, symbols, definitions) = {
        let b = program.block(block);
        (
            b.variables.clone(),
            b.symbols.clone(),
            b.macro_definitions.clone(),
        )
    };
    for v in variables {
        for value in &mut program.variable_mut(v).initial_values {
            substitute_value(value, formals, actuals);
        }
    }
    for s in symbols {
        substitute_value(&mut program.symbol_mut(s).content, formals, actuals);
    }
    let mut statements = std::mem::take(&mut program.block_mut(block).statements);
    for statement in &mut statements {
        match statement {
            Statement::Instruction(instruction) => {
                for operand in &mut instruction.operands {
                    substitute_value(&mut operand.value, formals, actuals);
                }
                if let Some(jump) = &mut instruction.jump {
                    substitute_value(&mut jump.target, formals, actuals);
                }
            }
            Statement::Macrocall(call) => {
                for operand in &mut call.operands {
                    substitute_value(operand, formals, actuals);
                }
            }
            Statement::Block(inner) => substitute(program, *inner, formals, actuals),
        }
    }
    program.block_mut(block).statements = statements;
    for def in definitions {
        substitute(program, def, formals, actuals);
    }
}

#[cfg(test)]
mod tests {
    use super::super::ast::SourceFile;
    use super::super::program::build::build_program;
    use super::*;

    fn program_from_json(input: &str) -> Program {
        let tree: SourceFile = serde_json::from_str(input).expect("valid program tree");
        build_program(&tree).expect("valid program")
    }

    fn count_macrocalls(program: &Program, block: BlockId) -> usize {
        program
            .block(block)
            .statements
            .iter()
            .map(|s| match s {
                Statement::Macrocall(_) => 1,
                Statement::Block(b) => count_macrocalls(program, *b),
                Statement::Instruction(_) => 0,
            })
            .sum()
    }

    const SWAP: &str = r#"{ "sections": [ { "name": "main", "startup": true, "body": {
        "macros": [ { "name": "clear", "arguments": ["x"], "body": {
            "symbols": [ { "name": "target", "value": { "kind": "reference", "name": "x" } } ],
            "statements": [
                { "kind": "instruction", "mnemonic": "sng4", "labels": ["again"],
                  "operands": [ { "value": { "kind": "reference", "name": "x" } },
                                { "value": { "kind": "reference", "name": "x" } },
                                { "value": { "kind": "reference", "name": "x" } } ] }
            ] } },
          { "name": "twice", "arguments": ["y"], "body": { "statements": [
                { "kind": "macrocall", "name": "clear",
                  "operands": [ { "kind": "reference", "name": "y" } ] },
                { "kind": "macrocall", "name": "clear",
                  "operands": [ { "kind": "reference", "name": "y" } ] }
            ] } } ],
        "variables": [ { "name": "v" } ],
        "statements": [
            { "kind": "macrocall", "name": "twice", "labels": ["start"],
              "operands": [ { "kind": "reference", "name": "v" } ] }
        ] } } ] }"#;

    #[test]
    fn test_expansion_leaves_no_macrocalls() {
        let mut program = program_from_json(SWAP);
        expand_all(&mut program).expect("expansion succeeds");
        let main = program.sections()[0];
        assert_eq!(count_macrocalls(&program, main), 0);

        let Some(Statement::Block(outer)) = program.block(main).statements.first() else {
            panic!("macrocall should have become a block");
        };
        let outer = program.block(*outer);
        assert_eq!(outer.name, "twice_expanded");
        assert_eq!(outer.parent, Some(main));
        assert_eq!(outer.labels[0].name, "start");
        let inner: Vec<BlockId> = outer.child_blocks().collect();
        assert_eq!(inner.len(), 2);
        for b in inner {
            let block = program.block(b);
            assert_eq!(block.name, "clear_expanded");
            let Some(Statement::Instruction(instr)) = block.statements.first() else {
                panic!("expected the body of clear");
            };
            for operand in &instr.operands {
                assert!(operand.value.matches_argument("v"));
            }
            assert_eq!(
                instr.labels[0].target,
                LabelTarget::Address(instr.address)
            );
            let symbol = program.symbol(block.symbols[0]);
            assert!(symbol.content.matches_argument("v"));
        }
    }

    #[test]
    fn test_copies_do_not_share_storage() {
        let mut program = program_from_json(SWAP);
        expand_all(&mut program).expect("expansion succeeds");
        let main = program.sections()[0];
        let Some(Statement::Block(outer)) = program.block(main).statements.first() else {
            panic!("expected an expanded block");
        };
        let addresses: Vec<_> = program
            .block(*outer)
            .child_blocks()
            .filter_map(|b| program.placement_of(b))
            .collect();
        assert_eq!(addresses.len(), 2);
        assert_ne!(addresses[0], addresses[1]);
        assert_eq!(program.placement_of(*outer), Some(addresses[0]));
    }

    #[test]
    fn test_missing_macro() {
        let mut program = program_from_json(
            r#"{ "sections": [ { "name": "main", "body": { "statements": [
                { "kind": "macrocall", "name": "nothere",
                  "position": { "line": 3, "column": 1 } } ] } } ] }"#,
        );
        let errors = expand_all(&mut program).expect_err("no such macro");
        let e = errors.first();
        assert_eq!(e.kind, ErrorKind::MacroNotFound);
        assert_eq!(e.title, "Macro expanding");
        assert_eq!(e.detail, "Macro definition 'nothere' not found.");
        assert_eq!(e.position.location_text(), "line: 3,col: 1");
    }

    #[test]
    fn test_argument_count_must_match() {
        let mut program = program_from_json(
            r#"{ "sections": [ { "name": "main", "body": {
                "macros": [ { "name": "m", "arguments": ["a", "b"] } ],
                "statements": [ { "kind": "macrocall", "name": "m",
                    "operands": [ { "kind": "integer", "value": 1 } ] } ] } } ] }"#,
        );
        let errors = expand_all(&mut program).expect_err("wrong argument count");
        assert_eq!(errors.first().kind, ErrorKind::MacroArgumentMismatch);
    }

    #[test]
    fn test_recursion_is_bounded() {
        let mut program = program_from_json(
            r#"{ "sections": [ { "name": "main", "body": {
                "macros": [ { "name": "forever", "body": { "statements": [
                    { "kind": "macrocall", "name": "forever" } ] } } ],
                "statements": [ { "kind": "macrocall", "name": "forever" } ] } } ] }"#,
        );
        let errors = expand_all(&mut program).expect_err("runaway recursion");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().kind, ErrorKind::MacroRecursionLimit);
    }

    #[test]
    fn test_macros_of_other_sections_are_visible() {
        let mut program = program_from_json(
            r#"{ "sections": [
                { "name": "main", "body": { "statements": [
                    { "kind": "block", "name": "b", "body": { "statements": [
                        { "kind": "macrocall", "name": "lib_op" } ] } } ] } },
                { "name": "lib", "body": { "macros": [ { "name": "lib_op", "body": {
                    "statements": [ { "kind": "instruction", "mnemonic": "sng4" } ] } } ] } }
            ] }"#,
        );
        expand_all(&mut program).expect("lib_op is found in lib");
        let main = program.sections()[0];
        assert_eq!(count_macrocalls(&program, main), 0);
        assert!(program.placement_of(main).is_some());
    }

    #[test]
    fn test_inner_definitions_shadow_outer_ones() {
        let program = program_from_json(
            r#"{ "sections": [ { "name": "main", "body": {
                "macros": [ { "name": "op" } ],
                "statements": [ { "kind": "block", "name": "b", "body": {
                    "macros": [ { "name": "op" } ] } } ] } } ] }"#,
        );
        let main = program.sections()[0];
        let inner = program
            .block(main)
            .child_blocks()
            .next()
            .expect("nested block");
        assert_eq!(
            find_macro(&program, inner, "op"),
            Some(program.block(inner).macro_definitions[0])
        );
        assert_eq!(
            find_macro(&program, main, "op"),
            Some(program.block(main).macro_definitions[0])
        );
        assert_eq!(find_macro(&program, main, "other"), None);
    }
}
