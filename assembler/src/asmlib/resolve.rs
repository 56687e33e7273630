//! Resolution of references to labels, blocks, variables and
//! symbols.
//!
//! A reference is looked up starting from the block which contains
//! it, then outwards through the enclosing blocks, and finally in
//! the sections of the program.  Each block remembers the results of
//! the searches which passed through it.
use tracing::{event, span, Level};

use super::collections::{ErrorList, OneOrMore};
use super::error::{AssembleError, ErrorKind};
use super::program::{
    for_each_section, BlockId, Found, IdentifierKind, Program, Statement, SymbolId, VariableId,
};
use super::source::AssemblePosition;
use super::value::{Referent, Value};

const REFERENCE_KINDS: [IdentifierKind; 2] = [IdentifierKind::Address, IdentifierKind::Symbol];

/// Resolve every reference outside macro definitions, then gather
/// the instructions of each section.
///
/// # Errors
///
/// Every reference which could not be resolved is reported, as is
/// any macrocall which is still present.
pub(crate) fn solve_all(program: &mut Program) -> Result<(), OneOrMore<AssembleError>> {
    let span = span!(Level::INFO, "resolve references");
    let _enter = span.enter();
    for_each_section(program, |program, section, errors| {
        let resolved = solve_block(program, section, errors);
        event!(
            Level::DEBUG,
            "resolved {resolved} references in section {}",
            program.block(section).name
        );
        errors.record(program.collect_all_instructions(section));
    })
}

/// Where in a block a value lives.
#[derive(Debug, Clone, Copy)]
enum Site {
    Operand { statement: usize, operand: usize },
    JumpTarget { statement: usize },
    Initializer { variable: VariableId, element: usize },
    SymbolContent(SymbolId),
}

fn value_at(program: &Program, block: BlockId, site: Site) -> Option<(&Value, &AssemblePosition)> {
    match site {
        Site::Operand { statement, operand } => match program.block(block).statements.get(statement)
        {
            Some(Statement::Instruction(instr)) => instr
                .operands
                .get(operand)
                .map(|op| (&op.value, &op.position)),
            _ => None,
        },
        Site::JumpTarget { statement } => match program.block(block).statements.get(statement) {
            Some(Statement::Instruction(instr)) => {
                instr.jump.as_ref().map(|j| (&j.target, &j.position))
            }
            _ => None,
        },
        Site::Initializer { variable, element } => {
            let v = program.variable(variable);
            v.initial_values.get(element).map(|value| (value, &v.position))
        }
        Site::SymbolContent(symbol) => {
            let s = program.symbol(symbol);
            Some((&s.content, &s.position))
        }
    }
}

fn value_at_mut(program: &mut Program, block: BlockId, site: Site) -> Option<&mut Value> {
    match site {
        Site::Operand { statement, operand } => {
            match program.block_mut(block).statements.get_mut(statement) {
                Some(Statement::Instruction(instr)) => {
                    instr.operands.get_mut(operand).map(|op| &mut op.value)
                }
                _ => None,
            }
        }
        Site::JumpTarget { statement } => {
            match program.block_mut(block).statements.get_mut(statement) {
                Some(Statement::Instruction(instr)) => instr.jump.as_mut().map(|j| &mut j.target),
                _ => None,
            }
        }
        Site::Initializer { variable, element } => {
            program.variable_mut(variable).initial_values.get_mut(element)
        }
        Site::SymbolContent(symbol) => Some(&mut program.symbol_mut(symbol).content),
    }
}

fn sites_of(program: &Program, block: BlockId) -> Vec<Site> {
    let b = program.block(block);
    let mut sites: Vec<Site> = Vec::new();
    for (statement, stmt) in b.statements.iter().enumerate() {
        if let Statement::Instruction(instr) = stmt {
            sites.extend((0..instr.operands.len()).map(|operand| Site::Operand { statement, operand }));
            if instr.jump.is_some() {
                sites.push(Site::JumpTarget { statement });
            }
        }
    }
    for variable in &b.variables {
        let len = program.variable(*variable).initial_values.len();
        sites.extend((0..len).map(|element| Site::Initializer {
            variable: *variable,
            element,
        }));
    }
    sites.extend(b.symbols.iter().copied().map(Site::SymbolContent));
    sites
}

/// Resolve the references in `block` and the blocks nested in it.
/// Returns the number of references resolved.
fn solve_block(program: &mut Program, block: BlockId, errors: &mut ErrorList<AssembleError>) -> usize {
    let mut resolved = 0;
    for site in sites_of(program, block) {
        let Some((name, position)) = value_at(program, block, site).and_then(|(value, position)| {
            value
                .unresolved_name()
                .map(|name| (name.to_string(), position.clone()))
        }) else {
            continue;
        };
        if let Some(referent) = errors.record(resolve_name(program, block, &name, &position)) {
            if let Some(Value::Reference { resolved: r, .. }) = value_at_mut(program, block, site) {
                *r = Some(referent);
                resolved += 1;
            }
        }
    }
    let children: Vec<BlockId> = program.block(block).child_blocks().collect();
    for child in children {
        resolved += solve_block(program, child, errors);
    }
    resolved
}

fn resolve_name(
    program: &mut Program,
    block: BlockId,
    name: &str,
    position: &AssemblePosition,
) -> Result<Referent, AssembleError> {
    match find_identifier(program, block, name, &REFERENCE_KINDS) {
        None => Err(AssembleError::new(
            ErrorKind::IdentifierNotFound,
            format!("Symbol '{name}' not found in or out of the block"),
            position.clone(),
        )),
        Some(Found::Symbol(symbol)) => Ok(Referent::ToSymbol(symbol)),
        Some(found) => match program.placement_of_found(found) {
            Some(address) => Ok(Referent::ToAddress(address)),
            None => Err(AssembleError::new(
                ErrorKind::IdentifierNotFound,
                format!("Reference target '{name}' has been found, but it has no placement"),
                position.clone(),
            )),
        },
    }
}

/// Look up `name`, accepting only results of the given kinds.
pub(crate) fn find_identifier(
    program: &mut Program,
    block: BlockId,
    name: &str,
    kinds: &[IdentifierKind],
) -> Option<Found> {
    search(program, block, name, kinds, true)
}

fn search(
    program: &mut Program,
    block: BlockId,
    name: &str,
    kinds: &[IdentifierKind],
    climb: bool,
) -> Option<Found> {
    let cached = kinds.iter().find_map(|kind| {
        program
            .block(block)
            .cache
            .get(kind)
            .and_then(|names| names.get(name))
            .copied()
    });
    if cached.is_some() {
        return cached;
    }

    let mut hit = search_locally(program, block, name, kinds);
    if hit.is_none() && climb {
        match program.block(block).parent {
            Some(parent) => {
                hit = search(program, parent, name, kinds, true);
            }
            None => {
                let sections: Vec<BlockId> = program
                    .sections()
                    .iter()
                    .copied()
                    .filter(|s| *s != block)
                    .collect();
                for section in sections {
                    hit = search(program, section, name, kinds, false);
                    if hit.is_some() {
                        break;
                    }
                }
            }
        }
    }
    let found = hit?;
    program
        .block_mut(block)
        .cache
        .entry(found.kind())
        .or_default()
        .insert(name.to_string(), found);
    Some(found)
}

/// Search the identifiers defined directly in `block`.
fn search_locally(
    program: &Program,
    block: BlockId,
    name: &str,
    kinds: &[IdentifierKind],
) -> Option<Found> {
    let b = program.block(block);
    let want_address = kinds.contains(&IdentifierKind::Address);
    let want_symbol = kinds.contains(&IdentifierKind::Symbol);
    if want_address {
        for stmt in &b.statements {
            match stmt {
                Statement::Instruction(instr) => {
                    let label = instr
                        .operands
                        .iter()
                        .flat_map(|op| op.labels.iter())
                        .chain(instr.labels.iter())
                        .find(|label| label.name == name);
                    if let Some(label) = label {
                        return Some(Found::from(label.target));
                    }
                }
                Statement::Block(inner) => {
                    let inner_block = program.block(*inner);
                    if inner_block.name == name {
                        return Some(Found::Block(*inner));
                    }
                    if let Some(label) = inner_block.labels.iter().find(|l| l.name == name) {
                        return Some(Found::from(label.target));
                    }
                }
                Statement::Macrocall(_) => (),
            }
        }
        if let Some(v) = b
            .variables
            .iter()
            .map(|v| program.variable(*v))
            .find(|v| v.name == name)
        {
            return Some(Found::Address(v.address));
        }
    }
    if want_symbol {
        if let Some(s) = b
            .symbols
            .iter()
            .copied()
            .find(|s| program.symbol(*s).name == name)
        {
            return Some(Found::Symbol(s));
        }
    }
    if want_address {
        if b.name == name {
            return Some(Found::Block(block));
        }
        if let Some(label) = b.labels.iter().find(|l| l.name == name) {
            return Some(Found::from(label.target));
        }
    }
    None
}
