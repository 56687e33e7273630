//! The program tree the pipeline stages work on.
//!
//! Blocks, addresses, variables and symbols live in arenas owned by
//! [`Program`] and refer to each other by index.  Several holders
//! share one [`AddressInfo`] (for example an instruction and the
//! labels attached to it), so that when the encoder places the
//! instruction, every reference to any of its labels sees the
//! placement.
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use super::collections::{ErrorList, OneOrMore};
use super::error::{AssembleError, ErrorKind};
use super::layout::SlotRef;
use super::source::AssemblePosition;
use super::value::Value;

pub(crate) mod build;

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub(crate) struct $name(usize);

        impl From<usize> for $name {
            fn from(n: usize) -> $name {
                $name(n)
            }
        }

        impl $name {
            pub(crate) fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(BlockId);
arena_id!(AddressId);
arena_id!(VariableId);
arena_id!(SymbolId);

/// Where something was placed.  `from` and `to` are inclusive and
/// are word addresses or byte addresses depending on the target
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct AddressInfo {
    pub(crate) memory_slot: u32,
    pub(crate) from: u32,
    pub(crate) to: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LabelTarget {
    Address(AddressId),
    /// Labels on blocks (and on macrocalls, which become blocks)
    /// resolve to the placement of the block.
    Block(BlockId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Label {
    pub(crate) name: String,
    pub(crate) target: LabelTarget,
    pub(crate) position: AssemblePosition,
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Operand {
    pub(crate) value: Value,
    pub(crate) address: AddressId,
    pub(crate) labels: Vec<Label>,
    pub(crate) position: AssemblePosition,
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            write!(f, "{label} ")?;
        }
        self.value.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JumpAttribute {
    pub(crate) mnemonic: String,
    pub(crate) target: Value,
    pub(crate) position: AssemblePosition,
}

impl Display for JumpAttribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, " -< {} {}", self.mnemonic, self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Instruction {
    pub(crate) mnemonic: String,
    pub(crate) operands: Vec<Operand>,
    pub(crate) jump: Option<JumpAttribute>,
    pub(crate) labels: Vec<Label>,
    pub(crate) address: AddressId,
    pub(crate) debug_text: Option<String>,
    pub(crate) position: AssemblePosition,
}

impl Instruction {
    /// The text stored in the debug record of the instruction's
    /// first word.
    pub(crate) fn annotation(&self) -> String {
        format!("{} ({})", self, self.position.location_text())
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            write!(f, "{label} ")?;
        }
        write!(f, "{}  ", self.mnemonic)?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            operand.fmt(f)?;
        }
        if let Some(jump) = &self.jump {
            jump.fmt(f)?;
        }
        f.write_str(";")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Macrocall {
    pub(crate) name: String,
    pub(crate) operands: Vec<Value>,
    /// Labels are bound to the block the call expands into.
    pub(crate) labels: Vec<String>,
    pub(crate) position: AssemblePosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Statement {
    Instruction(Instruction),
    Macrocall(Macrocall),
    Block(BlockId),
}

/// Identifies an instruction by the block holding it and its index
/// among the block's statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InstructionRef {
    pub(crate) block: BlockId,
    pub(crate) statement: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum IdentifierKind {
    /// Labels, blocks and variables.
    Address,
    Symbol,
}

/// The result of an identifier search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Found {
    Address(AddressId),
    Symbol(SymbolId),
    /// A block, or a label on one; its address is that of its first
    /// instruction.
    Block(BlockId),
}

impl Found {
    pub(crate) fn kind(&self) -> IdentifierKind {
        match self {
            Found::Address(_) | Found::Block(_) => IdentifierKind::Address,
            Found::Symbol(_) => IdentifierKind::Symbol,
        }
    }
}

impl From<LabelTarget> for Found {
    fn from(target: LabelTarget) -> Found {
        match target {
            LabelTarget::Address(a) => Found::Address(a),
            LabelTarget::Block(b) => Found::Block(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Plain,
    Section {
        startup: bool,
        /// Filled in once references are resolved.
        all_instructions: Vec<InstructionRef>,
    },
    MacroDefinition {
        arguments: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    pub(crate) name: String,
    pub(crate) position: AssemblePosition,
    pub(crate) parent: Option<BlockId>,
    pub(crate) kind: BlockKind,
    pub(crate) statements: Vec<Statement>,
    pub(crate) variables: Vec<VariableId>,
    pub(crate) symbols: Vec<SymbolId>,
    pub(crate) labels: Vec<Label>,
    pub(crate) macro_definitions: Vec<BlockId>,
    pub(crate) cache: BTreeMap<IdentifierKind, BTreeMap<String, Found>>,
}

impl Block {
    pub(crate) fn is_section(&self) -> bool {
        matches!(self.kind, BlockKind::Section { .. })
    }

    pub(crate) fn is_startup(&self) -> bool {
        matches!(self.kind, BlockKind::Section { startup: true, .. })
    }

    pub(crate) fn all_instructions(&self) -> &[InstructionRef] {
        match &self.kind {
            BlockKind::Section {
                all_instructions, ..
            } => all_instructions,
            _ => &[],
        }
    }

    /// Child blocks, in statement order.
    pub(crate) fn child_blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.statements.iter().filter_map(|stmt| match stmt {
            Statement::Block(b) => Some(*b),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Variable {
    pub(crate) name: String,
    pub(crate) is_constant: bool,
    /// False for variables declared without an initial value; these
    /// can share storage with other such variables.
    pub(crate) needs_initialization: bool,
    /// One element for a scalar, more for an array.
    pub(crate) initial_values: Vec<Value>,
    pub(crate) position_hint: i32,
    pub(crate) address: AddressId,
    pub(crate) block: BlockId,
    pub(crate) position: AssemblePosition,
    /// Storage of each element, assigned by the layout stage.
    pub(crate) slots: Vec<SlotRef>,
}

impl Variable {
    pub(crate) fn len(&self) -> usize {
        self.initial_values.len()
    }

    pub(crate) fn is_array(&self) -> bool {
        self.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Symbol {
    pub(crate) name: String,
    pub(crate) content: Value,
    pub(crate) block: BlockId,
    pub(crate) position: AssemblePosition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Program {
    blocks: Vec<Block>,
    addresses: Vec<AddressInfo>,
    variables: Vec<Variable>,
    symbols: Vec<Symbol>,
    sections: Vec<BlockId>,
}

impl Program {
    pub(crate) fn sections(&self) -> &[BlockId] {
        &self.sections
    }

    pub(crate) fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    pub(crate) fn address(&self, id: AddressId) -> &AddressInfo {
        &self.addresses[id.0]
    }

    pub(crate) fn address_mut(&mut self, id: AddressId) -> &mut AddressInfo {
        &mut self.addresses[id.0]
    }

    pub(crate) fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0]
    }

    pub(crate) fn variable_mut(&mut self, id: VariableId) -> &mut Variable {
        &mut self.variables[id.0]
    }

    pub(crate) fn variable_ids(&self) -> impl Iterator<Item = VariableId> {
        (0..self.variables.len()).map(VariableId)
    }

    pub(crate) fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    pub(crate) fn new_address(&mut self) -> AddressId {
        self.addresses.push(AddressInfo::default());
        AddressId(self.addresses.len() - 1)
    }

    pub(crate) fn new_block(
        &mut self,
        name: String,
        parent: Option<BlockId>,
        kind: BlockKind,
        position: AssemblePosition,
    ) -> BlockId {
        let is_section = matches!(kind, BlockKind::Section { .. });
        self.blocks.push(Block {
            name,
            position,
            parent,
            kind,
            statements: Vec::new(),
            variables: Vec::new(),
            symbols: Vec::new(),
            labels: Vec::new(),
            macro_definitions: Vec::new(),
            cache: BTreeMap::new(),
        });
        let id = BlockId(self.blocks.len() - 1);
        if is_section {
            self.sections.push(id);
        }
        id
    }

    pub(crate) fn new_plain_block(
        &mut self,
        name: String,
        parent: Option<BlockId>,
        position: AssemblePosition,
    ) -> BlockId {
        self.new_block(name, parent, BlockKind::Plain, position)
    }

    /// Add a variable to the arena and to the block named by
    /// `variable.block`.
    pub(crate) fn add_variable(&mut self, variable: Variable) -> VariableId {
        let block = variable.block;
        self.variables.push(variable);
        let id = VariableId(self.variables.len() - 1);
        self.block_mut(block).variables.push(id);
        id
    }

    /// Add a symbol to the arena and to the block named by
    /// `symbol.block`.
    pub(crate) fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let block = symbol.block;
        self.symbols.push(symbol);
        let id = SymbolId(self.symbols.len() - 1);
        self.block_mut(block).symbols.push(id);
        id
    }

    pub(crate) fn instruction(&self, r: InstructionRef) -> Option<&Instruction> {
        match self.block(r.block).statements.get(r.statement) {
            Some(Statement::Instruction(instruction)) => Some(instruction),
            _ => None,
        }
    }

    pub(crate) fn instruction_mut(&mut self, r: InstructionRef) -> Option<&mut Instruction> {
        match self.block_mut(r.block).statements.get_mut(r.statement) {
            Some(Statement::Instruction(instruction)) => Some(instruction),
            _ => None,
        }
    }

    /// The placement of a block is that of its first statement.  A
    /// block which is empty or begins with an unexpanded macrocall
    /// has none.
    pub(crate) fn placement_of(&self, block: BlockId) -> Option<AddressId> {
        let mut current = block;
        loop {
            match self.block(current).statements.first()? {
                Statement::Instruction(instruction) => return Some(instruction.address),
                Statement::Block(inner) => current = *inner,
                Statement::Macrocall(_) => return None,
            }
        }
    }

    /// The address an identifier search result stands for.
    pub(crate) fn placement_of_found(&self, found: Found) -> Option<AddressId> {
        match found {
            Found::Address(a) => Some(a),
            Found::Block(b) => self.placement_of(b),
            Found::Symbol(_) => None,
        }
    }

    /// The dotted names of the enclosing blocks, outermost first,
    /// for example `main.loop.`.
    pub(crate) fn block_path_prefix(&self, block: BlockId) -> String {
        let mut names: Vec<&str> = Vec::new();
        let mut current = Some(block);
        while let Some(id) = current {
            let b = self.block(id);
            names.push(b.name.as_str());
            current = b.parent;
        }
        let mut prefix = String::new();
        for name in names.into_iter().rev() {
            prefix.push_str(name);
            prefix.push('.');
        }
        prefix
    }

    /// Gather the instructions of `section`, including those of
    /// nested blocks, in program order, and record them in the
    /// section.
    pub(crate) fn collect_all_instructions(
        &mut self,
        section: BlockId,
    ) -> Result<(), AssembleError> {
        let mut found: Vec<InstructionRef> = Vec::new();
        self.collect_instructions(section, &mut found)?;
        if let BlockKind::Section {
            all_instructions, ..
        } = &mut self.block_mut(section).kind
        {
            *all_instructions = found;
        }
        Ok(())
    }

    fn collect_instructions(
        &self,
        block: BlockId,
        output: &mut Vec<InstructionRef>,
    ) -> Result<(), AssembleError> {
        for (statement, stmt) in self.block(block).statements.iter().enumerate() {
            match stmt {
                Statement::Instruction(_) => output.push(InstructionRef { block, statement }),
                Statement::Block(inner) => self.collect_instructions(*inner, output)?,
                Statement::Macrocall(call) => {
                    return Err(AssembleError::new(
                        ErrorKind::UnexpandedMacrocall,
                        "There is macrocall not expanded.".to_string(),
                        call.position.clone(),
                    )
                    .with_title("Instruction collecting"));
                }
            }
        }
        Ok(())
    }

    /// All instructions of all sections, startup section first.
    ///
    /// # Errors
    ///
    /// Fails if more than one section is marked as the startup
    /// section.
    pub(crate) fn instructions_in_placement_order(
        &self,
    ) -> Result<Vec<InstructionRef>, AssembleError> {
        let startup: Vec<BlockId> = self
            .sections
            .iter()
            .copied()
            .filter(|s| self.block(*s).is_startup())
            .collect();
        if let [first, second, ..] = startup.as_slice() {
            return Err(AssembleError::new(
                ErrorKind::MultipleStartupSections,
                format!(
                    "More than 2 sections are marked as startup sections. \"{}\" and \"{}\" are so.",
                    self.block(*first).name,
                    self.block(*second).name
                ),
                self.block(*second).position.clone(),
            ));
        }
        let mut order: Vec<BlockId> = startup;
        order.extend(
            self.sections
                .iter()
                .copied()
                .filter(|s| !self.block(*s).is_startup()),
        );
        Ok(order
            .into_iter()
            .flat_map(|s| self.block(s).all_instructions().iter().copied())
            .collect())
    }
}

/// Run `check` on every section, collecting the errors of all of
/// them.
pub(crate) fn for_each_section<F>(
    program: &mut Program,
    mut check: F,
) -> Result<(), OneOrMore<AssembleError>>
where
    F: FnMut(&mut Program, BlockId, &mut ErrorList<AssembleError>),
{
    let mut errors: ErrorList<AssembleError> = ErrorList::default();
    let sections: Vec<BlockId> = program.sections.clone();
    for section in sections {
        check(program, section, &mut errors);
    }
    errors.into_result(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruction(program: &mut Program, mnemonic: &str) -> Instruction {
        let address = program.new_address();
        Instruction {
            mnemonic: mnemonic.to_string(),
            operands: Vec::new(),
            jump: None,
            labels: Vec::new(),
            address,
            debug_text: None,
            position: AssemblePosition::raw(1, 1),
        }
    }

    fn section(program: &mut Program, name: &str, startup: bool) -> BlockId {
        program.new_block(
            name.to_string(),
            None,
            BlockKind::Section {
                startup,
                all_instructions: Vec::new(),
            },
            AssemblePosition::Unknown,
        )
    }

    #[test]
    fn test_placement_follows_first_statement() {
        let mut program = Program::default();
        let main = section(&mut program, "main", true);
        let outer = program.new_plain_block("outer".to_string(), Some(main), Default::default());
        let inner = program.new_plain_block("inner".to_string(), Some(outer), Default::default());
        assert_eq!(program.placement_of(outer), None);

        program
            .block_mut(outer)
            .statements
            .push(Statement::Block(inner));
        let instr = instruction(&mut program, "sng4");
        let address = instr.address;
        program
            .block_mut(inner)
            .statements
            .push(Statement::Instruction(instr));
        assert_eq!(program.placement_of(outer), Some(address));
        assert_eq!(program.placement_of_found(Found::Block(inner)), Some(address));

        let empty = program.new_plain_block("empty".to_string(), Some(main), Default::default());
        program
            .block_mut(empty)
            .statements
            .push(Statement::Macrocall(Macrocall {
                name: "m".to_string(),
                operands: Vec::new(),
                labels: Vec::new(),
                position: Default::default(),
            }));
        assert_eq!(program.placement_of(empty), None);
    }

    #[test]
    fn test_block_path_prefix() {
        let mut program = Program::default();
        let main = section(&mut program, "main", false);
        let lp = program.new_plain_block("loop".to_string(), Some(main), Default::default());
        assert_eq!(program.block_path_prefix(main), "main.");
        assert_eq!(program.block_path_prefix(lp), "main.loop.");
    }

    #[test]
    fn test_instruction_text() {
        let mut program = Program::default();
        let mut instr = instruction(&mut program, "sub");
        instr.labels.push(Label {
            name: "top".to_string(),
            target: LabelTarget::Address(instr.address),
            position: Default::default(),
        });
        for (i, v) in [1, 2].into_iter().enumerate() {
            let address = program.new_address();
            instr.operands.push(Operand {
                value: Value::Integer(v),
                address,
                labels: if i == 1 {
                    vec![Label {
                        name: "b".to_string(),
                        target: LabelTarget::Address(address),
                        position: Default::default(),
                    }]
                } else {
                    Vec::new()
                },
                position: Default::default(),
            });
        }
        instr.jump = Some(JumpAttribute {
            mnemonic: "jneg".to_string(),
            target: Value::Reference {
                name: "top".to_string(),
                index: 0,
                resolved: None,
            },
            position: Default::default(),
        });
        assert_eq!(instr.to_string(), "top: sub  1,b: 2 -< jneg &top;");
        assert_eq!(
            instr.annotation(),
            "top: sub  1,b: 2 -< jneg &top; (line: 1,col: 1)"
        );
    }

    #[test]
    fn test_collect_reports_unexpanded_macrocalls() {
        let mut program = Program::default();
        let main = section(&mut program, "main", true);
        let instr = instruction(&mut program, "sng4");
        program
            .block_mut(main)
            .statements
            .push(Statement::Instruction(instr));
        assert!(program.collect_all_instructions(main).is_ok());
        assert_eq!(
            program.block(main).all_instructions(),
            &[InstructionRef {
                block: main,
                statement: 0
            }]
        );

        program
            .block_mut(main)
            .statements
            .push(Statement::Macrocall(Macrocall {
                name: "later".to_string(),
                operands: Vec::new(),
                labels: Vec::new(),
                position: AssemblePosition::raw(9, 2),
            }));
        let e = program
            .collect_all_instructions(main)
            .expect_err("macrocall should be reported");
        assert_eq!(e.kind, ErrorKind::UnexpandedMacrocall);
        assert_eq!(e.detail, "There is macrocall not expanded.");
    }

    #[test]
    fn test_startup_section_goes_first() {
        let mut program = Program::default();
        let lib = section(&mut program, "lib", false);
        let main = section(&mut program, "main", true);
        for s in [lib, main] {
            let instr = instruction(&mut program, "sng4");
            program
                .block_mut(s)
                .statements
                .push(Statement::Instruction(instr));
            program
                .collect_all_instructions(s)
                .expect("no macrocalls");
        }
        let order = program
            .instructions_in_placement_order()
            .expect("one startup section");
        assert_eq!(order[0].block, main);
        assert_eq!(order[1].block, lib);

        let other = section(&mut program, "other", true);
        let e = program
            .instructions_in_placement_order()
            .expect_err("two startup sections");
        assert_eq!(e.kind, ErrorKind::MultipleStartupSections);
        assert_eq!(
            e.detail,
            "More than 2 sections are marked as startup sections. \"main\" and \"other\" are so."
        );
        assert_eq!(program.block(other).name, "other");
    }
}
