//! Storage layout for variables and constants.
//!
//! Storage is divided into read-only slots (for constants) and
//! read-write slots (for variables).  Scalar constants with the same
//! value share a slot.  Variables declared without an initial value
//! can share storage with the uninitialized variables of sibling
//! blocks, since the program never uses two sibling blocks at the
//! same time.  So a block needs only as many such slots as its own
//! variables occupy plus the largest requirement of any of its
//! children.
//!
//! Variables with a position hint are kept out of the shared region.
//! Negative hints are placed before all other read-write slots (most
//! negative first) and positive hints after them.
use std::fmt::{self, Display, Formatter};

use tracing::{event, span, Level};

use super::collections::{ErrorList, OneOrMore};
use super::error::{AssembleError, ErrorKind};
use super::program::{AddressInfo, BlockId, Program, VariableId};
use super::value::{Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SlotRef {
    Readonly(usize),
    Readwrite(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReadonlySlot {
    pub(crate) content: Value,
    pub(crate) sharers: Vec<VariableId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReadwriteSlot {
    pub(crate) initial_value: Value,
    /// False for the shared region; its initial content does not
    /// matter.
    pub(crate) needs_initialization: bool,
    pub(crate) sharers: Vec<VariableId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LayoutResult {
    readonly: Vec<ReadonlySlot>,
    readwrite: Vec<ReadwriteSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Arrays,
    Scalars,
}

impl Pass {
    fn accepts(self, len: usize) -> bool {
        match self {
            Pass::Arrays => len > 1,
            Pass::Scalars => len == 1,
        }
    }
}

fn is_coalescible(program: &Program, v: VariableId) -> bool {
    let var = program.variable(v);
    var.position_hint == 0 && !var.is_constant && !var.needs_initialization
}

fn is_pinned(program: &Program, v: VariableId) -> bool {
    let var = program.variable(v);
    var.position_hint != 0 && !var.is_constant
}

/// Decide where each variable and constant is stored.
///
/// # Errors
///
/// Fails when a variable is initialized with a register.
pub(crate) fn analyze_variables(
    program: &mut Program,
) -> Result<LayoutResult, OneOrMore<AssembleError>> {
    let span = span!(Level::INFO, "variable layout");
    let _enter = span.enter();

    check_initializers(program)?;

    let mut layout = LayoutResult::default();
    let sections: Vec<BlockId> = program.sections().to_vec();
    for pass in [Pass::Arrays, Pass::Scalars] {
        for section in &sections {
            layout.allocate_unshared(program, *section, pass);
        }
    }
    let mut pinned: Vec<VariableId> = Vec::new();
    for section in &sections {
        let count = shared_count(program, *section);
        let start = layout.register_empty_range(count);
        layout.bind_shared(program, *section, start);
        collect_pinned(program, *section, &mut pinned);
    }
    layout.flush_pinned(program, pinned);

    event!(
        Level::DEBUG,
        "{}",
        MappingReport {
            layout: &layout,
            program
        }
    );
    event!(
        Level::INFO,
        "{} read-only and {} read-write slots",
        layout.readonly.len(),
        layout.readwrite.len()
    );
    Ok(layout)
}

fn check_initializers(program: &Program) -> Result<(), OneOrMore<AssembleError>> {
    let mut errors: ErrorList<AssembleError> = ErrorList::default();
    for section in program.sections() {
        check_block_initializers(program, *section, &mut errors);
    }
    errors.into_result(())
}

fn check_block_initializers(
    program: &Program,
    block: BlockId,
    errors: &mut ErrorList<AssembleError>,
) {
    let b = program.block(block);
    for v in &b.variables {
        let var = program.variable(*v);
        for value in &var.initial_values {
            if value.kind(program) == ValueKind::Register {
                errors.push(
                    AssembleError::new(
                        ErrorKind::InvalidOperandForm,
                        format!(
                            "Register {value} cannot be used for the initial value of '{}'.",
                            var.name
                        ),
                        var.position.clone(),
                    )
                    .with_title(if var.is_constant { "Constant" } else { "Variable" }),
                );
            }
        }
    }
    for child in b.child_blocks() {
        check_block_initializers(program, child, errors);
    }
}

/// The number of shared read-write slots needed by `block` and its
/// children.
fn shared_count(program: &Program, block: BlockId) -> usize {
    let b = program.block(block);
    let in_this: usize = b
        .variables
        .iter()
        .filter(|v| is_coalescible(program, **v))
        .map(|v| program.variable(*v).len())
        .sum();
    let in_children: usize = b
        .child_blocks()
        .map(|child| shared_count(program, child))
        .max()
        .unwrap_or(0);
    in_this + in_children
}

fn collect_pinned(program: &Program, block: BlockId, output: &mut Vec<VariableId>) {
    let b = program.block(block);
    output.extend(b.variables.iter().copied().filter(|v| is_pinned(program, *v)));
    for child in b.child_blocks() {
        collect_pinned(program, child, output);
    }
}

impl LayoutResult {
    pub(crate) fn readonly_slots(&self) -> &[ReadonlySlot] {
        &self.readonly
    }

    pub(crate) fn readwrite_slots(&self) -> &[ReadwriteSlot] {
        &self.readwrite
    }

    /// All slots in storage order: read-only slots, then read-write
    /// slots.
    pub(crate) fn all_slots(&self) -> Vec<SlotRef> {
        (0..self.readonly.len())
            .map(SlotRef::Readonly)
            .chain((0..self.readwrite.len()).map(SlotRef::Readwrite))
            .collect()
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.readonly.len() + self.readwrite.len()
    }

    pub(crate) fn sharers(&self, slot: SlotRef) -> &[VariableId] {
        match slot {
            SlotRef::Readonly(i) => &self.readonly[i].sharers,
            SlotRef::Readwrite(i) => &self.readwrite[i].sharers,
        }
    }

    pub(crate) fn initial_value(&self, slot: SlotRef) -> &Value {
        match slot {
            SlotRef::Readonly(i) => &self.readonly[i].content,
            SlotRef::Readwrite(i) => &self.readwrite[i].initial_value,
        }
    }

    /// Record that `slot` has been placed at `placed`.  Each variable
    /// which begins at this slot takes the placement.
    pub(crate) fn place_slot(&self, program: &mut Program, slot: SlotRef, placed: AddressInfo) {
        for v in self.sharers(slot) {
            let variable = program.variable(*v);
            if variable.slots.first() != Some(&slot) {
                continue;
            }
            let len = variable.len() as u32;
            let address = variable.address;
            // `to` counts elements, not address units, so on byte
            // addressed SubRISC an array's range stops short of its
            // last element's final byte.
            *program.address_mut(address) = AddressInfo {
                memory_slot: placed.memory_slot,
                from: placed.from,
                to: placed.from + len - 1,
            };
        }
    }

    fn allocate_unshared(&mut self, program: &mut Program, block: BlockId, pass: Pass) {
        let variables: Vec<VariableId> = program.block(block).variables.clone();
        for v in &variables {
            let var = program.variable(*v);
            if var.is_constant && pass.accepts(var.len()) {
                self.register_readonly(program, *v);
            }
        }
        for v in &variables {
            let var = program.variable(*v);
            if var.position_hint == 0
                && !var.is_constant
                && var.needs_initialization
                && pass.accepts(var.len())
            {
                self.register_readwrite(program, *v);
            }
        }
        let children: Vec<BlockId> = program.block(block).child_blocks().collect();
        for child in children {
            self.allocate_unshared(program, child, pass);
        }
    }

    fn register_readonly(&mut self, program: &mut Program, v: VariableId) {
        let values = program.variable(v).initial_values.clone();
        let slots: Vec<SlotRef> = match values.as_slice() {
            [scalar] => {
                let index = match self
                    .readonly
                    .iter()
                    .position(|slot| slot.content.same_content(scalar))
                {
                    Some(existing) => existing,
                    None => {
                        self.readonly.push(ReadonlySlot {
                            content: scalar.clone(),
                            sharers: Vec::new(),
                        });
                        self.readonly.len() - 1
                    }
                };
                self.readonly[index].sharers.push(v);
                vec![SlotRef::Readonly(index)]
            }
            elements => elements
                .iter()
                .map(|content| {
                    self.readonly.push(ReadonlySlot {
                        content: content.clone(),
                        sharers: vec![v],
                    });
                    SlotRef::Readonly(self.readonly.len() - 1)
                })
                .collect(),
        };
        program.variable_mut(v).slots = slots;
    }

    fn register_readwrite(&mut self, program: &mut Program, v: VariableId) {
        let values = program.variable(v).initial_values.clone();
        let slots: Vec<SlotRef> = values
            .into_iter()
            .map(|initial_value| {
                self.readwrite.push(ReadwriteSlot {
                    initial_value,
                    needs_initialization: true,
                    sharers: vec![v],
                });
                SlotRef::Readwrite(self.readwrite.len() - 1)
            })
            .collect();
        program.variable_mut(v).slots = slots;
    }

    /// Reserve `count` read-write slots with no particular initial
    /// value.  Returns the index of the first.
    fn register_empty_range(&mut self, count: usize) -> usize {
        let start = self.readwrite.len();
        self.readwrite.extend((0..count).map(|_| ReadwriteSlot {
            initial_value: Value::ZERO,
            needs_initialization: false,
            sharers: Vec::new(),
        }));
        start
    }

    fn bind_shared(&mut self, program: &mut Program, block: BlockId, start: usize) {
        let mut current = start;
        let variables: Vec<VariableId> = program.block(block).variables.clone();
        for v in variables {
            if !is_coalescible(program, v) {
                continue;
            }
            let len = program.variable(v).len();
            for slot in &mut self.readwrite[current..current + len] {
                slot.sharers.push(v);
            }
            program.variable_mut(v).slots = (current..current + len).map(SlotRef::Readwrite).collect();
            current += len;
        }
        let children: Vec<BlockId> = program.block(block).child_blocks().collect();
        for child in children {
            self.bind_shared(program, child, current);
        }
    }

    /// Place the variables which have a position hint.
    fn flush_pinned(&mut self, program: &mut Program, pinned: Vec<VariableId>) {
        let hint = |v: &VariableId| program.variable(*v).position_hint;
        let (mut head, mut tail): (Vec<VariableId>, Vec<VariableId>) =
            pinned.into_iter().partition(|v| hint(v) < 0);
        head.sort_by_key(hint);
        tail.sort_by_key(hint);

        let head_len: usize = head.iter().map(|v| program.variable(*v).len()).sum();
        if head_len > 0 {
            let ids: Vec<VariableId> = program.variable_ids().collect();
            for v in ids {
                for slot in &mut program.variable_mut(v).slots {
                    if let SlotRef::Readwrite(i) = slot {
                        *i += head_len;
                    }
                }
            }
        }

        let mut head_slots: Vec<ReadwriteSlot> = Vec::with_capacity(head_len);
        for v in &head {
            let start = head_slots.len();
            head_slots.extend(pinned_slots(program, *v));
            program.variable_mut(*v).slots = (start..head_slots.len()).map(SlotRef::Readwrite).collect();
        }
        head_slots.append(&mut self.readwrite);
        self.readwrite = head_slots;
        for v in &tail {
            let start = self.readwrite.len();
            let slots = pinned_slots(program, *v);
            self.readwrite.extend(slots);
            program.variable_mut(*v).slots = (start..self.readwrite.len())
                .map(SlotRef::Readwrite)
                .collect();
        }
    }
}

fn pinned_slots(program: &Program, v: VariableId) -> Vec<ReadwriteSlot> {
    program
        .variable(v)
        .initial_values
        .iter()
        .map(|value| ReadwriteSlot {
            initial_value: value.clone(),
            needs_initialization: true,
            sharers: vec![v],
        })
        .collect()
}

/// The storage map, for the debug log.
struct MappingReport<'a> {
    layout: &'a LayoutResult,
    program: &'a Program,
}

impl MappingReport<'_> {
    fn owner(&self, sharers: &[VariableId]) -> Option<VariableId> {
        match sharers {
            [only] => Some(*only),
            _ => None,
        }
    }

    fn write_sharers(&self, f: &mut Formatter<'_>, sharers: &[VariableId]) -> fmt::Result {
        for v in sharers {
            let var = self.program.variable(*v);
            writeln!(
                f,
                "   \t   *{}{} (defined at {})",
                self.program.block_path_prefix(var.block),
                var.name,
                var.position.location_text()
            )?;
        }
        Ok(())
    }

    /// Write slots `slots`, grouping runs of elements of one array.
    fn write_slots<'s, I>(&self, f: &mut Formatter<'_>, slots: I) -> fmt::Result
    where
        I: Iterator<Item = (&'s Value, bool, &'s [VariableId])>,
    {
        let slots: Vec<(&Value, bool, &[VariableId])> = slots.collect();
        let mut i = 0;
        while i < slots.len() {
            let (value, initialized, sharers) = slots[i];
            let owner = self.owner(sharers);
            let mut last = i;
            while owner.is_some()
                && last + 1 < slots.len()
                && self.owner(slots[last + 1].2) == owner
            {
                last += 1;
            }
            if last == i {
                if initialized {
                    let bits = value
                        .numeric(self.program, 1, 1)
                        .map_or_else(|_| "?".to_string(), |n| format!("{n:08X}"));
                    writeln!(f, "{i}:\t{value} (0x{bits})")?;
                } else {
                    writeln!(f, "{i}:\tAny")?;
                }
            } else {
                write!(f, "{i}-{last}:\t{{ {value}")?;
                for (v, _, _) in &slots[i + 1..=last] {
                    write!(f, ",{v}")?;
                }
                writeln!(f, " }}")?;
            }
            self.write_sharers(f, sharers)?;
            i = last + 1;
        }
        Ok(())
    }
}

impl Display for MappingReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Constants Mapping:")?;
        self.write_slots(
            f,
            self.layout
                .readonly
                .iter()
                .map(|s| (&s.content, true, s.sharers.as_slice())),
        )?;
        writeln!(f, "Variables Mapping:")?;
        self.write_slots(
            f,
            self.layout
                .readwrite
                .iter()
                .map(|s| (&s.initial_value, s.needs_initialization, s.sharers.as_slice())),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_strategy::proptest;

    use super::super::ast::SourceFile;
    use super::super::macros::expand_all;
    use super::super::program::build::build_program;
    use super::super::resolve::solve_all;
    use super::*;

    fn laid_out(input: &str) -> (Program, LayoutResult) {
        let tree: SourceFile = serde_json::from_str(input).expect("valid program tree");
        let mut program = build_program(&tree).expect("valid program");
        expand_all(&mut program).expect("macros expand");
        solve_all(&mut program).expect("references resolve");
        let layout = analyze_variables(&mut program).expect("layout succeeds");
        (program, layout)
    }

    fn variable_named(program: &Program, name: &str) -> VariableId {
        program
            .variable_ids()
            .find(|v| program.variable(*v).name == name)
            .unwrap_or_else(|| panic!("no variable {name}"))
    }

    #[test]
    fn test_equal_constants_share_a_slot() {
        let (program, layout) = laid_out(
            r#"{ "sections": [ { "name": "main", "body": { "variables": [
                { "name": "one", "constant": true, "values": [ { "kind": "integer", "value": 65 } ] },
                { "name": "a", "constant": true, "values": [ { "kind": "char", "value": "A" } ] },
                { "name": "two", "constant": true, "values": [ { "kind": "integer", "value": 2 } ] },
                { "name": "table", "constant": true, "length": 3,
                  "values": [ { "kind": "integer", "value": 2 } ] }
            ] } } ] }"#,
        );
        // The array is placed first, so "two" shares its first element.
        assert_eq!(layout.readonly_slots().len(), 4);
        let one = program.variable(variable_named(&program, "one"));
        let a = program.variable(variable_named(&program, "a"));
        assert_eq!(one.slots, a.slots);
        let table = program.variable(variable_named(&program, "table"));
        assert_eq!(
            table.slots,
            vec![
                SlotRef::Readonly(0),
                SlotRef::Readonly(1),
                SlotRef::Readonly(2)
            ]
        );
        let two = program.variable(variable_named(&program, "two"));
        assert_eq!(two.slots, vec![SlotRef::Readonly(0)]);
    }

    #[test]
    fn test_sibling_blocks_share_storage() {
        let (program, layout) = laid_out(
            r#"{ "sections": [ { "name": "main", "body": {
                "variables": [ { "name": "top" }, { "name": "init", "values": [ { "kind": "integer", "value": 9 } ] } ],
                "statements": [
                    { "kind": "block", "name": "first", "body": { "variables": [
                        { "name": "p" }, { "name": "q" }, { "name": "r" } ] } },
                    { "kind": "block", "name": "second", "body": { "variables": [
                        { "name": "s" } ] } }
                ] } } ] }"#,
        );
        // One slot for "init", then 1 + max(3, 1) shared slots.
        assert_eq!(layout.readwrite_slots().len(), 5);
        let slots = |name: &str| program.variable(variable_named(&program, name)).slots.clone();
        assert_eq!(slots("init"), vec![SlotRef::Readwrite(0)]);
        assert_eq!(slots("top"), vec![SlotRef::Readwrite(1)]);
        assert_eq!(slots("p"), vec![SlotRef::Readwrite(2)]);
        assert_eq!(slots("r"), vec![SlotRef::Readwrite(4)]);
        assert_eq!(slots("s"), vec![SlotRef::Readwrite(2)]);
        assert!(!layout.readwrite_slots()[2].needs_initialization);
        assert_eq!(layout.sharers(SlotRef::Readwrite(2)).len(), 2);
    }

    #[test]
    fn test_position_hints_order_storage() {
        let (program, layout) = laid_out(
            r#"{ "sections": [ { "name": "main", "body": { "variables": [
                { "name": "late", "position_hint": 5 },
                { "name": "first", "position_hint": -9 },
                { "name": "plain", "values": [ { "kind": "integer", "value": 1 } ] },
                { "name": "early", "position_hint": -1, "length": 2,
                  "values": [ { "kind": "integer", "value": 3 } ] },
                { "name": "last", "position_hint": 7 },
                { "name": "shared" }
            ] } } ] }"#,
        );
        let slots = |name: &str| program.variable(variable_named(&program, name)).slots.clone();
        assert_eq!(slots("first"), vec![SlotRef::Readwrite(0)]);
        assert_eq!(
            slots("early"),
            vec![SlotRef::Readwrite(1), SlotRef::Readwrite(2)]
        );
        assert_eq!(slots("plain"), vec![SlotRef::Readwrite(3)]);
        assert_eq!(slots("shared"), vec![SlotRef::Readwrite(4)]);
        assert_eq!(slots("late"), vec![SlotRef::Readwrite(5)]);
        assert_eq!(slots("last"), vec![SlotRef::Readwrite(6)]);
        assert_eq!(layout.readwrite_slots().len(), 7);
        for (i, slot) in layout.readwrite_slots().iter().enumerate() {
            for v in &slot.sharers {
                assert!(program.variable(*v).slots.contains(&SlotRef::Readwrite(i)));
            }
        }
    }

    #[test]
    fn test_tail_hints_follow_nested_shared_storage() {
        let (program, layout) = laid_out(
            r#"{ "sections": [ { "name": "main", "body": {
                "variables": [
                    { "name": "seven", "position_hint": 7,
                      "values": [ { "kind": "integer", "value": 70 } ] },
                    { "name": "five", "position_hint": 5,
                      "values": [ { "kind": "integer", "value": 50 } ] },
                    { "name": "own" }
                ],
                "statements": [
                    { "kind": "block", "name": "outer", "body": {
                        "variables": [ { "name": "o" } ],
                        "statements": [
                            { "kind": "block", "name": "inner", "body": { "variables": [
                                { "name": "i1" }, { "name": "i2" } ] } }
                        ] } },
                    { "kind": "block", "name": "other", "body": { "variables": [
                        { "name": "s" } ] } }
                ] } } ] }"#,
        );
        let slots = |name: &str| program.variable(variable_named(&program, name)).slots.clone();
        assert_eq!(slots("own"), vec![SlotRef::Readwrite(0)]);
        assert_eq!(slots("o"), vec![SlotRef::Readwrite(1)]);
        assert_eq!(slots("s"), vec![SlotRef::Readwrite(1)]);
        assert_eq!(slots("i1"), vec![SlotRef::Readwrite(2)]);
        assert_eq!(slots("i2"), vec![SlotRef::Readwrite(3)]);
        assert_eq!(slots("five"), vec![SlotRef::Readwrite(4)]);
        assert_eq!(slots("seven"), vec![SlotRef::Readwrite(5)]);
        assert_eq!(layout.readwrite_slots().len(), 6);
        let initialized: Vec<bool> = layout
            .readwrite_slots()
            .iter()
            .map(|slot| slot.needs_initialization)
            .collect();
        assert_eq!(initialized, vec![false, false, false, false, true, true]);
        assert_eq!(layout.sharers(SlotRef::Readwrite(1)).len(), 2);
    }

    #[proptest]
    fn sibling_blocks_reuse_the_widest(
        #[strategy(proptest::collection::vec(0usize..4, 1..5))] widths: Vec<usize>,
    ) {
        let blocks: Vec<serde_json::Value> = widths
            .iter()
            .enumerate()
            .map(|(k, width)| {
                let variables: Vec<serde_json::Value> = (0..*width)
                    .map(|j| json!({ "name": format!("v{k}_{j}") }))
                    .collect();
                json!({ "kind": "block", "name": format!("b{k}"), "body": { "variables": variables } })
            })
            .collect();
        let tree = json!({ "sections": [ { "name": "main", "body": { "statements": blocks } } ] });
        let (program, layout) = laid_out(&tree.to_string());

        let widest = widths.iter().copied().max().unwrap_or(0);
        assert_eq!(layout.readwrite_slots().len(), widest);
        for (k, width) in widths.iter().enumerate() {
            for j in 0..*width {
                let v = variable_named(&program, &format!("v{k}_{j}"));
                assert_eq!(program.variable(v).slots, vec![SlotRef::Readwrite(j)]);
            }
        }
        for (i, slot) in layout.readwrite_slots().iter().enumerate() {
            for v in &slot.sharers {
                assert!(program.variable(*v).slots.contains(&SlotRef::Readwrite(i)));
            }
        }
    }

    #[test]
    fn test_placing_a_slot_places_its_variables() {
        let (mut program, layout) = laid_out(
            r#"{ "sections": [ { "name": "main", "body": { "variables": [
                { "name": "arr", "length": 3, "values": [ { "kind": "integer", "value": 1 } ] }
            ] } } ] }"#,
        );
        let v = variable_named(&program, "arr");
        layout.place_slot(
            &mut program,
            SlotRef::Readwrite(1),
            AddressInfo {
                memory_slot: 0,
                from: 50,
                to: 50,
            },
        );
        assert_eq!(program.address(program.variable(v).address).from, 0);
        layout.place_slot(
            &mut program,
            SlotRef::Readwrite(0),
            AddressInfo {
                memory_slot: 0,
                from: 40,
                to: 40,
            },
        );
        let placed = program.address(program.variable(v).address);
        assert_eq!((placed.from, placed.to), (40, 42));
    }

    #[test]
    fn test_register_initializers_are_rejected() {
        let tree: SourceFile = serde_json::from_str(
            r#"{ "sections": [ { "name": "main", "body": { "variables": [
                { "name": "r", "values": [ { "kind": "register", "register": "t0" } ] }
            ] } } ] }"#,
        )
        .expect("valid program tree");
        let mut program = build_program(&tree).expect("valid program");
        solve_all(&mut program).expect("nothing to resolve");
        let errors = analyze_variables(&mut program).expect_err("register initializer");
        assert_eq!(errors.first().kind, ErrorKind::InvalidOperandForm);
        assert_eq!(errors.first().title, "Variable");
    }

    #[test]
    fn test_mapping_report() {
        let (program, layout) = laid_out(
            r#"{ "sections": [ { "name": "main", "body": { "variables": [
                { "name": "k", "constant": true, "values": [ { "kind": "integer", "value": 10 } ] },
                { "name": "free" }
            ] } } ] }"#,
        );
        let report = MappingReport {
            layout: &layout,
            program: &program,
        }
        .to_string();
        assert!(report.contains("0:\t10 (0x0000000A)"));
        assert!(report.contains("0:\tAny"));
        assert!(report.contains("*main.k (defined at line: 0,col: 0)"));
    }
}
