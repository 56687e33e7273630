//! Operand and initializer values.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use super::ast::{RegisterNode, ValueNode};
use super::program::{AddressId, Program, SymbolId};

/// Symbols may refer to other symbols.  A chain longer than this is
/// taken to be a cycle.
const MAX_SYMBOL_CHAIN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum RegisterSpec {
    ByName(String),
    ByNumber(i32),
}

impl Display for RegisterSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RegisterSpec::ByName(name) => write!(f, "${name}"),
            RegisterSpec::ByNumber(n) => write!(f, "${n}"),
        }
    }
}

/// What a resolved reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Referent {
    ToAddress(AddressId),
    ToSymbol(SymbolId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueKind {
    Immediate,
    Register,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Integer(i32),
    /// A character, as its code point.
    Char(u32),
    Register(RegisterSpec),
    Reference {
        name: String,
        index: i32,
        resolved: Option<Referent>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EvalFailure {
    Unresolved(String),
    NotAnImmediate(RegisterSpec),
    SymbolChainTooLong(String),
}

impl Display for EvalFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EvalFailure::Unresolved(name) => {
                write!(f, "reference to '{name}' has not been resolved")
            }
            EvalFailure::NotAnImmediate(reg) => {
                write!(f, "register {reg} cannot be used as an immediate value")
            }
            EvalFailure::SymbolChainTooLong(name) => write!(
                f,
                "symbol '{name}' is defined in terms of itself (or a chain of more than {MAX_SYMBOL_CHAIN} symbols)"
            ),
        }
    }
}

impl Error for EvalFailure {}

impl From<&ValueNode> for Value {
    fn from(node: &ValueNode) -> Value {
        match node {
            ValueNode::Integer { value } => Value::Integer(*value),
            ValueNode::Char { value } => Value::Char(u32::from(*value)),
            ValueNode::Register { register } => Value::Register(match register {
                RegisterNode::Name(name) => RegisterSpec::ByName(name.clone()),
                RegisterNode::Number(n) => RegisterSpec::ByNumber(*n),
            }),
            ValueNode::Reference { name, index } => Value::Reference {
                name: name.clone(),
                index: *index,
                resolved: None,
            },
        }
    }
}

impl Value {
    pub(crate) const ZERO: Value = Value::Integer(0);

    /// The name this value refers to, if it is a reference which has
    /// not been resolved yet.
    pub(crate) fn unresolved_name(&self) -> Option<&str> {
        match self {
            Value::Reference {
                name,
                resolved: None,
                ..
            } => Some(name.as_str()),
            _ => None,
        }
    }

    /// True if this value is a use of the macro formal argument
    /// `formal`.
    pub(crate) fn matches_argument(&self, formal: &str) -> bool {
        matches!(self, Value::Reference { name, .. } if name == formal)
    }

    fn describe(&self) -> String {
        match self {
            Value::Reference { name, .. } => name.clone(),
            other => other.to_string(),
        }
    }

    /// Follow symbol references until reaching a value which is not a
    /// reference to a symbol.
    fn dereference<'a>(&'a self, program: &'a Program) -> Result<&'a Value, EvalFailure> {
        let mut current = self;
        for _ in 0..MAX_SYMBOL_CHAIN {
            match current {
                Value::Reference {
                    resolved: Some(Referent::ToSymbol(symbol)),
                    ..
                } => {
                    current = &program.symbol(*symbol).content;
                }
                _ => return Ok(current),
            }
        }
        Err(EvalFailure::SymbolChainTooLong(self.describe()))
    }

    /// The numeric value of an immediate.
    ///
    /// A reference to an address yields the first address of the
    /// target plus `index * bytes_per_word`, with bit 31 set when the
    /// target lives outside memory slot 0, all divided by `divisor`.
    /// A reference to a symbol yields the symbol's value.
    pub(crate) fn numeric(
        &self,
        program: &Program,
        bytes_per_word: u32,
        divisor: u32,
    ) -> Result<u32, EvalFailure> {
        match self.dereference(program)? {
            Value::Integer(n) => Ok(*n as u32),
            Value::Char(c) => Ok(*c),
            Value::Register(reg) => Err(EvalFailure::NotAnImmediate(reg.clone())),
            Value::Reference {
                index,
                resolved: Some(Referent::ToAddress(address)),
                ..
            } => {
                let info = program.address(*address);
                let slot_bit: u32 = if info.memory_slot != 0 { 0x8000_0000 } else { 0 };
                let location = info
                    .from
                    .wrapping_add_signed(index.wrapping_mul(bytes_per_word as i32));
                Ok((slot_bit | location) / divisor.max(1))
            }
            // dereference() never stops at a symbol reference.
            Value::Reference { name, .. } => Err(EvalFailure::Unresolved(name.clone())),
        }
    }

    /// The register this value designates, looking through symbols.
    pub(crate) fn register<'a>(&'a self, program: &'a Program) -> Option<&'a RegisterSpec> {
        match self.dereference(program) {
            Ok(Value::Register(reg)) => Some(reg),
            _ => None,
        }
    }

    pub(crate) fn kind(&self, program: &Program) -> ValueKind {
        if self.register(program).is_some() {
            ValueKind::Register
        } else {
            ValueKind::Immediate
        }
    }

    /// Equality of content, used to share storage between constants.
    /// Integers and characters with the same numeric value are the
    /// same; references are the same when they resolve to the same
    /// target with the same index.
    pub(crate) fn same_content(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Integer(n), Value::Char(c)) | (Value::Char(c), Value::Integer(n)) => {
                *n as u32 == *c
            }
            (Value::Register(a), Value::Register(b)) => a == b,
            (
                Value::Reference {
                    index: ia,
                    resolved: Some(ra),
                    ..
                },
                Value::Reference {
                    index: ib,
                    resolved: Some(rb),
                    ..
                },
            ) => ia == ib && ra == rb,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Char(c) => match char::from_u32(*c) {
                Some(ch) => write!(f, "'{ch}'"),
                None => write!(f, "'\\u{{{c:x}}}'"),
            },
            Value::Register(reg) => reg.fmt(f),
            Value::Reference { name, index, .. } => {
                if *index != 0 {
                    write!(f, "&{name}[{index}]")
                } else {
                    write!(f, "&{name}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::program::{AddressInfo, Program, Symbol};
    use super::*;

    fn reference(name: &str, index: i32, resolved: Option<Referent>) -> Value {
        Value::Reference {
            name: name.to_string(),
            index,
            resolved,
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Char(u32::from('a')).to_string(), "'a'");
        assert_eq!(
            Value::Register(RegisterSpec::ByName("a0".to_string())).to_string(),
            "$a0"
        );
        assert_eq!(Value::Register(RegisterSpec::ByNumber(7)).to_string(), "$7");
        assert_eq!(reference("x", 0, None).to_string(), "&x");
        assert_eq!(reference("x", 2, None).to_string(), "&x[2]");
    }

    #[test]
    fn test_numeric_of_address_reference() {
        let mut program = Program::default();
        let target = program.new_address();
        *program.address_mut(target) = AddressInfo {
            memory_slot: 0,
            from: 0x40,
            to: 0x4F,
        };
        let v = reference("buffer", 2, Some(Referent::ToAddress(target)));
        assert_eq!(v.numeric(&program, 4, 1), Ok(0x48));
        assert_eq!(v.numeric(&program, 4, 4), Ok(0x12));

        program.address_mut(target).memory_slot = 1;
        assert_eq!(v.numeric(&program, 1, 1), Ok(0x8000_0042));
    }

    #[test]
    fn test_numeric_of_literals() {
        let program = Program::default();
        assert_eq!(Value::Integer(-1).numeric(&program, 1, 1), Ok(0xFFFF_FFFF));
        assert_eq!(Value::Char(0x41).numeric(&program, 4, 4), Ok(0x41));
        assert_eq!(
            reference("nowhere", 0, None).numeric(&program, 1, 1),
            Err(EvalFailure::Unresolved("nowhere".to_string()))
        );
        assert!(Value::Register(RegisterSpec::ByNumber(3))
            .numeric(&program, 1, 1)
            .is_err());
    }

    #[test]
    fn test_symbol_chains() {
        let mut program = Program::default();
        let block = program.new_plain_block("main".to_string(), None, Default::default());
        let reg = program.add_symbol(Symbol {
            name: "acc".to_string(),
            content: Value::Register(RegisterSpec::ByName("t0".to_string())),
            block,
            position: Default::default(),
        });
        let via = program.add_symbol(Symbol {
            name: "alias".to_string(),
            content: reference("acc", 0, Some(Referent::ToSymbol(reg))),
            block,
            position: Default::default(),
        });
        let v = reference("alias", 0, Some(Referent::ToSymbol(via)));
        assert_eq!(v.kind(&program), ValueKind::Register);
        assert_eq!(
            v.register(&program),
            Some(&RegisterSpec::ByName("t0".to_string()))
        );

        let looped = program.add_symbol(Symbol {
            name: "self".to_string(),
            content: Value::ZERO,
            block,
            position: Default::default(),
        });
        program.symbol_mut(looped).content = reference("self", 0, Some(Referent::ToSymbol(looped)));
        let v = reference("self", 0, Some(Referent::ToSymbol(looped)));
        assert!(matches!(
            v.numeric(&program, 1, 1),
            Err(EvalFailure::SymbolChainTooLong(_))
        ));
        assert_eq!(v.kind(&program), ValueKind::Immediate);
    }

    #[test]
    fn test_same_content() {
        assert!(Value::Integer(65).same_content(&Value::Char(65)));
        assert!(!Value::Integer(65).same_content(&Value::Integer(66)));
        let a = Referent::ToSymbol(SymbolId::from(0));
        let b = Referent::ToSymbol(SymbolId::from(1));
        assert!(reference("p", 0, Some(a)).same_content(&reference("q", 0, Some(a))));
        assert!(!reference("p", 0, Some(a)).same_content(&reference("p", 0, Some(b))));
        assert!(!reference("p", 1, Some(a)).same_content(&reference("p", 0, Some(a))));
        assert!(!reference("p", 0, None).same_content(&reference("p", 0, None)));
    }

    #[test]
    fn test_matches_argument() {
        assert!(reference("x", 3, None).matches_argument("x"));
        assert!(!reference("y", 0, None).matches_argument("x"));
        assert!(!Value::Integer(0).matches_argument("x"));
    }
}
