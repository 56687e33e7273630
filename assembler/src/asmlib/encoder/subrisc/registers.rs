//! SubRISC register names.
//!
//! The same name can stand for different register numbers depending
//! on which operand of an instruction it appears in.  Some registers
//! cannot appear in some operand positions at all.
use std::fmt::{self, Display, Formatter};

use super::super::super::value::RegisterSpec;

struct RegisterEntry {
    name: &'static str,
    /// The register number for operand positions 0, 1 and 2.
    numbers: [Option<u8>; 3],
}

const fn entry(name: &'static str, numbers: [Option<u8>; 3]) -> RegisterEntry {
    RegisterEntry { name, numbers }
}

const fn general(name: &'static str, n: u8) -> RegisterEntry {
    entry(name, [Some(n), Some(n), Some(n)])
}

const REGISTERS: [RegisterEntry; 22] = [
    entry("ra", [None, Some(0), Some(0)]),
    entry("sp", [None, Some(1), Some(1)]),
    entry("v0", [None, Some(2), Some(2)]),
    entry("v1", [None, Some(3), Some(3)]),
    general("a0", 4),
    general("a1", 5),
    general("a2", 6),
    general("a3", 7),
    general("m0", 8),
    general("m1", 9),
    general("t0", 10),
    general("t1", 11),
    general("t2", 12),
    general("t3", 13),
    general("t4", 14),
    general("t5", 15),
    entry("Z", [Some(0), Some(16), None]),
    entry("INC", [Some(1), Some(17), None]),
    entry("DEC", [Some(2), Some(18), None]),
    entry("PC", [None, Some(20), None]),
    entry("WIDTH", [None, Some(24), None]),
    entry("NFOUR", [Some(3), None, None]),
];

/// The number of `PC` in operand position 1.
pub(crate) const PC_AS_ADDRESS: i32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RegisterFailure {
    UnknownName(String),
    NotUsableAt { name: String, position: usize },
}

impl Display for RegisterFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RegisterFailure::UnknownName(name) => write!(f, "Invalid register name '{name}'"),
            RegisterFailure::NotUsableAt { name, position } => write!(
                f,
                "Register ${name} cannot be used for {}th operand",
                position + 1
            ),
        }
    }
}

/// The register number `spec` designates in operand position
/// `position`.  Registers given by number are taken as they are.
pub(crate) fn register_number(spec: &RegisterSpec, position: usize) -> Result<i32, RegisterFailure> {
    match spec {
        RegisterSpec::ByNumber(n) => Ok(*n),
        RegisterSpec::ByName(name) => {
            let Some(entry) = REGISTERS.iter().find(|e| e.name == name.as_str()) else {
                return Err(RegisterFailure::UnknownName(name.clone()));
            };
            match entry.numbers.get(position).copied().flatten() {
                Some(n) => Ok(i32::from(n)),
                None => Err(RegisterFailure::NotUsableAt {
                    name: name.clone(),
                    position,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> RegisterSpec {
        RegisterSpec::ByName(name.to_string())
    }

    #[test]
    fn test_numbers_depend_on_position() {
        assert_eq!(register_number(&named("Z"), 0), Ok(0));
        assert_eq!(register_number(&named("Z"), 1), Ok(16));
        assert_eq!(register_number(&named("PC"), 1), Ok(PC_AS_ADDRESS));
        assert_eq!(register_number(&named("t5"), 2), Ok(15));
        assert_eq!(register_number(&RegisterSpec::ByNumber(27), 0), Ok(27));
    }

    #[test]
    fn test_unusable_and_unknown_registers() {
        let e = register_number(&named("ra"), 0).expect_err("ra is not an A operand");
        assert_eq!(e.to_string(), "Register $ra cannot be used for 1th operand");
        let e = register_number(&named("NFOUR"), 2).expect_err("NFOUR is only an A operand");
        assert_eq!(e.to_string(), "Register $NFOUR cannot be used for 3th operand");
        // Names are case sensitive.
        let e = register_number(&named("pc"), 1).expect_err("no such register");
        assert_eq!(e.to_string(), "Invalid register name 'pc'");
    }
}
