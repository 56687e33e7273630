//! The four-word SUBNEG4X instruction.

#[cfg(test)]
use test_strategy::{proptest, Arbitrary};

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subneg4Opcode {
    /// `C = B - A`, jump if negative.
    Subneg4,
    /// The extended operation selected by the opcode bit.
    Subneg4X,
}

impl Subneg4Opcode {
    pub fn from_mnemonic(mnemonic: &str) -> Option<Subneg4Opcode> {
        match mnemonic.to_ascii_uppercase().as_str() {
            "SNG4" => Some(Subneg4Opcode::Subneg4),
            "SNG4X" => Some(Subneg4Opcode::Subneg4X),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Subneg4Opcode::Subneg4 => 0,
            Subneg4Opcode::Subneg4X => 1,
        }
    }
}

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordWidth {
    ThirtyTwo,
    Sixteen,
}

impl WordWidth {
    /// The bit of word 3 which carries the opcode.
    pub fn opcode_bit(&self) -> u32 {
        match self {
            WordWidth::ThirtyTwo => 0x8000_0000,
            WordWidth::Sixteen => 0x0000_8000,
        }
    }

    fn jump_mask(&self) -> u32 {
        match self {
            WordWidth::ThirtyTwo => 0x7FFF_FFFF,
            WordWidth::Sixteen => 0x0000_7FFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subneg4Instruction {
    pub opcode: Subneg4Opcode,
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub jump: u32,
}

impl Subneg4Instruction {
    /// The four memory words of the instruction.  Bit 31 of the jump
    /// target is discarded; on the sixteen-bit machine the opcode bit
    /// is bit 15 and so shares space with the jump target.
    pub fn words(&self, width: WordWidth) -> [u32; 4] {
        let opcode_bit = match self.opcode {
            Subneg4Opcode::Subneg4 => 0,
            Subneg4Opcode::Subneg4X => width.opcode_bit(),
        };
        [self.a, self.b, self.c, (self.jump & 0x7FFF_FFFF) | opcode_bit]
    }

    pub fn decode(words: [u32; 4], width: WordWidth) -> Subneg4Instruction {
        let [a, b, c, j] = words;
        let opcode = if j & width.opcode_bit() == 0 {
            Subneg4Opcode::Subneg4
        } else {
            Subneg4Opcode::Subneg4X
        };
        Subneg4Instruction {
            opcode,
            a,
            b,
            c,
            jump: j & width.jump_mask(),
        }
    }
}

#[test]
fn test_mnemonics_are_case_insensitive() {
    assert_eq!(
        Subneg4Opcode::from_mnemonic("sng4"),
        Some(Subneg4Opcode::Subneg4)
    );
    assert_eq!(
        Subneg4Opcode::from_mnemonic("Sng4X"),
        Some(Subneg4Opcode::Subneg4X)
    );
    assert_eq!(Subneg4Opcode::from_mnemonic("sub"), None);
}

#[test]
fn test_opcode_bit_placement() {
    let inst = Subneg4Instruction {
        opcode: Subneg4Opcode::Subneg4X,
        a: 12,
        b: 13,
        c: 14,
        jump: 0xFFFF_FFFF,
    };
    assert_eq!(inst.words(WordWidth::ThirtyTwo), [12, 13, 14, 0xFFFF_FFFF]);
    assert_eq!(inst.words(WordWidth::Sixteen)[3], 0x7FFF_FFFF);
    let plain = Subneg4Instruction {
        opcode: Subneg4Opcode::Subneg4,
        ..inst
    };
    assert_eq!(plain.words(WordWidth::ThirtyTwo)[3], 0x7FFF_FFFF);
}

#[cfg(test)]
#[derive(Debug, Arbitrary)]
struct DecodableInstruction {
    opcode: Subneg4Opcode,
    width: WordWidth,
    a: u32,
    b: u32,
    c: u32,
    #[strategy(0u32..0x8000)]
    jump: u32,
}

#[cfg(test)]
#[proptest]
fn reversible_decoding(input: DecodableInstruction) {
    let inst = Subneg4Instruction {
        opcode: input.opcode,
        a: input.a,
        b: input.b,
        c: input.c,
        jump: input.jump,
    };
    assert_eq!(
        Subneg4Instruction::decode(inst.words(input.width), input.width),
        inst
    );
}
