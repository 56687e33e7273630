//! The program tree handed over by the parser.
//!
//! The textual grammar is handled elsewhere; the parser emits the
//! tree as JSON and the assembler decodes it into these types.  The
//! types stay close to the shape of the source program.  Building
//! the arena the pipeline works on (see `program::build`) is where
//! array lengths are checked and names become scoped.
use serde::{Deserialize, Serialize};

use super::source::{AssemblePosition, LineAndColumn};

/// Where the parser found a node.  Nodes the parser synthesized
/// carry only a line and column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl From<PositionNode> for AssemblePosition {
    fn from(node: PositionNode) -> AssemblePosition {
        let location = LineAndColumn {
            line: node.line,
            column: node.column,
        };
        match (node.file, node.token) {
            (Some(file), Some(token)) => AssemblePosition::ParseNode {
                file,
                location,
                token,
            },
            (file, None) | (file @ None, Some(_)) => AssemblePosition::Raw { file, location },
        }
    }
}

pub(crate) fn position_of(node: Option<&PositionNode>) -> AssemblePosition {
    node.cloned().map(AssemblePosition::from).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceFile {
    pub sections: Vec<SectionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionNode {
    pub name: String,
    /// Marks the section whose instructions are placed first.
    #[serde(default)]
    pub startup: bool,
    #[serde(default)]
    pub position: Option<PositionNode>,
    #[serde(default)]
    pub body: BlockBody,
}

/// The contents of a section, a nested block or a macro body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockBody {
    #[serde(default)]
    pub variables: Vec<VariableNode>,
    #[serde(default)]
    pub symbols: Vec<SymbolNode>,
    #[serde(default)]
    pub macros: Vec<MacroNode>,
    #[serde(default)]
    pub statements: Vec<StatementNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableNode {
    pub name: String,
    #[serde(default)]
    pub constant: bool,
    /// Declared array length; absent for scalars and for arrays whose
    /// length is that of their initializer.
    #[serde(default)]
    pub length: Option<i32>,
    #[serde(default)]
    pub values: Option<Vec<ValueNode>>,
    /// Zero means "anywhere"; a negative hint pins the variable
    /// before the coalesced storage, a positive one after it.
    #[serde(default)]
    pub position_hint: i32,
    #[serde(default)]
    pub position: Option<PositionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolNode {
    pub name: String,
    pub value: ValueNode,
    #[serde(default)]
    pub position: Option<PositionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroNode {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub body: BlockBody,
    #[serde(default)]
    pub position: Option<PositionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StatementNode {
    Instruction {
        mnemonic: String,
        #[serde(default)]
        operands: Vec<OperandNode>,
        #[serde(default)]
        jump: Option<JumpNode>,
        #[serde(default)]
        labels: Vec<String>,
        /// Text the simulator prints when the instruction executes.
        #[serde(default)]
        debug_text: Option<String>,
        #[serde(default)]
        position: Option<PositionNode>,
    },
    Macrocall {
        name: String,
        #[serde(default)]
        operands: Vec<ValueNode>,
        #[serde(default)]
        labels: Vec<String>,
        #[serde(default)]
        position: Option<PositionNode>,
    },
    Block {
        name: String,
        #[serde(default)]
        labels: Vec<String>,
        #[serde(default)]
        body: BlockBody,
        #[serde(default)]
        position: Option<PositionNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperandNode {
    pub value: ValueNode,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub position: Option<PositionNode>,
}

/// The jump attribute of a SubRISC instruction (`-< jneg target`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpNode {
    pub mnemonic: String,
    pub target: ValueNode,
    #[serde(default)]
    pub position: Option<PositionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ValueNode {
    Integer {
        value: i32,
    },
    Char {
        value: char,
    },
    Register {
        register: RegisterNode,
    },
    Reference {
        name: String,
        #[serde(default)]
        index: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegisterNode {
    Number(i32),
    Name(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_statements() {
        let input = r#"{
          "sections": [
            { "name": "main", "startup": true,
              "body": {
                "variables": [
                  { "name": "x", "values": [ { "kind": "integer", "value": 5 } ] }
                ],
                "statements": [
                  { "kind": "instruction", "mnemonic": "sub",
                    "operands": [
                      { "value": { "kind": "register", "register": "a0" } },
                      { "value": { "kind": "register", "register": 3 } },
                      { "value": { "kind": "reference", "name": "x", "index": 1 },
                        "labels": ["here"] }
                    ],
                    "jump": { "mnemonic": "jneg", "target": { "kind": "reference", "name": "top" } },
                    "labels": ["top"],
                    "position": { "file": "a.asm", "line": 3, "column": 5, "token": "sub" } },
                  { "kind": "macrocall", "name": "swap",
                    "operands": [ { "kind": "char", "value": "q" } ] },
                  { "kind": "block", "name": "inner" }
                ]
              }
            }
          ]
        }"#;
        let tree: SourceFile = serde_json::from_str(input).expect("valid program tree");
        assert_eq!(tree.sections.len(), 1);
        let section = &tree.sections[0];
        assert!(section.startup);
        assert_eq!(section.body.variables[0].position_hint, 0);
        assert!(!section.body.variables[0].constant);
        match section.body.statements.as_slice() {
            [StatementNode::Instruction {
                mnemonic,
                operands,
                jump: Some(jump),
                labels,
                ..
            }, StatementNode::Macrocall { name, .. }, StatementNode::Block { body, .. }] => {
                assert_eq!(mnemonic, "sub");
                assert_eq!(
                    operands[0].value,
                    ValueNode::Register {
                        register: RegisterNode::Name("a0".to_string())
                    }
                );
                assert_eq!(
                    operands[1].value,
                    ValueNode::Register {
                        register: RegisterNode::Number(3)
                    }
                );
                assert_eq!(operands[2].labels, vec!["here".to_string()]);
                assert_eq!(
                    jump.target,
                    ValueNode::Reference {
                        name: "top".to_string(),
                        index: 0
                    }
                );
                assert_eq!(labels, &vec!["top".to_string()]);
                assert_eq!(name, "swap");
                assert!(body.statements.is_empty());
            }
            other => panic!("unexpected statements {other:?}"),
        }
    }

    #[test]
    fn test_position_conversion() {
        let parsed = PositionNode {
            file: Some("a.asm".to_string()),
            line: 2,
            column: 9,
            token: Some("mr".to_string()),
        };
        assert!(matches!(
            AssemblePosition::from(parsed),
            AssemblePosition::ParseNode { .. }
        ));
        let synthesized = PositionNode {
            file: None,
            line: 2,
            column: 9,
            token: None,
        };
        assert_eq!(
            AssemblePosition::from(synthesized),
            AssemblePosition::raw(2, 9)
        );
        assert_eq!(position_of(None), AssemblePosition::Unknown);
    }
}
