//! Control-flow graph visual layout I/O model.
//!
//! The visualization boundary is JSON: the analysis side hands over basic
//! blocks with disassembly text, and gets back measured nodes with tagged
//! terms plus routed edges. This crate owns the data model and the node
//! measurement; the actual layout and rendering live elsewhere.
//!
//! Nodes and edges are plain records held in a pair of arrays; node
//! references are array indices, not object graphs.

use serde::{Deserialize, Serialize};

/// Pixel padding inside a node box.
pub const PADDING: f64 = 4.0;

/// Width of one rendered character in pixels.
const CHAR_WIDTH: f64 = 7.5;

/// Height of one rendered line in pixels.
const LINE_HEIGHT: f64 = 14.0;

/// One disassembled instruction line of a basic block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DisasmLine {
    pub disasm: String,
    pub comment: String,
}

/// A basic block as the analysis side reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputNode {
    pub address: u64,
    pub disassembly: Vec<DisasmLine>,
}

/// The kind of a control-flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    FallThrough,
    Jump,
    CJmpTrue,
    CJmpFalse,
    Call,
    Ret,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputEdge {
    pub from: u64,
    pub to: u64,
    #[serde(rename = "Type")]
    pub kind: EdgeKind,
}

/// The graph handed to the layout: blocks, edges, entry address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputGraph {
    pub nodes: Vec<InputNode>,
    pub edges: Vec<InputEdge>,
    pub root: u64,
}

/// Category of a rendered term within a disassembly line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermTag {
    Mnemonic,
    Operand0,
    Operand1,
    Operand2,
    Comment,
}

/// A tagged piece of text; serializes as a `[text, tag]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term(pub String, pub TermTag);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A measured node: tagged terms per line, box size and position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputNode {
    pub address: u64,
    pub terms: Vec<Vec<Term>>,
    pub width: f64,
    pub height: f64,
    pub pos: Point,
}

/// A routed edge: polyline points plus the back-edge flag the layout
/// assigns to loop edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputEdge {
    #[serde(rename = "Type")]
    pub kind: EdgeKind,
    pub points: Vec<Point>,
    pub is_back_edge: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputGraph {
    pub nodes: Vec<OutputNode>,
    pub edges: Vec<OutputEdge>,
}

/// The full rendered text of a line; a non-empty comment renders as
/// `  ; comment` and counts toward the line length.
fn line_text(line: &DisasmLine) -> String {
    if line.comment.is_empty() {
        line.disasm.clone()
    } else {
        format!("{}  ; {}", line.disasm, line.comment)
    }
}

/// Splits one line into tagged terms: the leading token is the mnemonic,
/// comma-separated pieces after it are operands (clamped to `Operand2`),
/// and the comment comes last.
#[must_use]
pub fn tokenize(line: &DisasmLine) -> Vec<Term> {
    let mut terms = Vec::new();
    let trimmed = line.disasm.trim();
    if !trimmed.is_empty() {
        let (mnemonic, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((m, rest)) => (m, rest.trim()),
            None => (trimmed, ""),
        };
        terms.push(Term(mnemonic.to_owned(), TermTag::Mnemonic));
        if !rest.is_empty() {
            for (i, operand) in rest.split(',').enumerate() {
                let tag = match i {
                    0 => TermTag::Operand0,
                    1 => TermTag::Operand1,
                    _ => TermTag::Operand2,
                };
                terms.push(Term(operand.trim().to_owned(), tag));
            }
        }
    }
    if !line.comment.is_empty() {
        terms.push(Term(line.comment.clone(), TermTag::Comment));
    }
    terms
}

/// Node box size: `width = longest line × 7.5 + 2 × padding`,
/// `height = lines × 14 + 4 + 2 × padding`.
#[must_use]
pub fn measure(lines: &[DisasmLine]) -> (f64, f64) {
    let longest = lines
        .iter()
        .map(|line| line_text(line).chars().count())
        .max()
        .unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let width = longest as f64 * CHAR_WIDTH + PADDING * 2.0;
    #[allow(clippy::cast_precision_loss)]
    let height = lines.len() as f64 * LINE_HEIGHT + 4.0 + PADDING * 2.0;
    (width, height)
}

/// Builds the output model from the input graph: terms and sizes are
/// filled in, positions, edge points and back-edge flags are zeroed for a
/// later layout pass.
#[must_use]
pub fn build_output(input: &InputGraph) -> OutputGraph {
    let nodes = input
        .nodes
        .iter()
        .map(|node| {
            let (width, height) = measure(&node.disassembly);
            OutputNode {
                address: node.address,
                terms: node.disassembly.iter().map(tokenize).collect(),
                width,
                height,
                pos: Point::default(),
            }
        })
        .collect();
    let edges = input
        .edges
        .iter()
        .map(|edge| OutputEdge {
            kind: edge.kind,
            points: Vec::new(),
            is_back_edge: false,
        })
        .collect();
    OutputGraph { nodes, edges }
}

/// Parses the input-side JSON.
pub fn from_json(json: &str) -> serde_json::Result<InputGraph> {
    serde_json::from_str(json)
}

/// Serializes the output-side JSON.
pub fn to_json(graph: &OutputGraph) -> serde_json::Result<String> {
    serde_json::to_string(graph)
}
