use serde::{Deserialize, Serialize};

/// A raw, unvalidated bytecode instruction as it appears on the wire.
/// Terminators and in-block instructions share this enum; the bridge decides
/// which positions are legal for which variant.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Inst {
    // data movement
    Nop,
    Const {
        dst: u32,
        value: i64,
    },
    Move {
        dst: u32,
        src: u32,
    },
    MoveResult {
        dst: u32,
    },
    LoadParam {
        dst: u32,
    },
    // comparison producing -1 / 0 / 1
    CmpLong {
        dst: u32,
        lhs: u32,
        rhs: u32,
    },
    // arithmetic against an inline literal
    LitOp {
        op: String,
        dst: u32,
        src: u32,
        lit: i32,
    },
    // arithmetic between registers
    BinOp {
        op: String,
        dst: u32,
        lhs: u32,
        rhs: u32,
    },
    // call (fills the implicit result register)
    Invoke {
        callee: String,
        args: Vec<u32>,
    },
    // static fields
    StaticGet {
        dst: u32,
        field: u32,
    },
    StaticPut {
        src: u32,
        field: u32,
    },
    // terminators
    Goto {
        target: usize,
    },
    Branch {
        cond: String,
        lhs: u32,
        rhs: Option<u32>,
        then_case: usize,
        else_case: usize,
    },
    Switch {
        cond: u32,
        cases: Vec<(i64, usize)>,
        default: usize,
    },
    Return {
        val: Option<u32>,
    },
    Unreachable,
}
