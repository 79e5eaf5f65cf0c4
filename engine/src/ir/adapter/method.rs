use serde::{Deserialize, Serialize};

use crate::ir::adapter::instruction::Inst;

/// A raw basic block: a label, straight-line body, and one terminator
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Block {
    pub label: usize,
    pub body: Vec<Inst>,
    pub terminator: Inst,
}

/// A raw method, blocks listed in layout order with the entry block first
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Method {
    pub name: String,
    /// registers receiving the incoming parameters, in declaration order
    pub params: Vec<u32>,
    pub blocks: Vec<Block>,
}
