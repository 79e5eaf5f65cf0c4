use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use petgraph::algo::is_isomorphic_matching;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::error::{EngineError, EngineResult};
use crate::ir::adapter;
use crate::ir::bridge::instruction::{Context, Instruction, Terminator};
use crate::ir::bridge::value::BlockLabel;

/// An adapted representation of a basic block
#[derive(Eq, PartialEq, Clone, Debug)]
pub struct Block {
    /// sequence of instructions
    sequence: Vec<Instruction>,
    /// terminator of the block
    terminator: Terminator,
}

impl Block {
    pub fn instructions(&self) -> &[Instruction] {
        &self.sequence
    }

    pub fn terminator(&self) -> &Terminator {
        &self.terminator
    }
}

/// A representation of CFG edges
#[derive(Eq, PartialEq, Clone, Debug)]
pub enum Edge {
    Goto,
    Branch(bool),
    Switch(BTreeSet<Option<i64>>),
}

/// Control-flow graph of a single method
pub struct ControlFlowGraph {
    graph: DiGraph<Block, Edge>,
    /// block label to index in the graph
    block_label_to_index: BTreeMap<BlockLabel, NodeIndex>,
    /// graph index back to block label
    block_index_to_label: BTreeMap<NodeIndex, BlockLabel>,
    /// blocks in layout order (entry first)
    layout: Vec<BlockLabel>,
}

impl PartialEq for ControlFlowGraph {
    fn eq(&self, other: &Self) -> bool {
        is_isomorphic_matching(
            &self.graph,
            &other.graph,
            |n1, n2| n1 == n2,
            |e1, e2| e1 == e2,
        )
    }
}
impl Eq for ControlFlowGraph {}

/// Enumerate the edges a terminator induces, switch cases merged per target
fn collect_edges(
    src: BlockLabel,
    term: &Terminator,
) -> EngineResult<BTreeMap<(BlockLabel, BlockLabel), Edge>> {
    let mut edges: BTreeMap<(BlockLabel, BlockLabel), Edge> = BTreeMap::new();
    match term {
        Terminator::Goto { target } => {
            edges.insert((src, *target), Edge::Goto);
        }
        Terminator::Branch {
            then_case,
            else_case,
            ..
        } => {
            edges.insert((src, *then_case), Edge::Branch(true));
            if else_case != then_case
                && edges
                    .insert((src, *else_case), Edge::Branch(false))
                    .is_some()
            {
                return Err(EngineError::InvariantViolation(
                    "duplicated edge in CFG".into(),
                ));
            }
        }
        Terminator::Switch {
            cond: _,
            cases,
            default,
        } => {
            for (case_id, case_block) in cases {
                let edge_switch = edges
                    .entry((src, *case_block))
                    .or_insert_with(|| Edge::Switch(BTreeSet::new()));
                match edge_switch {
                    Edge::Switch(set) => {
                        if !set.insert(Some(*case_id)) {
                            return Err(EngineError::InvariantViolation(
                                "duplicated edge in CFG".into(),
                            ));
                        }
                    }
                    Edge::Goto | Edge::Branch(..) => {
                        return Err(EngineError::InvariantViolation(
                            "unexpected edge type for switch statement".into(),
                        ));
                    }
                }
            }
            let edge_switch = edges
                .entry((src, *default))
                .or_insert_with(|| Edge::Switch(BTreeSet::new()));
            match edge_switch {
                Edge::Switch(set) => {
                    if !set.insert(None) {
                        return Err(EngineError::InvariantViolation(
                            "duplicated edge in CFG".into(),
                        ));
                    }
                }
                Edge::Goto | Edge::Branch(..) => {
                    return Err(EngineError::InvariantViolation(
                        "unexpected edge type for switch statement".into(),
                    ));
                }
            }
        }
        Terminator::Return { .. } | Terminator::Unreachable => (),
    }
    Ok(edges)
}

impl ControlFlowGraph {
    pub fn build(blocks: &[adapter::method::Block]) -> EngineResult<Self> {
        use adapter::method::Block as AdaptedBlock;

        if blocks.is_empty() {
            return Err(EngineError::InvalidAssumption(
                "a method must have at least one basic block".into(),
            ));
        }

        // construct block labels
        let block_labels: BTreeSet<BlockLabel> =
            blocks.iter().map(|b| BlockLabel::from(b.label)).collect();
        if block_labels.len() != blocks.len() {
            return Err(EngineError::InvariantViolation(
                "duplicated block labels".into(),
            ));
        }

        // create the context
        let ctxt = Context {
            blocks: block_labels,
        };

        // convert block by block
        let mut graph = DiGraph::new();
        let mut block_label_to_index = BTreeMap::new();
        let mut block_index_to_label = BTreeMap::new();
        let mut layout = vec![];
        let mut edges = BTreeMap::new();
        for block in blocks {
            let AdaptedBlock {
                label,
                body,
                terminator,
            } = block;
            let label = BlockLabel::from(label);

            let body_new = body
                .iter()
                .map(|inst| ctxt.parse_instruction(inst))
                .collect::<EngineResult<_>>()?;
            let terminator_new = ctxt.parse_terminator(terminator)?;

            edges.append(&mut collect_edges(label, &terminator_new)?);

            // construct the new block
            let block_new = Block {
                sequence: body_new,
                terminator: terminator_new,
            };
            let node_index = graph.add_node(block_new);
            block_label_to_index.insert(label, node_index);
            block_index_to_label.insert(node_index, label);
            layout.push(label);
        }

        // add the edges
        for ((src, dst), edge) in edges {
            let src_index = block_label_to_index.get(&src).unwrap();
            let dst_index = block_label_to_index.get(&dst).unwrap();
            graph.add_edge(*src_index, *dst_index, edge);
        }

        // done with the construction
        Ok(Self {
            graph,
            block_label_to_index,
            block_index_to_label,
            layout,
        })
    }

    pub fn entry_label(&self) -> BlockLabel {
        *self.layout.first().unwrap()
    }

    pub fn blocks(&self) -> &[BlockLabel] {
        &self.layout
    }

    pub fn get_block(&self, label: &BlockLabel) -> Option<&Block> {
        self.block_label_to_index
            .get(label)
            .and_then(|idx| self.graph.node_weight(*idx))
    }

    fn expect_index(&self, label: &BlockLabel) -> EngineResult<NodeIndex> {
        self.block_label_to_index.get(label).copied().ok_or_else(|| {
            EngineError::InvariantViolation(format!("no such block: {}", label))
        })
    }

    /// Successor blocks together with their edge tags
    pub fn successors(&self, label: &BlockLabel) -> Vec<(BlockLabel, &Edge)> {
        let index = match self.block_label_to_index.get(label) {
            None => return vec![],
            Some(index) => *index,
        };
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .map(|e| (self.label_of(e.target()), e.weight()))
            .collect()
    }

    fn label_of(&self, index: NodeIndex) -> BlockLabel {
        *self.block_index_to_label.get(&index).unwrap()
    }

    /// Blocks reachable from the entry, in reverse post-order
    pub fn reverse_post_order(&self) -> Vec<BlockLabel> {
        let entry = *self.block_label_to_index.get(&self.entry_label()).unwrap();
        let mut visited = BTreeSet::new();
        let mut order = vec![];

        // iterative depth-first post-order
        let mut stack = vec![(entry, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
                continue;
            }
            if !visited.insert(node) {
                continue;
            }
            stack.push((node, true));
            // visit successors in a deterministic order
            let mut succs: Vec<_> = self
                .graph
                .edges_directed(node, Direction::Outgoing)
                .map(|e| e.target())
                .collect();
            succs.sort();
            succs.dedup();
            for succ in succs.into_iter().rev() {
                if !visited.contains(&succ) {
                    stack.push((succ, false));
                }
            }
        }

        order.reverse();
        order.into_iter().map(|i| self.label_of(i)).collect()
    }

    /// Heads of loops: targets of edges that go against the reverse post-order
    pub fn loop_heads(&self) -> BTreeSet<BlockLabel> {
        let rpo = self.reverse_post_order();
        let position: BTreeMap<BlockLabel, usize> =
            rpo.iter().enumerate().map(|(i, l)| (*l, i)).collect();

        let mut heads = BTreeSet::new();
        for src in &rpo {
            for (dst, _) in self.successors(src) {
                match (position.get(src), position.get(&dst)) {
                    (Some(ps), Some(pd)) if pd <= ps => {
                        heads.insert(dst);
                    }
                    _ => (),
                }
            }
        }
        heads
    }

    /// The unique return block of the method, if there is exactly one
    pub fn exit_label(&self) -> Option<BlockLabel> {
        let mut found = None;
        for label in &self.layout {
            let block = self.get_block(label).unwrap();
            if matches!(block.terminator, Terminator::Return { .. }) {
                if found.is_some() {
                    return None;
                }
                found = Some(*label);
            }
        }
        found
    }

    /// Replace an instruction in the body of a block (transform phase)
    pub fn replace_instruction(
        &mut self,
        label: &BlockLabel,
        position: usize,
        inst: Instruction,
    ) -> EngineResult<()> {
        let index = self.expect_index(label)?;
        let block = self.graph.node_weight_mut(index).unwrap();
        match block.sequence.get_mut(position) {
            None => Err(EngineError::InvariantViolation(format!(
                "instruction position out of range in block {}",
                label
            ))),
            Some(slot) => {
                *slot = inst;
                Ok(())
            }
        }
    }

    /// Replace the terminator of a block and rebuild its outgoing edges
    pub fn rewrite_terminator(
        &mut self,
        label: &BlockLabel,
        term: Terminator,
    ) -> EngineResult<()> {
        let index = self.expect_index(label)?;
        let edges = collect_edges(*label, &term)?;

        // drop the stale edges one at a time, removal invalidates indices
        while let Some(edge) = self.graph.first_edge(index, Direction::Outgoing) {
            self.graph.remove_edge(edge);
        }

        // install the new terminator and its edges
        self.graph.node_weight_mut(index).unwrap().terminator = term;
        for ((_, dst), edge) in edges {
            let dst_index = self.expect_index(&dst)?;
            self.graph.add_edge(index, dst_index, edge);
        }
        Ok(())
    }
}

impl Display for ControlFlowGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for label in &self.layout {
            let block = self.get_block(label).unwrap();
            writeln!(f, ":{}", label)?;
            for inst in block.instructions() {
                writeln!(f, "  {}", inst)?;
            }
            writeln!(f, "  {}", block.terminator())?;
        }
        Ok(())
    }
}
