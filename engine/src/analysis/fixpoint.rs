//
// Worklist fixpoint over the control-flow graph
//

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};

use crate::analysis::environment::ConstantState;
use crate::analysis::generic::AbstractDomain;
use crate::analysis::refine::successor_states;
use crate::analysis::transfer::transfer_block;
use crate::analysis::ConstPropConfig;
use crate::error::{EngineError, EngineResult};
use crate::ir::bridge::cfg::ControlFlowGraph;
use crate::ir::bridge::value::BlockLabel;

/// Bound on visits per block; the domain stabilizes in a handful of rounds,
/// so running into this means the widening is broken
const ITERATION_FACTOR: usize = 64;

/// Forward dataflow driver for one method
pub struct FixpointIterator<'a> {
    cfg: &'a ControlFlowGraph,
    config: ConstPropConfig,
}

/// The converged analysis result: one entry state per reachable block
pub struct Fixpoint {
    config: ConstPropConfig,
    entry_states: BTreeMap<BlockLabel, ConstantState>,
}

impl<'a> FixpointIterator<'a> {
    pub fn new(cfg: &'a ControlFlowGraph, config: ConstPropConfig) -> Self {
        Self { cfg, config }
    }

    /// Iterate to a fixpoint from the given state at the entry block
    pub fn run(self, entry: ConstantState) -> EngineResult<Fixpoint> {
        let Self { cfg, config } = self;

        // schedule blocks by reverse post-order, widening at loop heads
        let order = cfg.reverse_post_order();
        let position: BTreeMap<BlockLabel, usize> =
            order.iter().enumerate().map(|(i, l)| (*l, i)).collect();
        let loop_heads = cfg.loop_heads();

        let mut entry_states = BTreeMap::new();
        entry_states.insert(cfg.entry_label(), entry);

        let mut worklist: BTreeSet<(usize, BlockLabel)> = BTreeSet::new();
        worklist.insert((0, cfg.entry_label()));

        let cap = ITERATION_FACTOR * order.len();
        let mut steps = 0;

        while let Some((_, label)) = worklist.pop_first() {
            steps += 1;
            if steps > cap {
                return Err(EngineError::NonConvergence(format!(
                    "dataflow did not stabilize after {} block visits",
                    steps
                )));
            }

            let block = cfg.get_block(&label).ok_or_else(|| {
                EngineError::InvariantViolation(format!("no such block: {}", label))
            })?;
            let entry_state = entry_states
                .get(&label)
                .cloned()
                .unwrap_or_else(ConstantState::bottom);
            let exit_state = transfer_block(block, &entry_state, &config);
            trace!("visit {} (round {})", label, steps);

            for (succ, refined) in successor_states(block.terminator(), &exit_state) {
                if refined.is_bottom() {
                    // the branch semantics rule this edge out
                    continue;
                }
                let old = entry_states
                    .get(&succ)
                    .cloned()
                    .unwrap_or_else(ConstantState::bottom);
                let joined = old.join(&refined);
                let new = if loop_heads.contains(&succ) && !old.is_bottom() {
                    joined.widen(&old)
                } else {
                    joined
                };
                if new != old {
                    entry_states.insert(succ, new);
                    if let Some(rank) = position.get(&succ) {
                        worklist.insert((*rank, succ));
                    }
                }
            }
        }

        debug!("fixpoint converged after {} block visits", steps);
        Ok(Fixpoint {
            config,
            entry_states,
        })
    }
}

impl Fixpoint {
    pub fn config(&self) -> &ConstPropConfig {
        &self.config
    }

    /// State holding at the entry of a block (bottom when unreachable)
    pub fn entry_state_at(&self, label: &BlockLabel) -> ConstantState {
        self.entry_states
            .get(label)
            .cloned()
            .unwrap_or_else(ConstantState::bottom)
    }

    /// State holding after the last instruction of a block, recomputed by
    /// replaying the block body
    pub fn exit_state_at(&self, cfg: &ControlFlowGraph, label: &BlockLabel) -> ConstantState {
        match cfg.get_block(label) {
            None => ConstantState::bottom(),
            Some(block) => transfer_block(block, &self.entry_state_at(label), &self.config),
        }
    }
}
