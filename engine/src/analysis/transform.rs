//
// Rewrite pass: fold decided values and branches back into the IR
//

use log::debug;

use crate::analysis::fixpoint::Fixpoint;
use crate::analysis::generic::AbstractDomain;
use crate::analysis::refine::refine_branch;
use crate::analysis::transfer::step;
use crate::analysis::ConstPropConfig;
use crate::error::EngineResult;
use crate::ir::bridge::function::Function;
use crate::ir::bridge::instruction::{Instruction, Terminator};

/// Applies the converged analysis to the method body. Instructions whose
/// output is pinned to a single value become constant loads; conditional
/// branches with a decided outcome become unconditional jumps.
pub struct Transform {
    config: ConstPropConfig,
}

impl Transform {
    pub fn new(config: ConstPropConfig) -> Self {
        Self { config }
    }

    pub fn apply(&self, fixpoint: &Fixpoint, function: &mut Function) -> EngineResult<()> {
        let labels: Vec<_> = function.body.blocks().to_vec();
        let mut folded = 0usize;
        let mut redirected = 0usize;

        for label in labels {
            let entry_state = fixpoint.entry_state_at(&label);
            if entry_state.is_bottom() {
                // unreachable; leave the block alone
                continue;
            }

            // replay the block and collect the rewrites, applied afterwards
            let block = function.body.get_block(&label).unwrap();
            let mut state = entry_state;
            let mut rewrites = vec![];
            for (position, inst) in block.instructions().iter().enumerate() {
                let next = step(&state, inst, &self.config);
                if let Some(dst) = inst.dest() {
                    if !dst.is_result() {
                        if let Some(value) = next.get_reg(dst).get_constant() {
                            let replacement = Instruction::Const { dst, value };
                            if *inst != replacement {
                                rewrites.push((position, replacement));
                            }
                        }
                    }
                }
                state = next;
            }

            // a branch whose arms coincide decides nothing and stays as-is
            let redirect = match block.terminator() {
                Terminator::Branch {
                    cond,
                    lhs,
                    rhs,
                    then_case,
                    else_case,
                } if then_case != else_case => {
                    let (when_true, when_false) = refine_branch(&state, *cond, *lhs, *rhs);
                    if when_false.is_bottom() && !when_true.is_bottom() {
                        Some(Terminator::Goto { target: *then_case })
                    } else if when_true.is_bottom() && !when_false.is_bottom() {
                        Some(Terminator::Goto { target: *else_case })
                    } else {
                        None
                    }
                }
                _ => None,
            };

            folded += rewrites.len();
            for (position, inst) in rewrites {
                function.body.replace_instruction(&label, position, inst)?;
            }
            if let Some(term) = redirect {
                function.body.rewrite_terminator(&label, term)?;
                redirected += 1;
            }
        }

        debug!(
            "transform folded {} instructions, redirected {} branches",
            folded, redirected
        );
        Ok(())
    }
}
