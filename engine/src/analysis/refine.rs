//
// Edge refinement: what a branch outcome says about its operands
//

use crate::analysis::environment::ConstantState;
use crate::analysis::generic::AbstractDomain;
use crate::analysis::sign::Interval;
use crate::analysis::signed::SignedConstantDomain;
use crate::ir::bridge::instruction::{CondOp, Terminator};
use crate::ir::bridge::value::{BlockLabel, Register};

/// The sign interval implied by an inclusive upper bound
fn interval_from_upper(bound: i64) -> Interval {
    if bound < 0 {
        Interval::Ltz
    } else if bound == 0 {
        Interval::Lez
    } else {
        Interval::All
    }
}

/// The sign interval implied by an inclusive lower bound
fn interval_from_lower(bound: i64) -> Interval {
    if bound > 0 {
        Interval::Gtz
    } else if bound == 0 {
        Interval::Gez
    } else {
        Interval::All
    }
}

fn constrain(state: &ConstantState, reg: Register, interval: Interval) -> ConstantState {
    let mut next = state.clone();
    let refined = next
        .get_reg(reg)
        .meet(&SignedConstantDomain::from_interval(interval));
    next.set_reg(reg, refined);
    next
}

/// Constrain `a < b` (strictly) in the given state
fn constrain_less(state: &ConstantState, a: Register, b: Register) -> ConstantState {
    let va = state.get_reg(a);
    let vb = state.get_reg(b);
    let mut next = constrain(state, a, interval_from_upper(vb.max_element().saturating_sub(1)));
    next = constrain(&next, b, interval_from_lower(va.min_element().saturating_add(1)));
    next
}

/// Constrain `a <= b` in the given state
fn constrain_less_equal(state: &ConstantState, a: Register, b: Register) -> ConstantState {
    let va = state.get_reg(a);
    let vb = state.get_reg(b);
    let mut next = constrain(state, a, interval_from_upper(vb.max_element()));
    next = constrain(&next, b, interval_from_lower(va.min_element()));
    next
}

/// Constrain `a == b` in the given state
fn constrain_equal(state: &ConstantState, a: Register, b: Register) -> ConstantState {
    let met = state.get_reg(a).meet(&state.get_reg(b));
    let mut next = state.clone();
    next.set_reg(a, met);
    next.set_reg(b, met);
    next
}

/// Refine the end-of-block state along the taken and not-taken arms of a
/// conditional. Returns `(state_when_true, state_when_false)`.
pub fn refine_branch(
    state: &ConstantState,
    cond: CondOp,
    lhs: Register,
    rhs: Option<Register>,
) -> (ConstantState, ConstantState) {
    let rhs = match rhs {
        // compare-to-zero form: pure interval constraints on the operand
        None => {
            let (taken, not_taken) = match cond {
                CondOp::Eq => (Interval::Eqz, Interval::Nez),
                CondOp::Ne => (Interval::Nez, Interval::Eqz),
                CondOp::Lt => (Interval::Ltz, Interval::Gez),
                CondOp::Ge => (Interval::Gez, Interval::Ltz),
                CondOp::Gt => (Interval::Gtz, Interval::Lez),
                CondOp::Le => (Interval::Lez, Interval::Gtz),
            };
            return (
                constrain(state, lhs, taken),
                constrain(state, lhs, not_taken),
            );
        }
        Some(rhs) => rhs,
    };

    // both operands pinned: the branch evaluates concretely
    if let (Some(x), Some(y)) = (
        state.get_reg(lhs).get_constant(),
        state.get_reg(rhs).get_constant(),
    ) {
        return if cond.eval(x, y) {
            (state.clone(), ConstantState::bottom())
        } else {
            (ConstantState::bottom(), state.clone())
        };
    }

    match cond {
        CondOp::Eq => (constrain_equal(state, lhs, rhs), state.clone()),
        CondOp::Ne => (state.clone(), constrain_equal(state, lhs, rhs)),
        CondOp::Lt => (
            constrain_less(state, lhs, rhs),
            constrain_less_equal(state, rhs, lhs),
        ),
        CondOp::Ge => (
            constrain_less_equal(state, rhs, lhs),
            constrain_less(state, lhs, rhs),
        ),
        CondOp::Gt => (
            constrain_less(state, rhs, lhs),
            constrain_less_equal(state, lhs, rhs),
        ),
        CondOp::Le => (
            constrain_less_equal(state, lhs, rhs),
            constrain_less(state, rhs, lhs),
        ),
    }
}

/// The states flowing out of a block, one per successor edge. Arms refined
/// to bottom are unreachable; the caller prunes them.
pub fn successor_states(
    term: &Terminator,
    state: &ConstantState,
) -> Vec<(BlockLabel, ConstantState)> {
    match term {
        Terminator::Goto { target } => vec![(*target, state.clone())],
        Terminator::Branch {
            cond,
            lhs,
            rhs,
            then_case,
            else_case,
        } => {
            // arms landing on the same block give no information at the
            // merge; refining there would be unsound
            if then_case == else_case {
                return vec![(*then_case, state.clone())];
            }
            let (when_true, when_false) = refine_branch(state, *cond, *lhs, *rhs);
            vec![(*then_case, when_true), (*else_case, when_false)]
        }
        Terminator::Switch {
            cond,
            cases,
            default,
        } => {
            let mut out = vec![];
            for (value, target) in cases {
                let mut case_state = state.clone();
                let met = case_state
                    .get_reg(*cond)
                    .meet(&SignedConstantDomain::from_value(*value));
                case_state.set_reg(*cond, met);
                out.push((*target, case_state));
            }
            out.push((*default, state.clone()));
            out
        }
        Terminator::Return { .. } | Terminator::Unreachable => vec![],
    }
}
