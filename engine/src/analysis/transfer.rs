//
// Abstract transfer: one instruction against one dataflow state
//

use crate::analysis::environment::ConstantState;
use crate::analysis::generic::AbstractDomain;
use crate::analysis::sign::Interval;
use crate::analysis::signed::SignedConstantDomain;
use crate::analysis::ConstPropConfig;
use crate::ir::bridge::cfg::Block;
use crate::ir::bridge::instruction::{BinaryOpArith, Instruction};
use crate::ir::bridge::value::RESULT_REGISTER;

/// Interpret one instruction over the signed-constant state
pub fn step(state: &ConstantState, inst: &Instruction, config: &ConstPropConfig) -> ConstantState {
    if state.is_bottom() {
        return state.clone();
    }
    let mut next = state.clone();

    match inst {
        Instruction::Nop => (),
        Instruction::Const { dst, value } => {
            next.set_reg(*dst, SignedConstantDomain::from_value(*value));
        }
        Instruction::Move { dst, src } => {
            let value = next.get_reg(*src);
            next.set_reg(*dst, value);
        }
        Instruction::MoveResult { dst } => {
            let value = next.get_reg(RESULT_REGISTER);
            next.set_reg(*dst, value);
        }
        Instruction::LoadParam { dst } => {
            next.set_reg(*dst, SignedConstantDomain::top());
        }
        Instruction::CmpLong { dst, lhs, rhs } => {
            let value = cmp_long(next.get_reg(*lhs), next.get_reg(*rhs));
            next.set_reg(*dst, value);
        }
        Instruction::LitOp { op, dst, src, lit } => {
            let value = if config.fold_arithmetic {
                fold_literal(*op, next.get_reg(*src), *lit)
            } else {
                SignedConstantDomain::top()
            };
            next.set_reg(*dst, value);
        }
        Instruction::BinOp { dst, .. } => {
            next.set_reg(*dst, SignedConstantDomain::top());
        }
        Instruction::Invoke { .. } => {
            // the callee may write any static field
            next.clear_fields();
            next.set_reg(RESULT_REGISTER, SignedConstantDomain::top());
        }
        Instruction::StaticGet { dst, field } => {
            let value = if config.track_static_fields {
                next.get_field(*field)
            } else {
                SignedConstantDomain::top()
            };
            next.set_reg(*dst, value);
        }
        Instruction::StaticPut { src, field } => {
            if config.track_static_fields {
                let value = next.get_reg(*src);
                next.set_field(*field, value);
            }
        }
    }

    // the result register lives only across its defining instruction
    if !matches!(inst, Instruction::Invoke { .. }) {
        next.set_reg(RESULT_REGISTER, SignedConstantDomain::top());
    }
    next
}

/// Interpret a whole block body starting from its entry state
pub fn transfer_block(
    block: &Block,
    entry: &ConstantState,
    config: &ConstPropConfig,
) -> ConstantState {
    block
        .instructions()
        .iter()
        .fold(entry.clone(), |state, inst| step(&state, inst, config))
}

/// The -1 / 0 / 1 outcome of a three-way comparison
fn cmp_long(lhs: SignedConstantDomain, rhs: SignedConstantDomain) -> SignedConstantDomain {
    if lhs.is_bottom() || rhs.is_bottom() {
        return SignedConstantDomain::bottom();
    }
    if let (Some(x), Some(y)) = (lhs.get_constant(), rhs.get_constant()) {
        return SignedConstantDomain::from_value(match x.cmp(&y) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        });
    }
    if lhs.max_element() < rhs.min_element() {
        SignedConstantDomain::from_value(-1)
    } else if lhs.min_element() > rhs.max_element() {
        SignedConstantDomain::from_value(1)
    } else if lhs.max_element() <= rhs.min_element() {
        SignedConstantDomain::from_interval(Interval::Lez)
    } else if lhs.min_element() >= rhs.max_element() {
        SignedConstantDomain::from_interval(Interval::Gez)
    } else {
        SignedConstantDomain::top()
    }
}

/// Literal arithmetic in 32-bit signed semantics. Sources outside i32 and
/// any overflow are not modeled and leave the destination unknown.
fn fold_literal(op: BinaryOpArith, src: SignedConstantDomain, lit: i32) -> SignedConstantDomain {
    let Some(wide) = src.get_constant() else {
        return SignedConstantDomain::top();
    };
    let Ok(value) = i32::try_from(wide) else {
        return SignedConstantDomain::top();
    };
    let folded = match op {
        BinaryOpArith::Add => value.checked_add(lit),
        BinaryOpArith::Sub => value.checked_sub(lit),
        BinaryOpArith::Rsub => lit.checked_sub(value),
        BinaryOpArith::Mul => value.checked_mul(lit),
        BinaryOpArith::Div => value.checked_div(lit),
        BinaryOpArith::Rem => value.checked_rem(lit),
        BinaryOpArith::And => Some(value & lit),
        BinaryOpArith::Or => Some(value | lit),
        BinaryOpArith::Xor => Some(value ^ lit),
    };
    match folded {
        Some(result) => SignedConstantDomain::from_value(i64::from(result)),
        None => SignedConstantDomain::top(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::bridge::value::Register;

    fn reg(n: u32) -> Register {
        Register::from(n)
    }

    fn with_const(state: &mut ConstantState, n: u32, v: i64) {
        state.set_reg(reg(n), SignedConstantDomain::from_value(v));
    }

    #[test]
    fn const_and_move() {
        let config = ConstPropConfig::default();
        let mut state = ConstantState::top();
        state = step(&state, &Instruction::Const { dst: reg(0), value: 7 }, &config);
        state = step(&state, &Instruction::Move { dst: reg(1), src: reg(0) }, &config);
        assert_eq!(state.get_reg(reg(1)).get_constant(), Some(7));
    }

    #[test]
    fn result_register_is_consumed_once() {
        let config = ConstPropConfig::default();
        let mut state = ConstantState::top();
        state.set_reg(RESULT_REGISTER, SignedConstantDomain::from_value(3));
        // any non-defining instruction clobbers the pending result
        state = step(&state, &Instruction::Nop, &config);
        assert!(state.get_reg(RESULT_REGISTER).is_top());

        state = step(
            &state,
            &Instruction::Invoke {
                callee: "callee".into(),
                args: vec![],
            },
            &config,
        );
        state = step(&state, &Instruction::MoveResult { dst: reg(0) }, &config);
        assert!(state.get_reg(reg(0)).is_top());
        assert!(state.get_reg(RESULT_REGISTER).is_top());
    }

    #[test]
    fn cmp_long_on_constants() {
        let config = ConstPropConfig::default();
        let mut state = ConstantState::top();
        with_const(&mut state, 0, 0);
        with_const(&mut state, 1, 1);
        state = step(
            &state,
            &Instruction::CmpLong {
                dst: reg(2),
                lhs: reg(0),
                rhs: reg(1),
            },
            &config,
        );
        assert_eq!(state.get_reg(reg(2)).get_constant(), Some(-1));
    }

    #[test]
    fn cmp_long_on_intervals() {
        let negative = SignedConstantDomain::from_interval(Interval::Ltz);
        let zero = SignedConstantDomain::from_value(0);
        assert_eq!(cmp_long(negative, zero).get_constant(), Some(-1));

        let nonneg = SignedConstantDomain::from_interval(Interval::Gez);
        assert_eq!(cmp_long(nonneg, zero).interval(), Interval::Gez);

        let top = SignedConstantDomain::top();
        assert!(cmp_long(top, zero).is_top());
    }

    #[test]
    fn literal_arithmetic_folds_when_enabled() {
        let config = ConstPropConfig {
            fold_arithmetic: true,
            ..Default::default()
        };
        let mut state = ConstantState::top();
        with_const(&mut state, 0, 41);
        let folded = step(
            &state,
            &Instruction::LitOp {
                op: BinaryOpArith::Add,
                dst: reg(1),
                src: reg(0),
                lit: 1,
            },
            &config,
        );
        assert_eq!(folded.get_reg(reg(1)).get_constant(), Some(42));

        // disabled by default
        let unfolded = step(
            &state,
            &Instruction::LitOp {
                op: BinaryOpArith::Add,
                dst: reg(1),
                src: reg(0),
                lit: 1,
            },
            &ConstPropConfig::default(),
        );
        assert!(unfolded.get_reg(reg(1)).is_top());
    }

    #[test]
    fn literal_arithmetic_leaves_overflow_alone() {
        let config = ConstPropConfig {
            fold_arithmetic: true,
            ..Default::default()
        };
        let mut state = ConstantState::top();
        with_const(&mut state, 0, i64::from(i32::MAX));
        let state = step(
            &state,
            &Instruction::LitOp {
                op: BinaryOpArith::Add,
                dst: reg(1),
                src: reg(0),
                lit: 1,
            },
            &config,
        );
        assert!(state.get_reg(reg(1)).is_top());

        // sources wider than 32 bits are not modeled either
        let mut wide = ConstantState::top();
        with_const(&mut wide, 0, i64::from(i32::MAX) + 1);
        let wide = step(
            &wide,
            &Instruction::LitOp {
                op: BinaryOpArith::Add,
                dst: reg(1),
                src: reg(0),
                lit: 1,
            },
            &config,
        );
        assert!(wide.get_reg(reg(1)).is_top());
    }

    #[test]
    fn static_fields_only_under_the_flag() {
        let field = crate::ir::bridge::value::FieldSlot::from(0);
        let tracking = ConstPropConfig {
            track_static_fields: true,
            ..Default::default()
        };

        let mut state = ConstantState::top();
        with_const(&mut state, 0, 5);
        let put = Instruction::StaticPut {
            src: reg(0),
            field,
        };
        let get = Instruction::StaticGet {
            dst: reg(1),
            field,
        };

        let stored = step(&state, &put, &tracking);
        let loaded = step(&stored, &get, &tracking);
        assert_eq!(loaded.get_reg(reg(1)).get_constant(), Some(5));

        // a call can write any static field
        let called = step(
            &stored,
            &Instruction::Invoke {
                callee: "callee".into(),
                args: vec![],
            },
            &tracking,
        );
        let reloaded = step(&called, &get, &tracking);
        assert!(reloaded.get_reg(reg(1)).is_top());

        // without the flag nothing is remembered
        let config = ConstPropConfig::default();
        let stored = step(&state, &put, &config);
        let loaded = step(&stored, &get, &config);
        assert!(loaded.get_reg(reg(1)).is_top());
    }
}
