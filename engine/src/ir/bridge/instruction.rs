use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use crate::error::{EngineError, EngineResult};
use crate::ir::adapter;
use crate::ir::bridge::value::{BlockLabel, FieldSlot, Register};

/// Arithmetic opcodes shared by the literal and register-register forms
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum BinaryOpArith {
    Add,
    Sub,
    Rsub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
}

impl BinaryOpArith {
    fn parse(op: &str) -> EngineResult<Self> {
        let parsed = match op {
            "add" => Self::Add,
            "sub" => Self::Sub,
            "rsub" => Self::Rsub,
            "mul" => Self::Mul,
            "div" => Self::Div,
            "rem" => Self::Rem,
            "and" => Self::And,
            "or" => Self::Or,
            "xor" => Self::Xor,
            _ => {
                return Err(EngineError::InvalidAssumption(format!(
                    "unknown arithmetic opcode: {}",
                    op
                )));
            }
        };
        Ok(parsed)
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Rsub => "rsub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Rem => "rem",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
        }
    }
}

/// Comparison operators of a two-way conditional branch
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum CondOp {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl CondOp {
    fn parse(op: &str) -> EngineResult<Self> {
        let parsed = match op {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "lt" => Self::Lt,
            "ge" => Self::Ge,
            "gt" => Self::Gt,
            "le" => Self::Le,
            _ => {
                return Err(EngineError::InvalidAssumption(format!(
                    "unknown branch condition: {}",
                    op
                )));
            }
        };
        Ok(parsed)
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Gt => "gt",
            Self::Le => "le",
        }
    }

    /// Evaluate the comparison on concrete values
    pub fn eval(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Ge => lhs >= rhs,
            Self::Gt => lhs > rhs,
            Self::Le => lhs <= rhs,
        }
    }
}

/// A validated in-block instruction
#[derive(Eq, PartialEq, Clone, Debug)]
pub enum Instruction {
    Nop,
    /// load an immediate
    Const { dst: Register, value: i64 },
    /// register-to-register copy
    Move { dst: Register, src: Register },
    /// consume the implicit result register
    MoveResult { dst: Register },
    /// bind an incoming parameter (value unknown to the analysis)
    LoadParam { dst: Register },
    /// three-way comparison, writes -1 / 0 / 1
    CmpLong {
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    /// arithmetic against an inline literal
    LitOp {
        op: BinaryOpArith,
        dst: Register,
        src: Register,
        lit: i32,
    },
    /// arithmetic between registers
    BinOp {
        op: BinaryOpArith,
        dst: Register,
        lhs: Register,
        rhs: Register,
    },
    /// call; the return value lands in the implicit result register
    Invoke { callee: String, args: Vec<Register> },
    StaticGet { dst: Register, field: FieldSlot },
    StaticPut { src: Register, field: FieldSlot },
}

impl Instruction {
    /// The register this instruction writes, if any
    pub fn dest(&self) -> Option<Register> {
        match self {
            Self::Nop | Self::Invoke { .. } | Self::StaticPut { .. } => None,
            Self::Const { dst, .. }
            | Self::Move { dst, .. }
            | Self::MoveResult { dst }
            | Self::LoadParam { dst }
            | Self::CmpLong { dst, .. }
            | Self::LitOp { dst, .. }
            | Self::BinOp { dst, .. }
            | Self::StaticGet { dst, .. } => Some(*dst),
        }
    }
}

/// A validated block terminator
#[derive(Eq, PartialEq, Clone, Debug)]
pub enum Terminator {
    /// unconditional jump
    Goto { target: BlockLabel },
    /// two-way conditional; `rhs: None` compares against zero
    Branch {
        cond: CondOp,
        lhs: Register,
        rhs: Option<Register>,
        then_case: BlockLabel,
        else_case: BlockLabel,
    },
    /// multi-way dispatch on the scrutinee value
    Switch {
        cond: Register,
        cases: BTreeMap<i64, BlockLabel>,
        default: BlockLabel,
    },
    /// method return
    Return { val: Option<Register> },
    /// enters an unreachable state
    Unreachable,
}

/// A context manager for converting instructions
pub struct Context {
    pub blocks: BTreeSet<BlockLabel>,
}

impl Context {
    fn check_target(&self, label: usize) -> EngineResult<BlockLabel> {
        let target = BlockLabel::from(label);
        if !self.blocks.contains(&target) {
            return Err(EngineError::InvalidAssumption(format!(
                "branch target does not name a block: {}",
                label
            )));
        }
        Ok(target)
    }

    /// convert an in-block instruction
    pub fn parse_instruction(&self, inst: &adapter::instruction::Inst) -> EngineResult<Instruction> {
        use adapter::instruction::Inst as AdaptedInst;

        let converted = match inst {
            AdaptedInst::Nop => Instruction::Nop,
            AdaptedInst::Const { dst, value } => Instruction::Const {
                dst: dst.into(),
                value: *value,
            },
            AdaptedInst::Move { dst, src } => Instruction::Move {
                dst: dst.into(),
                src: src.into(),
            },
            AdaptedInst::MoveResult { dst } => Instruction::MoveResult { dst: dst.into() },
            AdaptedInst::LoadParam { dst } => Instruction::LoadParam { dst: dst.into() },
            AdaptedInst::CmpLong { dst, lhs, rhs } => Instruction::CmpLong {
                dst: dst.into(),
                lhs: lhs.into(),
                rhs: rhs.into(),
            },
            AdaptedInst::LitOp { op, dst, src, lit } => Instruction::LitOp {
                op: BinaryOpArith::parse(op)?,
                dst: dst.into(),
                src: src.into(),
                lit: *lit,
            },
            AdaptedInst::BinOp { op, dst, lhs, rhs } => {
                let op_new = BinaryOpArith::parse(op)?;
                if matches!(op_new, BinaryOpArith::Rsub) {
                    return Err(EngineError::InvalidAssumption(
                        "rsub exists only in literal form".into(),
                    ));
                }
                Instruction::BinOp {
                    op: op_new,
                    dst: dst.into(),
                    lhs: lhs.into(),
                    rhs: rhs.into(),
                }
            }
            AdaptedInst::Invoke { callee, args } => Instruction::Invoke {
                callee: callee.clone(),
                args: args.iter().map(Register::from).collect(),
            },
            AdaptedInst::StaticGet { dst, field } => Instruction::StaticGet {
                dst: dst.into(),
                field: field.into(),
            },
            AdaptedInst::StaticPut { src, field } => Instruction::StaticPut {
                src: src.into(),
                field: field.into(),
            },
            AdaptedInst::Goto { .. }
            | AdaptedInst::Branch { .. }
            | AdaptedInst::Switch { .. }
            | AdaptedInst::Return { .. }
            | AdaptedInst::Unreachable => {
                return Err(EngineError::InvariantViolation(
                    "terminator in the middle of a block".into(),
                ));
            }
        };
        Ok(converted)
    }

    /// convert an instruction to a terminator
    pub fn parse_terminator(&self, inst: &adapter::instruction::Inst) -> EngineResult<Terminator> {
        use adapter::instruction::Inst as AdaptedInst;

        let term = match inst {
            AdaptedInst::Goto { target } => Terminator::Goto {
                target: self.check_target(*target)?,
            },
            AdaptedInst::Branch {
                cond,
                lhs,
                rhs,
                then_case,
                else_case,
            } => Terminator::Branch {
                cond: CondOp::parse(cond)?,
                lhs: lhs.into(),
                rhs: rhs.as_ref().map(Register::from),
                then_case: self.check_target(*then_case)?,
                else_case: self.check_target(*else_case)?,
            },
            AdaptedInst::Switch {
                cond,
                cases,
                default,
            } => {
                let mut cases_new = BTreeMap::new();
                for (value, target) in cases {
                    if cases_new
                        .insert(*value, self.check_target(*target)?)
                        .is_some()
                    {
                        return Err(EngineError::InvalidAssumption(format!(
                            "duplicated switch case: {}",
                            value
                        )));
                    }
                }
                Terminator::Switch {
                    cond: cond.into(),
                    cases: cases_new,
                    default: self.check_target(*default)?,
                }
            }
            AdaptedInst::Return { val } => Terminator::Return {
                val: val.as_ref().map(Register::from),
            },
            AdaptedInst::Unreachable => Terminator::Unreachable,
            // explicitly list the rest of the instructions
            AdaptedInst::Nop
            | AdaptedInst::Const { .. }
            | AdaptedInst::Move { .. }
            | AdaptedInst::MoveResult { .. }
            | AdaptedInst::LoadParam { .. }
            | AdaptedInst::CmpLong { .. }
            | AdaptedInst::LitOp { .. }
            | AdaptedInst::BinOp { .. }
            | AdaptedInst::Invoke { .. }
            | AdaptedInst::StaticGet { .. }
            | AdaptedInst::StaticPut { .. } => {
                return Err(EngineError::InvariantViolation(
                    "malformed block with non-terminator instruction".into(),
                ));
            }
        };
        Ok(term)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nop => write!(f, "nop"),
            Self::Const { dst, value } => write!(f, "const {} {}", dst, value),
            Self::Move { dst, src } => write!(f, "move {} {}", dst, src),
            Self::MoveResult { dst } => write!(f, "move-result {}", dst),
            Self::LoadParam { dst } => write!(f, "load-param {}", dst),
            Self::CmpLong { dst, lhs, rhs } => write!(f, "cmp-long {} {} {}", dst, lhs, rhs),
            Self::LitOp { op, dst, src, lit } => {
                write!(f, "{}-int/lit8 {} {} {}", op.mnemonic(), dst, src, lit)
            }
            Self::BinOp { op, dst, lhs, rhs } => {
                write!(f, "{}-int {} {} {}", op.mnemonic(), dst, lhs, rhs)
            }
            Self::Invoke { callee, args } => {
                write!(f, "invoke-static {}", callee)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            Self::StaticGet { dst, field } => write!(f, "sget {} {}", dst, field),
            Self::StaticPut { src, field } => write!(f, "sput {} {}", src, field),
        }
    }
}

impl Display for Terminator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Goto { target } => write!(f, "goto :{}", target),
            Self::Branch {
                cond,
                lhs,
                rhs,
                then_case,
                else_case,
            } => match rhs {
                None => write!(
                    f,
                    "if-{}z {} :{} :{}",
                    cond.mnemonic(),
                    lhs,
                    then_case,
                    else_case
                ),
                Some(rhs) => write!(
                    f,
                    "if-{} {} {} :{} :{}",
                    cond.mnemonic(),
                    lhs,
                    rhs,
                    then_case,
                    else_case
                ),
            },
            Self::Switch {
                cond,
                cases,
                default,
            } => {
                write!(f, "switch {}", cond)?;
                for (value, target) in cases {
                    write!(f, " {} :{}", value, target)?;
                }
                write!(f, " default :{}", default)
            }
            Self::Return { val } => match val {
                None => write!(f, "return-void"),
                Some(reg) => write!(f, "return {}", reg),
            },
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}
