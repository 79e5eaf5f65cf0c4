use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::error::{EngineError, EngineResult};
use crate::ir::adapter;
use crate::ir::bridge::cfg::ControlFlowGraph;
use crate::ir::bridge::instruction::Instruction;
use crate::ir::bridge::value::{Register, RESULT_REGISTER};

/// A validated method, body held as a CFG
#[derive(Eq, PartialEq)]
pub struct Function {
    /// method name
    pub name: String,
    /// registers holding the incoming parameters, in declaration order
    pub param_regs: Vec<Register>,
    /// body of the method (in terms of a CFG)
    pub body: ControlFlowGraph,
}

impl Function {
    pub fn convert(method: &adapter::method::Method) -> EngineResult<Self> {
        let adapter::method::Method {
            name,
            params,
            blocks,
        } = method;

        // convert the parameter declarations
        let param_regs: Vec<Register> = params.iter().map(Register::from).collect();
        let declared: BTreeSet<Register> = param_regs.iter().copied().collect();
        if declared.len() != param_regs.len() {
            return Err(EngineError::InvalidAssumption(format!(
                "duplicated parameter register in method: {}",
                name
            )));
        }
        if declared.contains(&RESULT_REGISTER) {
            return Err(EngineError::InvalidAssumption(format!(
                "the result register cannot hold a parameter in method: {}",
                name
            )));
        }

        let body = ControlFlowGraph::build(blocks)?;

        // every load-param must name a declared parameter register
        for label in body.blocks() {
            let block = body.get_block(label).unwrap();
            for inst in block.instructions() {
                if let Instruction::LoadParam { dst } = inst {
                    if !declared.contains(dst) {
                        return Err(EngineError::InvalidAssumption(format!(
                            "load-param on undeclared register {} in method: {}",
                            dst, name
                        )));
                    }
                }
            }
        }

        Ok(Self {
            name: name.clone(),
            param_regs,
            body,
        })
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "method {}", self.name)?;
        for reg in &self.param_regs {
            write!(f, " {}", reg)?;
        }
        writeln!(f)?;
        write!(f, "{}", self.body)
    }
}
