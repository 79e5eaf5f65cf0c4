pub use error::EngineError;

use crate::analysis::environment::ConstantState;
use crate::analysis::fixpoint::FixpointIterator;
use crate::analysis::generic::AbstractDomain;
use crate::analysis::transform::Transform;
use crate::analysis::ConstPropConfig;
use crate::error::EngineResult;
use crate::ir::bridge::function::Function;

pub mod analysis;
mod error;
pub mod ir;

/// Main entrypoint: run the propagation to a fixpoint over a method and
/// rewrite its body in place
pub fn optimize(function: &mut Function, config: ConstPropConfig) -> EngineResult<()> {
    let fixpoint = FixpointIterator::new(&function.body, config).run(ConstantState::top())?;
    Transform::new(config).apply(&fixpoint, function)
}
