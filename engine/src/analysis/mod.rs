//
// Constant propagation as abstract interpretation
//
pub mod constant;
pub mod environment;
pub mod fixpoint;
pub mod generic;
pub mod refine;
pub mod sign;
pub mod signed;
pub mod transfer;
pub mod transform;

/// Knobs of the propagation pass; everything defaults to off
#[derive(Copy, Clone, Default, Debug)]
pub struct ConstPropConfig {
    /// Fold arithmetic over inline literals
    pub fold_arithmetic: bool,
    /// Track the values of static fields alongside registers
    pub track_static_fields: bool,
}
