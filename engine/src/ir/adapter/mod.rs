pub mod instruction;
pub mod method;
