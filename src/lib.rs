pub mod ir;

pub mod analysis;
pub mod eval;
pub mod extgate;
pub mod parse;
pub mod serialize;
