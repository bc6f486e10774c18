//! Externally-defined gate kinds.
//!
//! Gate kinds not built into the core op set are supplied by users of this
//! crate as a pair of callbacks: `build` constructs the gate while the
//! parser reads a source line whose op name is not a builtin, and `eval`
//! computes the gate's value from its argument values.  Entries are keyed
//! by name in the circuit's registry; an evaluator failure is reported as
//! a typed error, never encoded in the returned value.

use std::fmt;

use crate::ir::circuit::{Circuit, Error, Gate, Ref};

/// Builds a gate of this kind during parsing.  Receives the circuit under
/// construction and the argument refs from the source line, and returns
/// the ref of the gate it appended.
pub type BuildFn = Box<dyn Fn(&mut Circuit, &[Ref]) -> Result<Ref, Error> + Send + Sync>;

/// Evaluates a gate of this kind.  Receives the gate and the values of its
/// arguments; a returned `Err` surfaces as `Error::ExternalGateError`.
pub type EvalFn = Box<dyn Fn(&Gate, &[i64]) -> Result<i64, String> + Send + Sync>;

pub struct ExtGate {
    pub build: BuildFn,
    pub eval: EvalFn,
}

impl fmt::Debug for ExtGate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("ExtGate { .. }")
    }
}
