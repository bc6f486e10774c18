//! Text-format writer and sage exporter.
//!
//! `write` emits the format read by `crate::parse`: stored test vectors
//! first, then one line per gate in ascending ref order, then the output
//! and secret lists.  Circuits containing `External` gates have no text
//! form and are rejected.

use std::fmt;
use std::io::{self, Write};

use crate::ir::circuit::{Circuit, Error, GateKind, Ref};
use crate::ir::walk;

#[derive(Debug)]
pub enum WriteError {
    Io(io::Error),
    Circuit(Error),
    /// A stored test value doesn't fit the single-digit test encoding.
    UnencodableTest(i64),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            WriteError::Io(ref e) => write!(f, "write failed: {}", e),
            WriteError::Circuit(ref e) => e.fmt(f),
            WriteError::UnencodableTest(v) =>
                write!(f, "test value {} can't be encoded as a digit", v),
        }
    }
}

impl std::error::Error for WriteError {}

impl From<io::Error> for WriteError {
    fn from(e: io::Error) -> WriteError {
        WriteError::Io(e)
    }
}

impl From<Error> for WriteError {
    fn from(e: Error) -> WriteError {
        WriteError::Circuit(e)
    }
}

/// Render test values as a digit string, index 0 rightmost.
fn digits(vals: &[i64]) -> Result<String, WriteError> {
    let mut s = String::with_capacity(vals.len());
    for &v in vals.iter().rev() {
        if v < 0 || v > 9 {
            return Err(WriteError::UnencodableTest(v));
        }
        s.push((b'0' + v as u8) as char);
    }
    Ok(s)
}

/// Write `c` in the text format.  Re-parsing the output yields a circuit
/// with the same refs, outputs, and evaluation behavior.
pub fn write<W: Write>(c: &Circuit, w: &mut W) -> Result<(), WriteError> {
    for t in c.tests() {
        writeln!(w, ": test {} {}", digits(&t.inputs)?, digits(&t.outputs)?)?;
    }

    for (r, gate) in c.gates().iter().enumerate() {
        match gate.kind {
            GateKind::Input(wire) => writeln!(w, "{} input {}", r, wire)?,
            GateKind::Const(v) => writeln!(w, "{} const {}", r, v)?,
            GateKind::Add(_) | GateKind::Sub(_) | GateKind::Mul(_) | GateKind::Set(_) => {
                write!(w, "{} {}", r, gate.kind.op_name())?;
                for &arg in gate.kind.args() {
                    write!(w, " {}", arg)?;
                }
                writeln!(w)?;
            },
            GateKind::External { .. } =>
                return Err(Error::ExternalUnsupported { at: r }.into()),
        }
    }

    if !c.outputs().is_empty() {
        write!(w, ": outputs")?;
        for &r in c.outputs() {
            write!(w, " {}", r)?;
        }
        writeln!(w)?;
    }
    if !c.secrets().is_empty() {
        write!(w, ": secrets")?;
        for &r in c.secrets() {
            write!(w, " {}", r)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Render the polynomial computed at `root` as a sage expression, with
/// inputs as `var('x<i>')`.  N-ary gates fold left; `Set` is transparent.
pub fn to_sage(c: &Circuit, root: Ref) -> Result<String, Error> {
    let order = walk::topo_order(c, root)?;
    let mut exprs = vec![String::new(); c.nrefs()];
    for &r in &order {
        let gate = c.gate(r)?;
        exprs[r] = match gate.kind {
            GateKind::Input(wire) => format!("var('x{}')", wire),
            GateKind::Const(v) => v.to_string(),
            GateKind::Add(_) | GateKind::Sub(_) | GateKind::Mul(_) => {
                let ch = match gate.kind {
                    GateKind::Add(_) => '+',
                    GateKind::Sub(_) => '-',
                    _ => '*',
                };
                let parts = gate.kind.args().iter()
                    .map(|&a| format!("({})", exprs[a]))
                    .collect::<Vec<_>>();
                parts.join(&format!(" {} ", ch))
            },
            GateKind::Set(arg) => exprs[arg].clone(),
            GateKind::External { .. } =>
                return Err(Error::ExternalUnsupported { at: r }),
        };
    }
    Ok(std::mem::replace(&mut exprs[root], String::new()))
}
