//! Types for constructing arithmetic circuits.
//!
//! A `Circuit` is a flat, append-only array of `Gate`s.  Each gate is
//! identified by its index in the array, a `Ref`; the ref space is dense
//! (`0 .. nrefs`) and refs are never reused or renumbered.  Gates may only
//! refer to gates appended before them, so a circuit built through the
//! append methods is acyclic by construction.
//!
//! Construction is driven by the parser (`crate::parse`); once built, a
//! circuit is read-only and can be shared freely between threads.

use std::collections::HashMap;
use std::fmt;

use crate::extgate::{BuildFn, EvalFn, ExtGate};

/// Index of a gate within a circuit's gate array.
pub type Ref = usize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateKind {
    /// Reads slot `.0` of the caller-supplied input vector.
    Input(usize),
    /// A literal value.
    Const(i64),
    /// Sum of the argument values.
    Add(Vec<Ref>),
    /// First argument minus the sum of the rest.
    Sub(Vec<Ref>),
    /// Product of the argument values.
    Mul(Vec<Ref>),
    /// Single-argument passthrough/alias.
    Set(Ref),
    /// Evaluated via the callback registered under `name`.
    External { name: String, args: Vec<Ref> },
}

impl GateKind {
    /// The refs this gate reads, in argument order.
    pub fn args(&self) -> &[Ref] {
        match *self {
            GateKind::Input(_) |
            GateKind::Const(_) => &[],
            GateKind::Add(ref args) |
            GateKind::Sub(ref args) |
            GateKind::Mul(ref args) |
            GateKind::External { ref args, .. } => args,
            GateKind::Set(ref arg) => std::slice::from_ref(arg),
        }
    }

    /// Name used in the text format and in diagnostics.
    pub fn op_name(&self) -> &str {
        match *self {
            GateKind::Input(_) => "input",
            GateKind::Const(_) => "const",
            GateKind::Add(_) => "ADD",
            GateKind::Sub(_) => "SUB",
            GateKind::Mul(_) => "MUL",
            GateKind::Set(_) => "SET",
            GateKind::External { ref name, .. } => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gate {
    pub kind: GateKind,
    /// Optional display name, used in diagnostics.
    pub name: Option<String>,
}

impl Gate {
    pub fn new(kind: GateKind) -> Gate {
        Gate { kind, name: None }
    }
}

/// One stored test vector: an input assignment and the expected value of
/// each declared output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestVector {
    pub inputs: Vec<i64>,
    pub outputs: Vec<i64>,
}

/// Errors reported by circuit access, evaluation, and analysis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A ref exceeds the bounds of the gate array.
    OutOfRange { index: Ref, nrefs: usize },
    /// An `Input` gate reads past the end of the input vector.
    InputOutOfRange { wire: usize, len: usize },
    /// An `External` gate's name has no registry entry.
    UnknownExternal(String),
    /// A registered external-gate evaluator signaled failure.
    ExternalGateError { name: String, reason: String },
    /// A cycle was found while scheduling.  Cannot happen for circuits
    /// built only through the append methods.
    Cycle { at: Ref },
    /// An `External` gate was reached by an operation that has no meaning
    /// for it (serialization, degree analysis).
    ExternalUnsupported { at: Ref },
    /// `register` was called twice with the same name.
    DuplicateExternal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::OutOfRange { index, nrefs } =>
                write!(f, "ref {} out of range (nrefs = {})", index, nrefs),
            Error::InputOutOfRange { wire, len } =>
                write!(f, "input wire {} out of range ({} inputs supplied)", wire, len),
            Error::UnknownExternal(ref name) =>
                write!(f, "no external gate registered under {:?}", name),
            Error::ExternalGateError { ref name, ref reason } =>
                write!(f, "external gate {:?} failed: {}", name, reason),
            Error::Cycle { at } =>
                write!(f, "malformed circuit: cycle through ref {}", at),
            Error::ExternalUnsupported { at } =>
                write!(f, "ref {} is an external gate, which is not supported here", at),
            Error::DuplicateExternal(ref name) =>
                write!(f, "external gate {:?} is already registered", name),
        }
    }
}

impl std::error::Error for Error {}

/// A `: <name> <args>` directive handler.  Handlers mutate the circuit
/// being built; the circuit stores the registry but only the parser
/// invokes it.
#[derive(Clone, Copy)]
pub struct Command {
    pub name: &'static str,
    pub run: fn(&mut Circuit, &[&str]) -> Result<(), String>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Command").field("name", &self.name).finish()
    }
}

/// An arithmetic circuit: the gate array plus its declared outputs,
/// constants, and attached collections.
#[derive(Debug, Default)]
pub struct Circuit {
    gates: Vec<Gate>,
    ninputs: usize,
    consts: Vec<i64>,
    outputs: Vec<Ref>,
    secrets: Vec<Ref>,
    tests: Vec<TestVector>,
    commands: Vec<Command>,
    extgates: HashMap<String, ExtGate>,
}

impl Circuit {
    pub fn new() -> Circuit {
        let mut c = Circuit::default();
        c.commands.extend(crate::parse::builtin_commands());
        c
    }

    /// Total number of refs: `ninputs + n_interior_gates + n_consts`.
    /// Always equal to the length of the gate array.
    pub fn nrefs(&self) -> usize {
        self.gates.len()
    }

    pub fn ninputs(&self) -> usize {
        self.ninputs
    }

    pub fn nconsts(&self) -> usize {
        self.consts.len()
    }

    pub fn gate(&self, r: Ref) -> Result<&Gate, Error> {
        self.gates.get(r).ok_or(Error::OutOfRange { index: r, nrefs: self.gates.len() })
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn outputs(&self) -> &[Ref] {
        &self.outputs
    }

    pub fn consts(&self) -> &[i64] {
        &self.consts
    }

    pub fn secrets(&self) -> &[Ref] {
        &self.secrets
    }

    pub fn tests(&self) -> &[TestVector] {
        &self.tests
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn extgate(&self, name: &str) -> Option<&ExtGate> {
        self.extgates.get(name)
    }

    /// Number of `Mul` gates in the circuit.
    pub fn nmuls(&self) -> usize {
        self.gates.iter()
            .filter(|g| match g.kind { GateKind::Mul(_) => true, _ => false })
            .count()
    }

    // Build-phase mutators.  The parser is the main caller; after parsing
    // finishes, the circuit is treated as immutable.

    fn push(&mut self, gate: Gate) -> Ref {
        let r = self.gates.len();
        self.gates.push(gate);
        r
    }

    /// Append an input gate reading the next input wire.
    pub fn push_input(&mut self) -> Ref {
        let wire = self.ninputs;
        self.ninputs += 1;
        self.push(Gate::new(GateKind::Input(wire)))
    }

    /// Append a constant gate.
    pub fn push_const(&mut self, value: i64) -> Ref {
        self.consts.push(value);
        self.push(Gate::new(GateKind::Const(value)))
    }

    /// Append an interior gate.  Arguments must name already-appended
    /// gates, which keeps the circuit acyclic.
    pub fn push_gate(&mut self, kind: GateKind) -> Result<Ref, Error> {
        match kind {
            GateKind::Input(_) | GateKind::Const(_) =>
                panic!("push_gate called with a leaf kind"),
            GateKind::Add(ref args) | GateKind::Sub(ref args) | GateKind::Mul(ref args) =>
                assert!(!args.is_empty(), "{} gate with no arguments", kind.op_name()),
            GateKind::Set(_) | GateKind::External { .. } => {},
        }
        for &arg in kind.args() {
            if arg >= self.gates.len() {
                return Err(Error::OutOfRange { index: arg, nrefs: self.gates.len() });
            }
        }
        Ok(self.push(Gate::new(kind)))
    }

    /// Append an `External` gate.  The name is not resolved here;
    /// resolution happens at evaluation time.
    pub fn push_external(&mut self, name: &str, args: Vec<Ref>) -> Result<Ref, Error> {
        self.push_gate(GateKind::External { name: name.to_owned(), args })
    }

    pub fn add_output(&mut self, r: Ref) -> Result<(), Error> {
        if r >= self.gates.len() {
            return Err(Error::OutOfRange { index: r, nrefs: self.gates.len() });
        }
        self.outputs.push(r);
        Ok(())
    }

    pub fn add_secret(&mut self, r: Ref) -> Result<(), Error> {
        if r >= self.gates.len() {
            return Err(Error::OutOfRange { index: r, nrefs: self.gates.len() });
        }
        self.secrets.push(r);
        Ok(())
    }

    pub fn add_test(&mut self, test: TestVector) {
        self.tests.push(test);
    }

    pub fn add_command(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    /// Register an external gate kind.  Names are unique; registering the
    /// same name twice is an error rather than shadowing the old entry.
    pub fn register(&mut self, name: &str, build: BuildFn, eval: EvalFn) -> Result<(), Error> {
        if self.extgates.contains_key(name) {
            return Err(Error::DuplicateExternal(name.to_owned()));
        }
        self.extgates.insert(name.to_owned(), ExtGate { build, eval });
        Ok(())
    }

    // The build callback takes `&mut Circuit`, so the entry is moved out
    // of the registry for the duration of the call.
    pub(crate) fn take_extgate(&mut self, name: &str) -> Option<ExtGate> {
        self.extgates.remove(name)
    }

    pub(crate) fn put_extgate(&mut self, name: String, ext: ExtGate) {
        self.extgates.insert(name, ext);
    }

    /// Install a gate array directly, with no validation.  Lets tests
    /// exercise the malformed-circuit paths that the append methods make
    /// unreachable.
    #[cfg(test)]
    pub(crate) fn from_raw_gates(gates: Vec<Gate>) -> Circuit {
        let mut c = Circuit::new();
        c.gates = gates;
        c
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn refs_are_dense() {
        let mut c = Circuit::new();
        let a = c.push_input();
        let b = c.push_input();
        let k = c.push_const(5);
        let m = c.push_gate(GateKind::Mul(vec![a, b])).unwrap();
        assert_eq!((a, b, k, m), (0, 1, 2, 3));
        assert_eq!(c.nrefs(), 4);
        assert_eq!(c.nrefs(), c.ninputs() + 1 + c.nconsts());
        assert_eq!(c.nmuls(), 1);
    }

    #[test]
    fn dangling_arg_rejected() {
        let mut c = Circuit::new();
        let a = c.push_input();
        assert_eq!(
            c.push_gate(GateKind::Add(vec![a, 7])),
            Err(Error::OutOfRange { index: 7, nrefs: 1 }),
        );
    }

    #[test]
    fn get_out_of_range() {
        let c = Circuit::new();
        assert_eq!(c.gate(0), Err(Error::OutOfRange { index: 0, nrefs: 0 }));
    }

    #[test]
    fn duplicate_external_rejected() {
        let mut c = Circuit::new();
        c.register("id", Box::new(|c, args| c.push_external("id", args.to_vec())),
            Box::new(|_, vals| Ok(vals[0]))).unwrap();
        let err = c.register("id", Box::new(|c, args| c.push_external("id", args.to_vec())),
            Box::new(|_, vals| Ok(vals[0])));
        assert_eq!(err, Err(Error::DuplicateExternal("id".to_owned())));
    }
}
