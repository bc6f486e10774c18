//! Topological evaluation of a circuit.

use log::{debug, info};

use crate::ir::circuit::{Circuit, Error, GateKind, Ref};
use crate::ir::walk;

/// Evaluate the gate at `root` under the given input assignment.
///
/// Requires `inputs` to cover every input wire reachable from `root`.
/// Arithmetic wraps on overflow.  The circuit is not mutated; the only
/// allocation is a transient per-ref value table, so independent
/// evaluations may run concurrently on a shared circuit.
pub fn eval(c: &Circuit, root: Ref, inputs: &[i64]) -> Result<i64, Error> {
    let order = walk::topo_order(c, root)?;
    let mut vals = vec![0_i64; c.nrefs()];
    for &r in &order {
        let gate = c.gate(r)?;
        vals[r] = match gate.kind {
            GateKind::Input(wire) => match inputs.get(wire) {
                Some(&x) => x,
                None => return Err(Error::InputOutOfRange { wire, len: inputs.len() }),
            },
            GateKind::Const(v) => v,
            GateKind::Add(ref args) => {
                args.iter().fold(0, |acc, &a| acc.wrapping_add(vals[a]))
            },
            GateKind::Sub(ref args) => {
                args[1..].iter().fold(vals[args[0]], |acc, &a| acc.wrapping_sub(vals[a]))
            },
            GateKind::Mul(ref args) => {
                args.iter().fold(1, |acc, &a| acc.wrapping_mul(vals[a]))
            },
            GateKind::Set(arg) => vals[arg],
            GateKind::External { ref name, ref args } => {
                let ext = c.extgate(name)
                    .ok_or_else(|| Error::UnknownExternal(name.clone()))?;
                let arg_vals = args.iter().map(|&a| vals[a]).collect::<Vec<_>>();
                (ext.eval)(gate, &arg_vals).map_err(|reason| {
                    Error::ExternalGateError { name: name.clone(), reason }
                })?
            },
        };
    }
    Ok(vals[root])
}

/// Run every stored test vector: evaluate each declared output and compare
/// against the expected values.  Returns whether all tests passed.
pub fn ensure(c: &Circuit) -> Result<bool, Error> {
    info!("running {} circuit tests...", c.tests().len());
    let mut ok = true;
    for (num, test) in c.tests().iter().enumerate() {
        let mut got = Vec::with_capacity(c.outputs().len());
        for &out in c.outputs() {
            got.push(eval(c, out, &test.inputs)?);
        }
        let test_ok = got == test.outputs;
        debug!(
            "test {}: input={:?} expected={:?} got={:?}",
            num, test.inputs, test.outputs, got,
        );
        if !test_ok {
            info!("test {} FAILED: expected {:?}, got {:?}", num, test.outputs, got);
        }
        ok = ok && test_ok;
    }
    Ok(ok)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::circuit::TestVector;

    /// inputs x0, x1; output x0 * x1.
    fn mul_circuit() -> (Circuit, Ref) {
        let mut c = Circuit::new();
        let a = c.push_input();
        let b = c.push_input();
        let m = c.push_gate(GateKind::Mul(vec![a, b])).unwrap();
        c.add_output(m).unwrap();
        (c, m)
    }

    #[test]
    fn mul_of_inputs() {
        let (c, m) = mul_circuit();
        assert_eq!(eval(&c, m, &[3, 4]), Ok(12));
    }

    #[test]
    fn eval_is_deterministic() {
        let (c, m) = mul_circuit();
        assert_eq!(eval(&c, m, &[5, 7]), eval(&c, m, &[5, 7]));
        assert_eq!(c.nrefs(), 3);
    }

    #[test]
    fn add_then_sub() {
        // (5 + x0) - 5 == x0
        let mut c = Circuit::new();
        let k = c.push_const(5);
        let x = c.push_input();
        let a = c.push_gate(GateKind::Add(vec![k, x])).unwrap();
        let s = c.push_gate(GateKind::Sub(vec![a, k])).unwrap();
        c.add_output(s).unwrap();
        assert_eq!(eval(&c, s, &[7]), Ok(7));
    }

    #[test]
    fn set_passthrough() {
        let mut c = Circuit::new();
        let x = c.push_input();
        let s = c.push_gate(GateKind::Set(x)).unwrap();
        assert_eq!(eval(&c, s, &[42]), Ok(42));
    }

    #[test]
    fn input_vector_too_short() {
        let (c, m) = mul_circuit();
        assert_eq!(
            eval(&c, m, &[3]),
            Err(Error::InputOutOfRange { wire: 1, len: 1 }),
        );
    }

    #[test]
    fn unknown_external_gate() {
        let mut c = Circuit::new();
        let x = c.push_input();
        let e = c.push_external("foo", vec![x]).unwrap();
        assert_eq!(eval(&c, e, &[1]), Err(Error::UnknownExternal("foo".to_owned())));
    }

    #[test]
    fn external_gate_dispatch() {
        let mut c = Circuit::new();
        c.register(
            "neg",
            Box::new(|c, args| c.push_external("neg", args.to_vec())),
            Box::new(|_, vals| Ok(-vals[0])),
        ).unwrap();
        let x = c.push_input();
        let e = c.push_external("neg", vec![x]).unwrap();
        // -1 is a legitimate result, not an error sentinel.
        assert_eq!(eval(&c, e, &[1]), Ok(-1));
    }

    #[test]
    fn external_gate_failure() {
        let mut c = Circuit::new();
        c.register(
            "bad",
            Box::new(|c, args| c.push_external("bad", args.to_vec())),
            Box::new(|_, _| Err("nope".to_owned())),
        ).unwrap();
        let x = c.push_input();
        let e = c.push_external("bad", vec![x]).unwrap();
        assert_eq!(
            eval(&c, e, &[1]),
            Err(Error::ExternalGateError { name: "bad".to_owned(), reason: "nope".to_owned() }),
        );
    }

    #[test]
    fn ensure_runs_stored_tests() {
        let (mut c, _) = mul_circuit();
        c.add_test(TestVector { inputs: vec![2, 3], outputs: vec![6] });
        c.add_test(TestVector { inputs: vec![0, 9], outputs: vec![0] });
        assert_eq!(ensure(&c), Ok(true));

        c.add_test(TestVector { inputs: vec![2, 2], outputs: vec![5] });
        assert_eq!(ensure(&c), Ok(false));
    }
}
