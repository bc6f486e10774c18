//! Iterative postorder traversal over the gate DAG.
//!
//! The traversal uses an explicit frame stack rather than recursion, so
//! pathologically deep circuits cannot overflow the call stack.  Circuits
//! built through the append path are acyclic by construction, but the walk
//! still tracks the current path and reports a cycle as an error instead
//! of looping.

use std::iter;

use crate::ir::circuit::{Circuit, Error, Ref};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// Not visited yet.
    New,
    /// On the current DFS path.
    Open,
    /// Finished (emitted, or skipped by the filter).
    Done,
}

/// Topological order of the subgraph reachable from `root`: every gate's
/// arguments appear strictly before it, each reachable ref appears exactly
/// once, and `root` appears last.
pub fn topo_order(c: &Circuit, root: Ref) -> Result<Vec<Ref>, Error> {
    topo_order_filtered(c, iter::once(root), |_| true)
}

/// Like `topo_order`, but starting from several roots, and skipping any
/// ref for which `filter` returns false - the walk neither emits it nor
/// descends into its arguments.  The analyses use this to stop at refs
/// whose result is already memoized.
pub fn topo_order_filtered<I, F>(c: &Circuit, roots: I, mut filter: F) -> Result<Vec<Ref>, Error>
where
    I: IntoIterator<Item = Ref>,
    F: FnMut(Ref) -> bool,
{
    let nrefs = c.nrefs();
    let mut marks = vec![Mark::New; nrefs];
    let mut order = Vec::new();
    // Each frame is a ref plus the index of its next unvisited argument.
    let mut stack: Vec<(Ref, usize)> = Vec::new();

    for root in roots {
        if root >= nrefs {
            return Err(Error::OutOfRange { index: root, nrefs });
        }
        if marks[root] == Mark::Done || !filter(root) {
            continue;
        }
        marks[root] = Mark::Open;
        stack.push((root, 0));

        while let Some(&(r, next)) = stack.last() {
            let args = c.gate(r)?.kind.args();
            if next < args.len() {
                let top = stack.len() - 1;
                stack[top].1 += 1;
                let arg = args[next];
                if arg >= nrefs {
                    return Err(Error::OutOfRange { index: arg, nrefs });
                }
                match marks[arg] {
                    Mark::Open => return Err(Error::Cycle { at: arg }),
                    Mark::Done => {},
                    Mark::New => {
                        if filter(arg) {
                            marks[arg] = Mark::Open;
                            stack.push((arg, 0));
                        } else {
                            marks[arg] = Mark::Done;
                        }
                    },
                }
            } else {
                stack.pop();
                marks[r] = Mark::Done;
                order.push(r);
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::circuit::{Gate, GateKind};

    #[test]
    fn diamond_visited_once() {
        let mut c = Circuit::new();
        let x = c.push_input();
        let a = c.push_gate(GateKind::Add(vec![x, x])).unwrap();
        let b = c.push_gate(GateKind::Mul(vec![x, a])).unwrap();
        let top = c.push_gate(GateKind::Add(vec![a, b])).unwrap();

        let order = topo_order(&c, top).unwrap();
        assert_eq!(order, vec![x, a, b, top]);
    }

    #[test]
    fn root_is_last_and_deps_precede() {
        let mut c = Circuit::new();
        let x = c.push_input();
        let y = c.push_input();
        let m = c.push_gate(GateKind::Mul(vec![x, y])).unwrap();
        let s = c.push_gate(GateKind::Set(m)).unwrap();

        let order = topo_order(&c, s).unwrap();
        assert_eq!(*order.last().unwrap(), s);
        for (i, &r) in order.iter().enumerate() {
            for &arg in c.gate(r).unwrap().kind.args() {
                assert!(order[..i].contains(&arg));
            }
        }
    }

    #[test]
    fn unreachable_refs_not_emitted() {
        let mut c = Circuit::new();
        let x = c.push_input();
        let _unused = c.push_const(9);
        let s = c.push_gate(GateKind::Set(x)).unwrap();
        assert_eq!(topo_order(&c, s).unwrap(), vec![x, s]);
    }

    #[test]
    fn cycle_reported() {
        // Bypasses the append path, which would reject these args.
        let c = Circuit::from_raw_gates(vec![
            Gate::new(GateKind::Add(vec![1])),
            Gate::new(GateKind::Add(vec![0])),
        ]);
        match topo_order(&c, 0) {
            Err(Error::Cycle { .. }) => {},
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn self_cycle_reported() {
        let c = Circuit::from_raw_gates(vec![
            Gate::new(GateKind::Set(0)),
        ]);
        assert_eq!(topo_order(&c, 0), Err(Error::Cycle { at: 0 }));
    }

    #[test]
    fn root_out_of_range() {
        let c = Circuit::new();
        assert_eq!(topo_order(&c, 3), Err(Error::OutOfRange { index: 3, nrefs: 0 }));
    }

    #[test]
    fn filter_stops_descent() {
        let mut c = Circuit::new();
        let x = c.push_input();
        let y = c.push_input();
        let m = c.push_gate(GateKind::Mul(vec![x, y])).unwrap();
        let top = c.push_gate(GateKind::Add(vec![m, y])).unwrap();

        // Pretend `m` is already known: neither it nor `x` should appear.
        let order = topo_order_filtered(&c, iter::once(top), |r| r != m).unwrap();
        assert_eq!(order, vec![y, top]);
    }
}
