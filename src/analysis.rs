//! Memoized analyses over the circuit DAG.
//!
//! Five structurally parallel postorder folds: `depth`, multiplicative
//! `degree`, per-variable degree, per-constant degree, and total degree.
//! They differ only in their leaf values and combinators:
//!
//! | analysis       | leaf                 | Add/Sub           | Mul | Set  |
//! |----------------|----------------------|-------------------|-----|------|
//! | `depth`        | 0                    | 1 + max(children) | 1 + max(children) | pass |
//! | `degree`       | 1                    | max(children)     | sum | pass |
//! | `var_degree`   | 1 if this input      | max(children)     | sum | pass |
//! | `const_degree` | 1 if const           | max(children)     | sum | pass |
//! | total degree   | 1                    | sum               | sum | pass |
//!
//! Note that total degree sums children even through `Add`/`Sub`; it is a
//! leaf-count-like bound, a distinct metric from algebraic `degree`.
//!
//! All folds run iteratively over the postorder walk, so circuit depth is
//! not bounded by the call stack.  External gates have no degree or depth
//! and are reported as errors.

use std::iter;

use crate::ir::circuit::{Circuit, Error, GateKind, Ref};
use crate::ir::walk;

/// Memo table shared between repeated `var_degree`/`const_degree` queries,
/// e.g. one query per input variable over the same circuit.
///
/// Rows `0 .. ninputs` cache per-variable results; row `ninputs` is the
/// constant pseudo-variable.  Cells are `None` until a query populates
/// them.  Queries only ever fill cells in; nothing is evicted.
pub struct Memo {
    rows: Vec<Vec<Option<usize>>>,
}

impl Memo {
    pub fn new(c: &Circuit) -> Memo {
        Memo {
            rows: vec![vec![None; c.nrefs()]; c.ninputs() + 1],
        }
    }

    #[cfg(test)]
    pub(crate) fn cell(&self, id: usize, r: Ref) -> Option<usize> {
        self.rows[id][r]
    }
}

/// One postorder fold over the subgraph reachable from `root`, with
/// results cached in `cache`.  `f` maps a gate and its children's results
/// to the gate's result.  Refs already present in `cache` are neither
/// recomputed nor descended into.
fn fold_refs<F>(
    c: &Circuit,
    root: Ref,
    cache: &mut Vec<Option<usize>>,
    f: F,
) -> Result<usize, Error>
where
    F: Fn(Ref, &GateKind, &[usize]) -> Result<usize, Error>,
{
    let nrefs = c.nrefs();
    if root >= nrefs {
        return Err(Error::OutOfRange { index: root, nrefs });
    }
    if let Some(v) = cache[root] {
        return Ok(v);
    }

    let order = walk::topo_order_filtered(c, iter::once(root), |r| cache[r].is_none())?;
    let mut children = Vec::new();
    for &r in &order {
        let gate = c.gate(r)?;
        children.clear();
        for &a in gate.kind.args() {
            match cache[a] {
                Some(v) => children.push(v),
                // Postorder fills every argument first.
                None => return Err(Error::Cycle { at: a }),
            }
        }
        let v = f(r, &gate.kind, &children)?;
        cache[r] = Some(v);
    }

    cache[root].ok_or(Error::Cycle { at: root })
}

fn max_children(children: &[usize]) -> usize {
    children.iter().cloned().fold(0, |a, b| if a > b { a } else { b })
}

/// Longest path (counted in `Add`/`Sub`/`Mul` gates) from `root` down to
/// any leaf.  Leaves have depth 0; `Set` is transparent.
pub fn depth(c: &Circuit, root: Ref) -> Result<usize, Error> {
    depth_memo(c, root, &mut vec![None; c.nrefs()])
}

fn depth_memo(c: &Circuit, root: Ref, memo: &mut Vec<Option<usize>>) -> Result<usize, Error> {
    fold_refs(c, root, memo, |r, kind, children| match *kind {
        GateKind::Input(_) | GateKind::Const(_) => Ok(0),
        GateKind::Add(_) | GateKind::Sub(_) | GateKind::Mul(_) =>
            Ok(1 + max_children(children)),
        GateKind::Set(_) => Ok(children[0]),
        GateKind::External { .. } => Err(Error::ExternalUnsupported { at: r }),
    })
}

/// Maximum `depth` over the declared outputs.
pub fn max_depth(c: &Circuit) -> Result<usize, Error> {
    let mut memo = vec![None; c.nrefs()];
    let mut ret = 0;
    for &out in c.outputs() {
        let d = depth_memo(c, out, &mut memo)?;
        if d > ret {
            ret = d;
        }
    }
    Ok(ret)
}

/// Multiplicative degree bound of the polynomial computed at `root`:
/// `max` through addition, sum through multiplication, leaves count 1.
pub fn degree(c: &Circuit, root: Ref) -> Result<usize, Error> {
    degree_memo(c, root, &mut vec![None; c.nrefs()])
}

fn degree_memo(c: &Circuit, root: Ref, memo: &mut Vec<Option<usize>>) -> Result<usize, Error> {
    fold_refs(c, root, memo, |r, kind, children| match *kind {
        GateKind::Input(_) | GateKind::Const(_) => Ok(1),
        GateKind::Add(_) | GateKind::Sub(_) => Ok(max_children(children)),
        GateKind::Mul(_) => Ok(children.iter().sum()),
        GateKind::Set(_) => Ok(children[0]),
        GateKind::External { .. } => Err(Error::ExternalUnsupported { at: r }),
    })
}

/// Maximum `degree` over the declared outputs.
pub fn max_degree(c: &Circuit) -> Result<usize, Error> {
    let mut memo = vec![None; c.nrefs()];
    let mut ret = 0;
    for &out in c.outputs() {
        let d = degree_memo(c, out, &mut memo)?;
        if d > ret {
            ret = d;
        }
    }
    Ok(ret)
}

/// Degree of the polynomial at `root` in the single input variable `id`.
///
/// A caller-supplied `memo` is shared across repeated queries (typically
/// one per input variable) to avoid recomputing shared subgraphs; `None`
/// allocates a fresh table for this query alone.
pub fn var_degree(
    c: &Circuit,
    root: Ref,
    id: usize,
    memo: Option<&mut Memo>,
) -> Result<usize, Error> {
    match memo {
        Some(m) => var_degree_memo(c, root, id, m),
        None => var_degree_memo(c, root, id, &mut Memo::new(c)),
    }
}

fn var_degree_memo(c: &Circuit, root: Ref, id: usize, memo: &mut Memo) -> Result<usize, Error> {
    if id >= c.ninputs() {
        return Err(Error::InputOutOfRange { wire: id, len: c.ninputs() });
    }
    let mut scratch = memo.rows[id].clone();
    let res = fold_refs(c, root, &mut scratch, |r, kind, children| match *kind {
        GateKind::Input(wire) => Ok((wire == id) as usize),
        GateKind::Const(_) => Ok(0),
        GateKind::Add(_) | GateKind::Sub(_) => Ok(max_children(children)),
        GateKind::Mul(_) => Ok(children.iter().sum()),
        GateKind::Set(_) => Ok(children[0]),
        GateKind::External { .. } => Err(Error::ExternalUnsupported { at: r }),
    })?;
    persist(c, &scratch, &mut memo.rows[id], true);
    Ok(res)
}

/// Degree of the polynomial at `root` in the constant pseudo-variable:
/// like `var_degree`, but every `Const` leaf counts 1 and every `Input`
/// counts 0.
pub fn const_degree(c: &Circuit, root: Ref, memo: Option<&mut Memo>) -> Result<usize, Error> {
    match memo {
        Some(m) => const_degree_memo(c, root, m),
        None => const_degree_memo(c, root, &mut Memo::new(c)),
    }
}

fn const_degree_memo(c: &Circuit, root: Ref, memo: &mut Memo) -> Result<usize, Error> {
    let row = c.ninputs();
    let mut scratch = memo.rows[row].clone();
    let res = fold_refs(c, root, &mut scratch, |r, kind, children| match *kind {
        GateKind::Input(_) => Ok(0),
        GateKind::Const(_) => Ok(1),
        GateKind::Add(_) | GateKind::Sub(_) => Ok(max_children(children)),
        GateKind::Mul(_) => Ok(children.iter().sum()),
        GateKind::Set(_) => Ok(children[0]),
        GateKind::External { .. } => Err(Error::ExternalUnsupported { at: r }),
    })?;
    persist(c, &scratch, &mut memo.rows[row], false);
    Ok(res)
}

// Cross-query caching is deliberately partial: only `Add`/`Sub` results
// (plus `Set` for var-degree) are written back to the shared memo.  `Mul`
// results and leaves are recomputed by later queries sharing the table.
fn persist(c: &Circuit, scratch: &[Option<usize>], row: &mut Vec<Option<usize>>, keep_set: bool) {
    for (r, gate) in c.gates().iter().enumerate() {
        if row[r].is_some() {
            continue;
        }
        let keep = match gate.kind {
            GateKind::Add(_) | GateKind::Sub(_) => true,
            GateKind::Set(_) => keep_set,
            _ => false,
        };
        if keep {
            row[r] = scratch[r];
        }
    }
}

/// Maximum `var_degree(id)` over the declared outputs, sharing one memo
/// across the per-output queries.
pub fn max_var_degree(c: &Circuit, id: usize) -> Result<usize, Error> {
    let mut memo = Memo::new(c);
    let mut ret = 0;
    for &out in c.outputs() {
        let d = var_degree_memo(c, out, id, &mut memo)?;
        if d > ret {
            ret = d;
        }
    }
    Ok(ret)
}

/// Maximum `const_degree` over the declared outputs.
pub fn max_const_degree(c: &Circuit) -> Result<usize, Error> {
    let mut memo = Memo::new(c);
    let mut ret = 0;
    for &out in c.outputs() {
        let d = const_degree_memo(c, out, &mut memo)?;
        if d > ret {
            ret = d;
        }
    }
    Ok(ret)
}

/// Total-degree bound at `root`: the number of leaves of the expression
/// tree obtained by unsharing the DAG.  Sums children through every op,
/// including `Add`/`Sub`.
pub fn total_degree(c: &Circuit, root: Ref) -> Result<usize, Error> {
    total_degree_memo(c, root, &mut vec![None; c.nrefs()])
}

fn total_degree_memo(
    c: &Circuit,
    root: Ref,
    memo: &mut Vec<Option<usize>>,
) -> Result<usize, Error> {
    fold_refs(c, root, memo, |r, kind, children| match *kind {
        GateKind::Input(_) | GateKind::Const(_) => Ok(1),
        GateKind::Add(_) | GateKind::Sub(_) | GateKind::Mul(_) =>
            Ok(children.iter().sum()),
        GateKind::Set(_) => Ok(children[0]),
        GateKind::External { .. } => Err(Error::ExternalUnsupported { at: r }),
    })
}

/// Maximum `total_degree` over the declared outputs.
pub fn max_total_degree(c: &Circuit) -> Result<usize, Error> {
    let mut memo = vec![None; c.nrefs()];
    let mut ret = 0;
    for &out in c.outputs() {
        let d = total_degree_memo(c, out, &mut memo)?;
        if d > ret {
            ret = d;
        }
    }
    Ok(ret)
}

/// `max_const_degree` plus the sum over all inputs of `max_var_degree`.
/// An upper bound on the circuit's multiplicative degree, used downstream
/// to size cryptographic parameters.
pub fn delta(c: &Circuit) -> Result<usize, Error> {
    let mut d = max_const_degree(c)?;
    for id in 0..c.ninputs() {
        d += max_var_degree(c, id)?;
    }
    Ok(d)
}
