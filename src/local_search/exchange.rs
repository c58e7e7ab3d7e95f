//! Node exchange operators: segment relocation and segment swaps.
//!
//! Covers the directed-pair moves of the granular descent: relocating a
//! client or a two-client segment (optionally reversed) after another
//! client, and swapping segments of one or two clients between positions.
//! Every move is evaluated from the segment caches: cross-route moves from
//! both routes' prefix/suffix summaries, same-route moves as a single
//! splice whose mid piece carries the nodes between the two edit points.

use crate::evaluation::CostEvaluator;
use crate::local_search::route::{splice_cost, SearchRoute};
use crate::models::ProblemData;
use crate::Cost;

/// The closed set of node operators, probed in declaration order.
pub(crate) const NODE_OPS: [NodeOp; 6] = [
    NodeOp::Relocate {
        len: 1,
        reversed: false,
    },
    NodeOp::Relocate {
        len: 2,
        reversed: false,
    },
    NodeOp::Relocate {
        len: 2,
        reversed: true,
    },
    NodeOp::Swap { len_u: 1, len_v: 1 },
    NodeOp::Swap { len_u: 2, len_v: 1 },
    NodeOp::Swap { len_u: 2, len_v: 2 },
];

/// A node operator instance, parameterised by segment lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeOp {
    /// Relocate the segment starting at `u` after `v`.
    Relocate { len: usize, reversed: bool },
    /// Swap the segment starting at `u` with the one starting at `v`.
    Swap { len_u: usize, len_v: usize },
}

/// The client segment of `len` nodes starting at position `pos`, or `None`
/// if it runs out of the route or touches a depot.
fn client_segment<'a>(
    data: &ProblemData,
    route: &'a SearchRoute,
    pos: usize,
    len: usize,
) -> Option<&'a [usize]> {
    let n = route.len();
    if pos == 0 || pos + len > n - 1 {
        return None;
    }
    let seg = &route.visits()[pos - 1..pos - 1 + len];
    if seg.iter().any(|&s| s < data.num_depots()) {
        return None;
    }
    Some(seg)
}

fn allowed_on(data: &ProblemData, seg: &[usize], vehicle_type: usize) -> bool {
    !data.has_vehicle_restrictions()
        || seg
            .iter()
            .all(|&c| data.location(c).allows_vehicle_type(vehicle_type))
}

impl NodeOp {
    /// Signed penalised-cost change of this move, or `None` if the move is
    /// not applicable.
    pub(crate) fn evaluate(
        &self,
        data: &ProblemData,
        ev: &CostEvaluator,
        routes: &[SearchRoute],
        u: (usize, usize),
        v: (usize, usize),
    ) -> Option<Cost> {
        let (ru, pu) = u;
        let (rv, pv) = v;
        match *self {
            NodeOp::Relocate { len, reversed } => {
                let seg = client_segment(data, &routes[ru], pu, len)?;
                let mut moved = [0; 2];
                moved[..len].copy_from_slice(seg);
                if reversed {
                    moved[..len].reverse();
                }
                if ru == rv {
                    // Insertion point inside or adjacent to the segment is a no-op.
                    if pv + 1 >= pu && pv < pu + len {
                        return None;
                    }
                    // One splice: the nodes between the two edit points ride
                    // along in the mid piece.
                    let r = &routes[ru];
                    let nodes = r.nodes();
                    let mut mid = Vec::with_capacity(pv.abs_diff(pu) + 1);
                    let new = if pv >= pu + len {
                        mid.extend_from_slice(&nodes[pu + len..pv + 1]);
                        mid.extend_from_slice(&moved[..len]);
                        splice_cost(data, ev, (r, pu - 1), &mid, (r, pv + 1))
                    } else {
                        mid.extend_from_slice(&moved[..len]);
                        mid.extend_from_slice(&nodes[pv + 1..pu]);
                        splice_cost(data, ev, (r, pv), &mid, (r, pu + len))
                    };
                    Some(new - r.current_cost(data, ev))
                } else {
                    let (r1, r2) = (&routes[ru], &routes[rv]);
                    if !allowed_on(data, seg, r2.vehicle_type()) {
                        return None;
                    }
                    let new1 = splice_cost(data, ev, (r1, pu - 1), &[], (r1, pu + len));
                    let new2 = splice_cost(data, ev, (r2, pv), &moved[..len], (r2, pv + 1));
                    Some(
                        new1 + new2
                            - r1.current_cost(data, ev)
                            - r2.current_cost(data, ev),
                    )
                }
            }
            NodeOp::Swap { len_u, len_v } => {
                if ru == rv {
                    // Segments must be disjoint.
                    if pu + len_u > pv && pv + len_v > pu {
                        return None;
                    }
                    let seg_u = client_segment(data, &routes[ru], pu, len_u)?;
                    let seg_v = client_segment(data, &routes[ru], pv, len_v)?;
                    let r = &routes[ru];
                    let nodes = r.nodes();
                    let (lo, lo_len, lo_rep, hi, hi_len, hi_rep) = if pu < pv {
                        (pu, len_u, seg_v, pv, len_v, seg_u)
                    } else {
                        (pv, len_v, seg_u, pu, len_u, seg_v)
                    };
                    let mut mid = Vec::with_capacity(hi + hi_rep.len() - lo);
                    mid.extend_from_slice(lo_rep);
                    mid.extend_from_slice(&nodes[lo + lo_len..hi]);
                    mid.extend_from_slice(hi_rep);
                    let new = splice_cost(data, ev, (r, lo - 1), &mid, (r, hi + hi_len));
                    Some(new - r.current_cost(data, ev))
                } else {
                    let (r1, r2) = (&routes[ru], &routes[rv]);
                    let seg_u = client_segment(data, r1, pu, len_u)?;
                    let seg_v = client_segment(data, r2, pv, len_v)?;
                    if !allowed_on(data, seg_u, r2.vehicle_type())
                        || !allowed_on(data, seg_v, r1.vehicle_type())
                    {
                        return None;
                    }
                    let new1 = splice_cost(data, ev, (r1, pu - 1), seg_v, (r1, pu + len_u));
                    let new2 = splice_cost(data, ev, (r2, pv - 1), seg_u, (r2, pv + len_v));
                    Some(
                        new1 + new2
                            - r1.current_cost(data, ev)
                            - r2.current_cost(data, ev),
                    )
                }
            }
        }
    }

    /// Applies this move and refreshes the caches of the touched routes.
    pub(crate) fn apply(
        &self,
        data: &ProblemData,
        routes: &mut [SearchRoute],
        u: (usize, usize),
        v: (usize, usize),
    ) {
        let (ru, pu) = u;
        let (rv, pv) = v;
        match *self {
            NodeOp::Relocate { len, reversed } => {
                if ru == rv {
                    let new = relocated(&routes[ru], pu, len, reversed, pv);
                    routes[ru].set_visits(data, new);
                } else {
                    let mut seg = routes[ru].visits()[pu - 1..pu - 1 + len].to_vec();
                    if reversed {
                        seg.reverse();
                    }
                    let mut v1 = routes[ru].visits().to_vec();
                    v1.drain(pu - 1..pu - 1 + len);
                    let mut v2 = routes[rv].visits().to_vec();
                    v2.splice(pv..pv, seg);
                    routes[ru].set_visits(data, v1);
                    routes[rv].set_visits(data, v2);
                }
            }
            NodeOp::Swap { len_u, len_v } => {
                if ru == rv {
                    let new = swapped_within(&routes[ru], pu, len_u, pv, len_v);
                    routes[ru].set_visits(data, new);
                } else {
                    let seg_u = routes[ru].visits()[pu - 1..pu - 1 + len_u].to_vec();
                    let seg_v = routes[rv].visits()[pv - 1..pv - 1 + len_v].to_vec();
                    let mut v1 = routes[ru].visits().to_vec();
                    v1.splice(pu - 1..pu - 1 + len_u, seg_v);
                    let mut v2 = routes[rv].visits().to_vec();
                    v2.splice(pv - 1..pv - 1 + len_v, seg_u);
                    routes[ru].set_visits(data, v1);
                    routes[rv].set_visits(data, v2);
                }
            }
        }
    }
}

/// Interior visit sequence after relocating the `len` nodes at position
/// `pu` (node coordinates) to just after position `pv` of the same route.
fn relocated(
    route: &SearchRoute,
    pu: usize,
    len: usize,
    reversed: bool,
    pv: usize,
) -> Vec<usize> {
    let visits = route.visits();
    let mut seg = visits[pu - 1..pu - 1 + len].to_vec();
    if reversed {
        seg.reverse();
    }
    let mut new = visits.to_vec();
    new.drain(pu - 1..pu - 1 + len);
    let insert_at = if pv < pu { pv } else { pv - len };
    new.splice(insert_at..insert_at, seg);
    new
}

/// Interior visit sequence after swapping two disjoint segments of the same
/// route.
fn swapped_within(
    route: &SearchRoute,
    pu: usize,
    len_u: usize,
    pv: usize,
    len_v: usize,
) -> Vec<usize> {
    let visits = route.visits();
    let seg_u = visits[pu - 1..pu - 1 + len_u].to_vec();
    let seg_v = visits[pv - 1..pv - 1 + len_v].to_vec();
    let mut new = visits.to_vec();
    // Replace the later range first so the earlier indices stay valid.
    if pu < pv {
        new.splice(pv - 1..pv - 1 + len_v, seg_u);
        new.splice(pu - 1..pu - 1 + len_u, seg_v);
    } else {
        new.splice(pu - 1..pu - 1 + len_u, seg_v);
        new.splice(pv - 1..pv - 1 + len_v, seg_u);
    }
    new
}
