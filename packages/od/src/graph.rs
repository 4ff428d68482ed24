//! Flow graph construction from a dense OD matrix.

use ward_flow_od_models::{FlowEdge, FlowGraph, FlowNode, OdMatrix};

/// Converts a matrix into a weighted directed graph.
///
/// Every matrix ward becomes a node, including wards with no flow. Only
/// positive cells become edges. A self-loop adds its weight to both the
/// node's out-weight and in-weight.
#[must_use]
pub fn build_graph(matrix: &OdMatrix) -> FlowGraph {
    let n = matrix.size();
    let mut out_weight = vec![0_u64; n];
    let mut in_weight = vec![0_u64; n];
    let mut edges = Vec::new();

    for (i, (origin, row)) in matrix.rows().enumerate() {
        for (j, &weight) in row.iter().enumerate() {
            if weight == 0 {
                continue;
            }
            out_weight[i] += weight;
            in_weight[j] += weight;
            edges.push(FlowEdge {
                origin,
                destination: matrix.wards[j],
                weight,
            });
        }
    }

    let nodes = matrix
        .wards
        .iter()
        .zip(out_weight.into_iter().zip(in_weight))
        .map(|(&ward, (out_weight, in_weight))| FlowNode {
            ward,
            out_weight,
            in_weight,
            degree: out_weight + in_weight,
        })
        .collect();

    FlowGraph { nodes, edges }
}
