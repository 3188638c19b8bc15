//! Connectivity of the graphs described by adjacency matrices
//!
//! Each matrix read from the container is treated as the weighted adjacency
//! matrix of an undirected graph. The checker reports node count, edge count
//! and connectedness for the matrix as-is and for a clipped copy (clipping
//! negative weights to zero removes those edges).
//!
//! Asymmetric input: the edge `{i, j}` exists if either `A[i, j]` or
//! `A[j, i]` is non-zero, and carries the upper-triangle weight when that one
//! is non-zero. Non-zero diagonal entries are self-loops.

use crate::config::ConnectivityConfig;
use crate::exhibit::transform::clip;
use crate::exhibit::{
    read_matrices, DiagnosticSink, ExhibitError, MatrixContainer, ReadOptions, RunReport,
};
use ndarray::Array2;
use petgraph::algo::connected_components;
use petgraph::graph::UnGraph;

/// Structural summary of one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphMetrics {
    pub nodes: usize,
    pub edges: usize,
    pub connected: bool,
}

/// Metrics of one matrix, raw and clipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityReport {
    pub index: usize,
    pub raw: GraphMetrics,
    pub clipped: GraphMetrics,
}

/// Build the undirected weighted graph with adjacency matrix `mat`
///
/// `mat` must be square; see the module docs for asymmetric input.
pub fn adjacency_graph(mat: &Array2<f64>) -> UnGraph<(), f64> {
    let n = mat.nrows();
    let mut graph = UnGraph::with_capacity(n, n);
    let nodes: Vec<_> = (0..n).map(|_| graph.add_node(())).collect();

    for i in 0..n {
        for j in i..n {
            let upper = mat[[i, j]];
            let lower = mat[[j, i]];
            let weight = if upper != 0.0 { upper } else { lower };
            if weight != 0.0 {
                graph.add_edge(nodes[i], nodes[j], weight);
            }
        }
    }

    graph
}

/// Node count, edge count and connectedness of `graph`
///
/// A graph without nodes is reported as not connected.
pub fn graph_metrics(graph: &UnGraph<(), f64>) -> GraphMetrics {
    let nodes = graph.node_count();
    GraphMetrics {
        nodes,
        edges: graph.edge_count(),
        connected: nodes > 0 && connected_components(graph) == 1,
    }
}

/// Analyze one square matrix and its clipped copy
pub fn analyze_matrix(
    index: usize,
    mat: &Array2<f64>,
    clip_range: (f64, f64),
) -> Result<ConnectivityReport, ExhibitError> {
    let (rows, cols) = mat.dim();
    if rows != cols {
        return Err(ExhibitError::NonSquare { index, rows, cols });
    }

    let clipped = clip(mat, clip_range.0, clip_range.1);
    Ok(ConnectivityReport {
        index,
        raw: graph_metrics(&adjacency_graph(mat)),
        clipped: graph_metrics(&adjacency_graph(&clipped)),
    })
}

/// Report graph metrics for every matrix in the requested variables
///
/// Variables must be 3D stacks of adjacency matrices (indexed by the last
/// axis). Nothing is written.
pub fn check_connectivity(
    container: &mut dyn MatrixContainer,
    config: &ConnectivityConfig,
    sink: &mut dyn DiagnosticSink,
) -> RunReport<Vec<ConnectivityReport>> {
    let extraction = read_matrices(container, &config.variables, ReadOptions::stacked(), sink);

    let mut report = RunReport::new(Vec::with_capacity(extraction.matrices.len()));
    report.extend(extraction.failures);

    let clip_range = config.effective_clip();
    for (i, mat) in extraction.matrices.iter().enumerate() {
        match analyze_matrix(i, mat, clip_range) {
            Ok(metrics) => {
                sink.info(format!(
                    "Exhibit {:2}: nnodes {:5} edges {:5} connected {}",
                    i, metrics.raw.nodes, metrics.raw.edges, metrics.raw.connected
                ));
                sink.info(format!(
                    "          : nnodes {:5} edges {:5} connected {}",
                    metrics.clipped.nodes, metrics.clipped.edges, metrics.clipped.connected
                ));
                report.output.push(metrics);
            }
            Err(e) => {
                sink.error(e.to_string());
                report.record(e);
            }
        }
    }

    report
}
