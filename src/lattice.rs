//! The lattice of one line: every candidate edge, indexed by start offset.

use tracing::error;

use crate::edge::{Cost, Edge, EdgeKind};

#[derive(Debug, Clone)]
pub struct Lattice {
    chars: Vec<char>,
    edges: Vec<Edge>,
    /// `by_start[i]` holds the ids of all edges starting at `i`, in insertion order.
    by_start: Vec<Vec<usize>>,
}

impl Lattice {
    pub(crate) fn new(chars: Vec<char>, edges: Vec<Edge>) -> Self {
        let mut lattice = Lattice { by_start: vec![Vec::new(); chars.len()], chars, edges: Vec::new() };
        for edge in edges {
            lattice.add_edge(edge);
        }
        lattice
    }

    pub(crate) fn add_edge(&mut self, edge: Edge) -> usize {
        debug_assert!(edge.end() <= self.chars.len(), "edge {edge} runs past the line");
        let id = self.edges.len();
        self.by_start[edge.start()].push(id);
        self.edges.push(edge);
        id
    }

    /// Line length in code points.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: usize) -> &Edge {
        &self.edges[id]
    }

    pub fn edges_from(&self, start: usize) -> impl Iterator<Item = (usize, &Edge)> + '_ {
        self.by_start
            .get(start)
            .into_iter()
            .flatten()
            .map(|&id| (id, &self.edges[id]))
    }

    /// Offsets from which no edge starts. A complete path needs every offset on
    /// it to have a way forward, and the builder gives every offset at least one.
    pub fn coverage_gaps(&self) -> Vec<usize> {
        (0..self.chars.len()).filter(|&i| self.by_start[i].is_empty()).collect()
    }

    /// Closes coverage gaps with fallback edges. A gap means the builder is broken.
    pub(crate) fn repair_coverage(&mut self, priority: u32) -> usize {
        let gaps = self.coverage_gaps();
        debug_assert!(gaps.is_empty(), "lattice leaves offsets {gaps:?} without an outgoing edge");
        if gaps.is_empty() {
            return 0;
        }

        error!(?gaps, line = %self.text(), "lattice coverage violated, adding fallback edges");
        for &i in &gaps {
            let txt = self.chars[i].to_string();
            self.add_edge(Edge::new_regular(
                i,
                i + 1,
                txt,
                EdgeKind::Fallback,
                Cost::FALLBACK,
                priority,
                u32::MAX,
            ));
        }
        gaps.len()
    }
}
