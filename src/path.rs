//! Best-path selection over the lattice DAG, plus ranked alternates.

use std::collections::HashSet;
use std::ops::Add;

use crate::edge::Edge;
use crate::error::RomanizationError;
use crate::lattice::Lattice;

/// Additive path weight, compared lexicographically: total cost, then the summed
/// rule-set priority (lower is more specific), then the number of edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathCost {
    pub cost: u64,
    pub priority: u64,
    pub edges: u32,
}

impl PathCost {
    pub const ZERO: PathCost = PathCost { cost: 0, priority: 0, edges: 0 };

    pub fn of(edge: &Edge) -> PathCost {
        PathCost { cost: u64::from(edge.cost().0), priority: u64::from(edge.priority()), edges: 1 }
    }
}

impl Add for PathCost {
    type Output = PathCost;

    fn add(self, rhs: PathCost) -> PathCost {
        PathCost {
            cost: self.cost + rhs.cost,
            priority: self.priority + rhs.priority,
            edges: self.edges + rhs.edges,
        }
    }
}

/// Full ranking key of a candidate: path weight, then the registration order of
/// the producing rule, then the edge's position in the lattice.
type RankKey = (PathCost, u32, usize);

fn rank_key(weight: PathCost, edge: &Edge, id: usize) -> RankKey {
    (weight, edge.ordinal(), id)
}

#[derive(Debug, Clone)]
pub struct Selection {
    path: Vec<usize>,
    /// Best cost from each offset to the end of the line; `None` when the end is unreachable.
    suffix: Vec<Option<PathCost>>,
    total: PathCost,
}

/// Selects the unique best path with a forward pass, then computes best suffix
/// costs with a backward pass for alternate ranking.
pub fn select(lattice: &Lattice) -> Result<Selection, RomanizationError> {
    let n = lattice.len();

    let mut best: Vec<Option<RankKey>> = vec![None; n + 1];
    let mut reach: Vec<Option<PathCost>> = vec![None; n + 1];
    reach[0] = Some(PathCost::ZERO);

    for i in 0..n {
        let Some(base) = reach[i] else {
            continue;
        };
        for (id, edge) in lattice.edges_from(i) {
            let key = rank_key(base + PathCost::of(edge), edge, id);
            let end = edge.end();
            if best[end].is_none_or(|current| key < current) {
                best[end] = Some(key);
                reach[end] = Some(key.0);
            }
        }
    }

    let total = reach[n].ok_or_else(|| {
        RomanizationError::InternalError(format!("no path covers the line '{}'", lattice.text()))
    })?;

    let mut path = Vec::new();
    let mut position = n;
    while position > 0 {
        let (_, _, id) = best[position].ok_or_else(|| {
            RomanizationError::InternalError(format!("broken back-pointer at offset {position}"))
        })?;
        path.push(id);
        position = lattice.edge(id).start();
    }
    path.reverse();

    let mut suffix: Vec<Option<PathCost>> = vec![None; n + 1];
    suffix[n] = Some(PathCost::ZERO);
    for i in (0..n).rev() {
        suffix[i] = lattice
            .edges_from(i)
            .filter_map(|(_, edge)| suffix[edge.end()].map(|rest| PathCost::of(edge) + rest))
            .min();
    }

    Ok(Selection { path, suffix, total })
}

impl Selection {
    /// Edge ids of the best path, in offset order.
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn total(&self) -> PathCost {
        self.total
    }

    pub fn best_suffix(&self, offset: usize) -> Option<PathCost> {
        self.suffix.get(offset).copied().flatten()
    }

    pub fn edges<'l>(&self, lattice: &'l Lattice) -> impl Iterator<Item = &'l Edge> + use<'_, 'l> {
        self.path.iter().map(move |&id| lattice.edge(id))
    }

    pub fn text(&self, lattice: &Lattice) -> String {
        self.edges(lattice).map(Edge::txt).collect()
    }

    /// Other edges starting where `edge_id` starts, best first, ranked by the cost
    /// of the best complete path through them. Duplicates by `(end, text)` are dropped.
    pub fn alternates(&self, lattice: &Lattice, edge_id: usize, max: Option<usize>) -> Vec<usize> {
        let chosen = lattice.edge(edge_id);
        let mut candidates: Vec<RankKey> = lattice
            .edges_from(chosen.start())
            .filter(|&(id, _)| id != edge_id)
            .filter_map(|(id, edge)| {
                let rest = self.best_suffix(edge.end())?;
                Some(rank_key(PathCost::of(edge) + rest, edge, id))
            })
            .collect();
        candidates.sort_unstable();

        let mut seen: HashSet<(usize, &str)> = HashSet::from([(chosen.end(), chosen.txt())]);
        candidates
            .into_iter()
            .map(|(_, _, id)| id)
            .filter(|&id| {
                let edge = lattice.edge(id);
                seen.insert((edge.end(), edge.txt()))
            })
            .take(max.unwrap_or(usize::MAX))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Cost, EdgeKind};

    fn edge(start: usize, end: usize, txt: &str, cost: u32, priority: u32, ordinal: u32) -> Edge {
        Edge::new_regular(start, end, txt.into(), EdgeKind::Rule, Cost(cost), priority, ordinal)
    }

    fn best_texts(lattice: &Lattice) -> Vec<String> {
        let selection = select(lattice).unwrap();
        selection.edges(lattice).map(|e| e.txt().to_string()).collect()
    }

    #[test]
    fn lower_cost_wins_over_longer_match() {
        let lattice = Lattice::new(
            "ab".chars().collect(),
            vec![edge(0, 2, "AB", 2500, 0, 0), edge(0, 1, "a", 1000, 0, 1), edge(1, 2, "b", 1000, 0, 2)],
        );
        assert_eq!(best_texts(&lattice), ["a", "b"]);
        assert_eq!(select(&lattice).unwrap().total().cost, 2000);
    }

    #[test]
    fn priority_breaks_cost_ties() {
        let lattice = Lattice::new(
            "a".chars().collect(),
            vec![edge(0, 1, "generic", 1000, 2, 0), edge(0, 1, "lang", 1000, 0, 9)],
        );
        assert_eq!(best_texts(&lattice), ["lang"]);
    }

    #[test]
    fn fewer_edges_break_priority_ties() {
        let lattice = Lattice::new(
            "ab".chars().collect(),
            vec![edge(0, 1, "a", 1000, 0, 0), edge(1, 2, "b", 1000, 0, 1), edge(0, 2, "ab", 2000, 0, 2)],
        );
        // Same cost; the two-edge path also sums the same priority (0) but uses more edges.
        assert_eq!(best_texts(&lattice), ["ab"]);
    }

    #[test]
    fn registration_order_breaks_remaining_ties() {
        let lattice = Lattice::new(
            "a".chars().collect(),
            vec![edge(0, 1, "second", 1000, 0, 5), edge(0, 1, "first", 1000, 0, 4)],
        );
        assert_eq!(best_texts(&lattice), ["first"]);
    }

    #[test]
    fn path_edges_outlive_the_selection() {
        let lattice = Lattice::new(
            "ab".chars().collect(),
            vec![edge(0, 1, "a", 1000, 0, 0), edge(1, 2, "b", 1000, 0, 1)],
        );
        let edges: Vec<&Edge> = {
            let selection = select(&lattice).unwrap();
            selection.edges(&lattice).collect()
        };
        let texts: Vec<&str> = edges.iter().map(|e| e.txt()).collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[test]
    fn empty_line_has_empty_path() {
        let lattice = Lattice::new(Vec::new(), Vec::new());
        let selection = select(&lattice).unwrap();
        assert!(selection.path().is_empty());
        assert_eq!(selection.total(), PathCost::ZERO);
    }

    #[test]
    fn unreachable_end_is_an_internal_error() {
        let lattice = Lattice::new("ab".chars().collect(), vec![edge(0, 1, "a", 1000, 0, 0)]);
        assert!(matches!(select(&lattice), Err(RomanizationError::InternalError(_))));
    }

    #[test]
    fn alternates_are_ranked_and_deduplicated() {
        let lattice = Lattice::new(
            "ab".chars().collect(),
            vec![
                edge(0, 1, "a", 1000, 0, 0),
                edge(1, 2, "b", 1000, 0, 1),
                edge(0, 2, "ab", 2600, 0, 2),
                edge(0, 1, "ah", 1500, 0, 3),
                edge(0, 1, "ah", 1700, 1, 4),
                edge(0, 1, "a", 1200, 1, 5),
            ],
        );
        let selection = select(&lattice).unwrap();
        let first = selection.path()[0];
        let alts: Vec<&str> = selection
            .alternates(&lattice, first, None)
            .into_iter()
            .map(|id| lattice.edge(id).txt())
            .collect();
        assert_eq!(alts, ["ah", "ab"]);

        let capped = selection.alternates(&lattice, first, Some(1));
        assert_eq!(capped.len(), 1);
        assert_eq!(selection.best_suffix(1).map(|c| c.cost), Some(1000));
    }
}
