//! Output views over one resolved line.

use std::fmt;

use serde::Serialize;
use serde::ser::{SerializeSeq, Serializer};

use crate::RomFormat;
use crate::edge::Edge;
use crate::error::RomanizationError;
use crate::lattice::Lattice;
use crate::path::{PathCost, Selection};

/// A best-path edge with its ranked alternates.
///
/// Serialized as the edge's own array followed by an array of alternates:
/// `[0, 2, "kya", "rom", [[0, 2, "kia", "rom-alt"]]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AltEdge {
    pub edge: Edge,
    pub alternates: Vec<Edge>,
}

impl Serialize for AltEdge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.edge.serialized_len() + 1))?;
        self.edge.serialize_fields(&mut seq)?;
        seq.serialize_element(&self.alternates)?;
        seq.end()
    }
}

/// The result of one romanization call: the lattice and its selected path.
/// Every view borrows it immutably, so several views can come from one call.
#[derive(Debug, Clone)]
pub struct ResolvedOutput {
    lattice: Lattice,
    selection: Selection,
    max_alternates: Option<usize>,
}

impl ResolvedOutput {
    pub(crate) fn new(lattice: Lattice, selection: Selection, max_alternates: Option<usize>) -> Self {
        Self { lattice, selection, max_alternates }
    }

    /// The `str` view: best-path texts concatenated in offset order.
    pub fn string(&self) -> String {
        self.selection.text(&self.lattice)
    }

    /// The `edges` view: the best path.
    pub fn edges(&self) -> Vec<&Edge> {
        self.selection.edges(&self.lattice).collect()
    }

    /// The `alts` view: the best path, each edge with its ranked alternates.
    pub fn alts(&self) -> Vec<AltEdge> {
        self.selection
            .path()
            .iter()
            .map(|&id| AltEdge {
                edge: self.lattice.edge(id).clone(),
                alternates: self
                    .selection
                    .alternates(&self.lattice, id, self.max_alternates)
                    .into_iter()
                    .map(|alt| self.lattice.edge(alt).clone())
                    .collect(),
            })
            .collect()
    }

    /// The `lattice` view: every edge, unfiltered.
    pub fn lattice(&self) -> &[Edge] {
        self.lattice.edges()
    }

    pub fn line_len(&self) -> usize {
        self.lattice.len()
    }

    pub fn total_cost(&self) -> PathCost {
        self.selection.total()
    }

    pub fn project(&self, format: RomFormat) -> RomanizationResult {
        match format {
            RomFormat::Str => RomanizationResult::Str(self.string()),
            RomFormat::Edges => RomanizationResult::Edges(self.edges().into_iter().cloned().collect()),
            RomFormat::Alts => RomanizationResult::Alts(self.alts()),
            RomFormat::Lattice => RomanizationResult::Edges(self.lattice().to_vec()),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RomanizationResult {
    Str(String),
    Edges(Vec<Edge>),
    Alts(Vec<AltEdge>),
}

impl RomanizationResult {
    /// Text for `Str`, pretty-printed JSON for the edge views.
    pub fn to_string(&self) -> Result<String, RomanizationError> {
        match self {
            RomanizationResult::Str(s) => Ok(s.clone()),
            RomanizationResult::Edges(edges) => Ok(serde_json::to_string_pretty(edges)?),
            RomanizationResult::Alts(alts) => Ok(serde_json::to_string_pretty(alts)?),
        }
    }

    /// Like [`to_string`](Self::to_string), but JSON stays on one line.
    pub fn to_line(&self) -> Result<String, RomanizationError> {
        match self {
            RomanizationResult::Str(s) => Ok(s.clone()),
            other => Ok(serde_json::to_string(other)?),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RomanizationResult::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_edges(&self) -> Option<&[Edge]> {
        match self {
            RomanizationResult::Edges(edges) => Some(edges),
            _ => None,
        }
    }

    pub fn as_alts(&self) -> Option<&[AltEdge]> {
        match self {
            RomanizationResult::Alts(alts) => Some(alts),
            _ => None,
        }
    }
}

impl fmt::Display for RomanizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_string() {
            Ok(s) => write!(f, "{s}"),
            Err(e) => write!(f, "Error: {e:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Cost, EdgeKind};
    use crate::path::select;

    fn output() -> ResolvedOutput {
        let edges = vec![
            Edge::new_regular(0, 1, "ki".into(), EdgeKind::Rule, Cost::RULE, 0, 0),
            Edge::new_regular(1, 2, "ya".into(), EdgeKind::Rule, Cost::RULE, 0, 1),
            Edge::new_regular(0, 2, "kya".into(), EdgeKind::Rule, Cost::RULE, 0, 2),
            Edge::new_regular(0, 2, "kia".into(), EdgeKind::Alternate, Cost(1500), 0, 2),
        ];
        let lattice = Lattice::new("きゃ".chars().collect(), edges);
        let selection = select(&lattice).unwrap();
        ResolvedOutput::new(lattice, selection, None)
    }

    #[test]
    fn views_agree() {
        let out = output();
        assert_eq!(out.string(), "kya");
        let texts: String = out.edges().iter().map(|e| e.txt()).collect();
        assert_eq!(texts, out.string());
        assert_eq!(out.lattice().len(), 4);
        assert_eq!(out.line_len(), 2);
    }

    #[test]
    fn alts_json_shape() {
        let out = output();
        let alts = out.alts();
        assert_eq!(alts.len(), 1);
        let alt_texts: Vec<&str> = alts[0].alternates.iter().map(|e| e.txt()).collect();
        assert_eq!(alt_texts, ["kia", "ki"]);
        assert_eq!(
            serde_json::to_string(&alts[0]).unwrap(),
            r#"[0,2,"kya","rom",[[0,2,"kia","rom-alt"],[0,1,"ki","rom"]]]"#
        );
    }

    #[test]
    fn result_rendering() {
        let out = output();
        assert_eq!(out.project(RomFormat::Str).to_string().unwrap(), "kya");
        assert_eq!(out.project(RomFormat::Edges).to_line().unwrap(), r#"[[0,2,"kya","rom"]]"#);
        assert!(out.project(RomFormat::Lattice).as_edges().is_some_and(|e| e.len() == 4));
        assert!(out.project(RomFormat::Alts).as_alts().is_some());
    }
}
