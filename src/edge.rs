//! Lattice edges: candidate romanizations of a span of the input line.

use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::fmt;

/// Edge cost in milli-units. Integer costs keep path sums exact and ordering stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost(pub u32);

impl Cost {
    pub const RULE: Cost = Cost(1000);
    pub const RESTRICTION_BONUS: u32 = 10;
    pub const ALTERNATE_PENALTY: u32 = 500;
    pub const DECOMPOSITION: Cost = Cost(1500);
    pub const SYLLABLE: Cost = Cost(1000);
    pub const NUMBER: Cost = Cost(1000);
    pub const SINGLE_NUMERAL: Cost = Cost(1100);
    pub const DIGIT: Cost = Cost(1200);
    pub const WHITESPACE: Cost = Cost(1000);
    pub const FALLBACK: Cost = Cost(5000);

    /// Converts a cost written in rule data (`1.0`, `0.75`) to milli-units.
    pub fn from_units(units: f64) -> Option<Cost> {
        if !units.is_finite() || units < 0.0 || units > f64::from(u32::MAX) / 1000.0 {
            return None;
        }
        Some(Cost((units * 1000.0).round() as u32))
    }

    pub fn saturating_add(self, extra: u32) -> Cost {
        Cost(self.0.saturating_add(extra))
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / 1000, self.0 % 1000)
    }
}

/// What produced a textual edge. The set is closed: every consumer matches it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Rule,
    Alternate,
    Expansion,
    Decomposition,
    Syllable,
    Digit,
    Whitespace,
    Fallback,
}

impl EdgeKind {
    pub fn tag(self) -> &'static str {
        match self {
            EdgeKind::Rule => "rom",
            EdgeKind::Alternate => "rom-alt",
            EdgeKind::Expansion => "rom exp",
            EdgeKind::Decomposition => "rom decomp",
            EdgeKind::Syllable => "rom syllable",
            EdgeKind::Digit => "digit",
            EdgeKind::Whitespace => "whitespace",
            EdgeKind::Fallback => "fallback",
        }
    }
}

pub const NUMERIC_TAG: &str = "numeric";

/// How a numeric value was composed from its characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericForm {
    /// Place-value digits: `123`, `١٢٣`, `二〇二四`.
    Positional,
    /// Digits scaled by unit characters: `四十二`, `一兆二千万`.
    Multiplicative,
}

impl NumericForm {
    pub fn name(self) -> &'static str {
        match self {
            NumericForm::Positional => "positional",
            NumericForm::Multiplicative => "multiplicative",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    pub start: usize,
    pub end: usize,
    pub txt: String,
    pub cost: Cost,
    /// Rank of the RuleSet that produced the edge; 0 is the most specific.
    pub priority: u32,
    /// Registration order of the producing rule, used as the last tie-break.
    /// Edges not produced by a registered rule use `u32::MAX`.
    pub ordinal: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumData {
    pub value: f64,
    pub orig_txt: String,
    pub script: Option<String>,
    pub form: NumericForm,
}

/// A candidate mapping of `start..end` (code points) to romanized text.
#[derive(Debug, Clone, PartialEq)]
pub enum Edge {
    Regular { data: EdgeData, kind: EdgeKind },
    Numeric { data: EdgeData, num_data: NumData },
}

impl Edge {
    pub(crate) fn new_regular(
        start: usize,
        end: usize,
        txt: String,
        kind: EdgeKind,
        cost: Cost,
        priority: u32,
        ordinal: u32,
    ) -> Self {
        debug_assert!(start < end, "edge span must not be empty");
        Edge::Regular { data: EdgeData { start, end, txt, cost, priority, ordinal }, kind }
    }

    pub(crate) fn new_numeric(
        start: usize,
        end: usize,
        txt: String,
        cost: Cost,
        priority: u32,
        num_data: NumData,
    ) -> Self {
        debug_assert!(start < end, "edge span must not be empty");
        Edge::Numeric {
            data: EdgeData {
                start,
                end,
                txt,
                cost,
                priority,
                ordinal: u32::MAX,
            },
            num_data,
        }
    }

    pub fn get_data(&self) -> &EdgeData {
        match self {
            Edge::Regular { data, .. } | Edge::Numeric { data, .. } => data,
        }
    }

    pub fn get_num_data(&self) -> Option<&NumData> {
        match self {
            Edge::Numeric { num_data, .. } => Some(num_data),
            Edge::Regular { .. } => None,
        }
    }

    pub fn start(&self) -> usize {
        self.get_data().start
    }

    pub fn end(&self) -> usize {
        self.get_data().end
    }

    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn txt(&self) -> &str {
        &self.get_data().txt
    }

    pub fn cost(&self) -> Cost {
        self.get_data().cost
    }

    pub fn priority(&self) -> u32 {
        self.get_data().priority
    }

    pub fn ordinal(&self) -> u32 {
        self.get_data().ordinal
    }

    /// The textual kind, or `None` for numeric edges.
    pub fn kind(&self) -> Option<EdgeKind> {
        match self {
            Edge::Regular { kind, .. } => Some(*kind),
            Edge::Numeric { .. } => None,
        }
    }

    pub fn edge_type(&self) -> &'static str {
        match self {
            Edge::Regular { kind, .. } => kind.tag(),
            Edge::Numeric { .. } => NUMERIC_TAG,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Edge::Numeric { .. })
    }

    pub fn value(&self) -> Option<f64> {
        self.get_num_data().map(|n| n.value)
    }

    /// The untouched source text of a numeric edge.
    pub fn orig_txt(&self) -> Option<&str> {
        self.get_num_data().map(|n| n.orig_txt.as_str())
    }

    /// Script of the digits or numerals of a numeric edge, when known.
    pub fn script(&self) -> Option<&str> {
        self.get_num_data().and_then(|n| n.script.as_deref())
    }

    pub fn numeric_form(&self) -> Option<NumericForm> {
        self.get_num_data().map(|n| n.form)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}-{}] {:?} ({}, cost {})",
            self.start(),
            self.end(),
            self.txt(),
            self.edge_type(),
            self.cost()
        )?;
        if let Some(num_data) = self.get_num_data() {
            write!(f, " = {} {}", num_data.value, num_data.form.name())?;
            if let Some(script) = &num_data.script {
                write!(f, " {script}")?;
            }
        }
        Ok(())
    }
}

impl Edge {
    /// Number of JSON array elements.
    pub(crate) fn serialized_len(&self) -> usize {
        if self.is_numeric() { 6 } else { 4 }
    }

    /// Writes the edge's JSON array elements into an open sequence.
    pub(crate) fn serialize_fields<S: SerializeSeq>(&self, seq: &mut S) -> Result<(), S::Error> {
        seq.serialize_element(&self.start())?;
        seq.serialize_element(&self.end())?;
        seq.serialize_element(self.txt())?;
        seq.serialize_element(self.edge_type())?;
        if let Some(num_data) = self.get_num_data() {
            seq.serialize_element(&num_data.value)?;
            seq.serialize_element(&num_data.orig_txt)?;
        }
        Ok(())
    }
}

/// Serialized as `[start, end, "text", "type"]`, numeric edges append `value` and `orig_text`.
impl Serialize for Edge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.serialized_len()))?;
        self.serialize_fields(&mut seq)?;
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_units() {
        assert_eq!(Cost::from_units(1.0), Some(Cost::RULE));
        assert_eq!(Cost::from_units(0.25), Some(Cost(250)));
        assert_eq!(Cost::from_units(-1.0), None);
        assert_eq!(Cost::from_units(f64::NAN), None);
        assert_eq!(Cost(1500).to_string(), "1.500");
    }

    #[test]
    fn json_shape() {
        let edge = Edge::new_regular(0, 2, "kya".into(), EdgeKind::Rule, Cost::RULE, 1, 7);
        assert_eq!(serde_json::to_string(&edge).unwrap(), r#"[0,2,"kya","rom"]"#);

        let num = Edge::new_numeric(
            3,
            6,
            "123".into(),
            Cost::NUMBER,
            0,
            NumData {
                value: 123.0,
                orig_txt: "١٢٣".into(),
                script: Some("Arabic".into()),
                form: NumericForm::Positional,
            },
        );
        assert_eq!(serde_json::to_string(&num).unwrap(), r#"[3,6,"123","numeric",123.0,"١٢٣"]"#);
        assert_eq!(num.orig_txt(), Some("١٢٣"));
        assert_eq!(num.value(), Some(123.0));
        assert!(num.kind().is_none());
        assert_eq!(num.script(), Some("Arabic"));
        assert_eq!(num.numeric_form(), Some(NumericForm::Positional));
    }

    #[test]
    fn display_describes_numbers() {
        let edge = Edge::new_regular(0, 1, "a".into(), EdgeKind::Fallback, Cost::FALLBACK, 2, u32::MAX);
        assert_eq!(edge.to_string(), r#"[0-1] "a" (fallback, cost 5.000)"#);

        let num = Edge::new_numeric(
            0,
            3,
            "42".into(),
            Cost::NUMBER,
            1,
            NumData {
                value: 42.0,
                orig_txt: "四十二".into(),
                script: Some("Han".into()),
                form: NumericForm::Multiplicative,
            },
        );
        assert_eq!(num.to_string(), r#"[0-3] "42" (numeric, cost 1.000) = 42 multiplicative Han"#);
        assert!(edge.numeric_form().is_none());
    }
}
