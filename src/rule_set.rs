//! Per-language / per-script rule collections.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::rom_rule::RomRule;

/// Key of a [`RuleSet`], ordered from most to least specific.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleSetId {
    Language(String),
    Script(String),
    Generic,
}

impl fmt::Display for RuleSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSetId::Language(lcode) => write!(f, "lang:{lcode}"),
            RuleSetId::Script(name) => write!(f, "script:{name}"),
            RuleSetId::Generic => f.write_str("generic"),
        }
    }
}

/// Characters that act as separators or signs inside numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumericMarkers {
    pub decimal_points: Vec<char>,
    pub group_separators: Vec<char>,
    pub minus_signs: Vec<char>,
    pub plus_signs: Vec<char>,
}

impl NumericMarkers {
    pub fn is_empty(&self) -> bool {
        self.decimal_points.is_empty()
            && self.group_separators.is_empty()
            && self.minus_signs.is_empty()
            && self.plus_signs.is_empty()
    }

    /// Union of several marker sets, keeping first-seen order.
    pub(crate) fn merged<'a>(sets: impl IntoIterator<Item = &'a NumericMarkers>) -> Self {
        fn extend(into: &mut Vec<char>, from: &[char]) {
            for &c in from {
                if !into.contains(&c) {
                    into.push(c);
                }
            }
        }
        let mut merged = NumericMarkers::default();
        for set in sets {
            extend(&mut merged.decimal_points, &set.decimal_points);
            extend(&mut merged.group_separators, &set.group_separators);
            extend(&mut merged.minus_signs, &set.minus_signs);
            extend(&mut merged.plus_signs, &set.plus_signs);
        }
        merged
    }

    fn register(&mut self, rule: &RomRule) {
        let Some(c) = rule.s.chars().next() else {
            return;
        };
        let targets = [
            (rule.marks.is_decimal_point, &mut self.decimal_points),
            (rule.marks.is_group_separator, &mut self.group_separators),
            (rule.marks.is_minus_sign, &mut self.minus_signs),
            (rule.marks.is_plus_sign, &mut self.plus_signs),
        ];
        for (flag, list) in targets {
            if flag && !list.contains(&c) {
                list.push(c);
            }
        }
    }
}

/// Rules of one language or script, grouped by source string.
#[derive(Debug, Clone)]
pub struct RuleSet {
    id: RuleSetId,
    rules: HashMap<String, Vec<RomRule>>,
    prefixes: HashSet<String>,
    max_len: usize,
    n_rules: usize,
    markers: NumericMarkers,
}

impl RuleSet {
    pub fn new(id: RuleSetId) -> Self {
        Self {
            id,
            rules: HashMap::new(),
            prefixes: HashSet::new(),
            max_len: 0,
            n_rules: 0,
            markers: NumericMarkers::default(),
        }
    }

    pub fn id(&self) -> &RuleSetId {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.n_rules
    }

    pub fn is_empty(&self) -> bool {
        self.n_rules == 0
    }

    /// Length in chars of the longest source string.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn markers(&self) -> &NumericMarkers {
        &self.markers
    }

    pub(crate) fn add_rule(&mut self, rule: RomRule) {
        let mut prefix = String::with_capacity(rule.s.len());
        let mut n_chars = 0;
        for c in rule.s.chars() {
            prefix.push(c);
            n_chars += 1;
            self.prefixes.insert(prefix.clone());
        }
        self.max_len = self.max_len.max(n_chars);
        self.markers.register(&rule);
        self.n_rules += 1;
        self.rules.entry(rule.s.clone()).or_default().push(rule);
    }

    pub fn rules_for(&self, s: &str) -> &[RomRule] {
        self.rules.get(s).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All source strings matching `chars[start..]`, shortest first, as `(end, rules)`.
    /// The scan stops as soon as the candidate is no longer a prefix of any source.
    pub fn matches_at(&self, chars: &[char], start: usize) -> Vec<(usize, &[RomRule])> {
        let mut found = Vec::new();
        let mut candidate = String::new();
        let limit = chars.len().min(start + self.max_len);
        for end in start + 1..=limit {
            candidate.push(chars[end - 1]);
            if !self.prefixes.contains(&candidate) {
                break;
            }
            if let Some(rules) = self.rules.get(&candidate) {
                found.push((end, rules.as_slice()));
            }
        }
        found
    }
}
