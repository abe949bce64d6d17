//! Defines the `RomRule` struct and related parsing logic.

use crate::edge::Cost;
use crate::error::RuleLoadError;
use crate::utils::{
    dequote_string, has_value_in_double_colon_del_list, slot_value_in_double_colon_del_list,
    split_list,
};

/// Role of a rule's source string inside a number (`1,234.5`, `-7`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumericMarks {
    pub is_decimal_point: bool,
    pub is_group_separator: bool,
    pub is_minus_sign: bool,
    pub is_plus_sign: bool,
}

impl NumericMarks {
    pub fn any(&self) -> bool {
        self.is_decimal_point || self.is_group_separator || self.is_minus_sign || self.is_plus_sign
    }
}

/// A single romanization rule parsed from the data files.
#[derive(Debug, Clone, PartialEq)]
pub struct RomRule {
    pub s: String,
    pub t: String,
    pub t_alts: Vec<String>,
    pub lcodes: Vec<String>,
    pub cost: Cost,
    pub left_context: Option<String>,
    pub right_context: Option<String>,
    pub use_only_at_start_of_word: bool,
    pub dont_use_at_start_of_word: bool,
    pub use_only_at_end_of_word: bool,
    pub dont_use_at_end_of_word: bool,
    pub use_only_for_whole_word: bool,
    pub n_restr: usize,
    pub marks: NumericMarks,
    /// Global registration order, assigned by the store.
    pub ordinal: u32,
}

/// Where a candidate span sits relative to the surrounding text.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpanContext {
    pub prev_char: Option<char>,
    pub next_char: Option<char>,
    pub at_start_of_word: bool,
    pub at_end_of_word: bool,
}

impl RomRule {
    /// Creates an unconditional rule with the default cost.
    pub fn new_simple(s: String, t: &str) -> Self {
        Self {
            s,
            t: t.to_string(),
            t_alts: Vec::new(),
            lcodes: Vec::new(),
            cost: Cost::RULE,
            left_context: None,
            right_context: None,
            use_only_at_start_of_word: false,
            dont_use_at_start_of_word: false,
            use_only_at_end_of_word: false,
            dont_use_at_end_of_word: false,
            use_only_for_whole_word: false,
            n_restr: 0,
            marks: NumericMarks::default(),
            ordinal: 0,
        }
    }

    /// Parses one `::s ... ::t ...` line. `line_no` is 1-based and only used for errors.
    pub fn from_line(line: &str, provenance: &str, line_no: usize) -> Result<Self, RuleLoadError> {
        let err = |reason: String| RuleLoadError::new(provenance, line_no, reason);

        let s = slot_value_in_double_colon_del_list(line, "s")
            .map(|v| dequote_string(v).to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| err("rule has no '::s' source".to_string()))?;
        let t = slot_value_in_double_colon_del_list(line, "t")
            .map(|v| dequote_string(v).to_string())
            .ok_or_else(|| err(format!("rule for '{s}' has no '::t' target")))?;

        let lcodes: Vec<String> = slot_value_in_double_colon_del_list(line, "lcode")
            .map(|v| split_list(v).map(str::to_string).collect())
            .unwrap_or_default();
        if let Some(bad) = lcodes.iter().find(|lc| !is_iso639_3(lc)) {
            return Err(err(format!("'{bad}' is not an ISO 639-3 code")));
        }

        let t_alts: Vec<String> = slot_value_in_double_colon_del_list(line, "t-alt")
            .map(|v| split_list(v).map(|part| dequote_string(part).to_string()).collect())
            .unwrap_or_default();

        let left_context = slot_value_in_double_colon_del_list(line, "left-context")
            .map(|v| dequote_string(v).to_string());
        let right_context = slot_value_in_double_colon_del_list(line, "right-context")
            .map(|v| dequote_string(v).to_string());

        let use_only_at_start_of_word =
            has_value_in_double_colon_del_list(line, "use-only-at-start-of-word");
        let dont_use_at_start_of_word =
            has_value_in_double_colon_del_list(line, "dont-use-at-start-of-word");
        let use_only_at_end_of_word =
            has_value_in_double_colon_del_list(line, "use-only-at-end-of-word");
        let dont_use_at_end_of_word =
            has_value_in_double_colon_del_list(line, "dont-use-at-end-of-word");
        let use_only_for_whole_word =
            has_value_in_double_colon_del_list(line, "use-only-for-whole-word");

        let n_restr = [
            left_context.is_some(),
            right_context.is_some(),
            use_only_at_start_of_word,
            dont_use_at_start_of_word,
            use_only_at_end_of_word,
            dont_use_at_end_of_word,
            use_only_for_whole_word,
        ]
        .iter()
        .filter(|&&is_restr| is_restr)
        .count();

        // More restricted rules are more specific, so they get a slightly lower default cost.
        let cost = match slot_value_in_double_colon_del_list(line, "cost") {
            Some(v) => v
                .parse::<f64>()
                .ok()
                .and_then(Cost::from_units)
                .ok_or_else(|| err(format!("invalid cost '{v}'")))?,
            None => Cost(Cost::RULE.0 - Cost::RESTRICTION_BONUS * n_restr as u32),
        };

        let marks = NumericMarks {
            is_decimal_point: has_value_in_double_colon_del_list(line, "is-decimal-point"),
            is_group_separator: has_value_in_double_colon_del_list(line, "is-group-separator"),
            is_minus_sign: has_value_in_double_colon_del_list(line, "is-minus-sign"),
            is_plus_sign: has_value_in_double_colon_del_list(line, "is-plus-sign"),
        };
        if marks.any() && s.chars().count() != 1 {
            return Err(err(format!("numeric marker '{s}' must be a single character")));
        }

        Ok(RomRule {
            s,
            t,
            t_alts,
            lcodes,
            cost,
            left_context,
            right_context,
            use_only_at_start_of_word,
            dont_use_at_start_of_word,
            use_only_at_end_of_word,
            dont_use_at_end_of_word,
            use_only_for_whole_word,
            n_restr,
            marks,
            ordinal: 0,
        })
    }

    /// Checks the rule's context predicates against the span it would cover.
    pub(crate) fn applies_in(&self, ctx: &SpanContext) -> bool {
        let left_ok = self
            .left_context
            .as_ref()
            .is_none_or(|chars| ctx.prev_char.is_some_and(|c| chars.contains(c)));
        let right_ok = self
            .right_context
            .as_ref()
            .is_none_or(|chars| ctx.next_char.is_some_and(|c| chars.contains(c)));
        let start_ok = (!self.use_only_at_start_of_word || ctx.at_start_of_word)
            && (!self.dont_use_at_start_of_word || !ctx.at_start_of_word);
        let end_ok = (!self.use_only_at_end_of_word || ctx.at_end_of_word)
            && (!self.dont_use_at_end_of_word || !ctx.at_end_of_word);
        let whole_word_ok =
            !self.use_only_for_whole_word || (ctx.at_start_of_word && ctx.at_end_of_word);
        left_ok && right_ok && start_ok && end_ok && whole_word_ok
    }
}

pub(crate) fn is_iso639_3(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_lowercase())
}
