//! Numeric recognizer: digit runs in any registered digit block, signed numbers
//! and CJK numerals (positional `二〇二四` and multiplicative `一兆二千万`).

use std::collections::HashMap;

use serde::Deserialize;

use crate::edge::{Cost, Edge, NumData, NumericForm};
use crate::error::RuleLoadError;
use crate::rule_set::NumericMarkers;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DigitBlockLine {
    digit_zero: String,
    script: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct NumeralLine {
    txt: String,
    value: u64,
    #[serde(default)]
    is_large_power: bool,
    #[serde(default)]
    script: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumPropLine {
    DigitBlock(DigitBlockLine),
    Numeral(NumeralLine),
}

#[derive(Debug, Clone)]
struct DigitBlock {
    zero: u32,
    script: String,
}

/// A character with a numeric value outside a decimal digit block.
#[derive(Debug, Clone, PartialEq)]
pub struct Numeral {
    pub value: u64,
    pub is_large_power: bool,
    pub script: Option<String>,
}

impl Numeral {
    fn is_digit(&self) -> bool {
        self.value < 10
    }
}

/// Numeral properties loaded from `NumProps.jsonl`.
#[derive(Debug, Default)]
pub struct NumProps {
    /// Sorted by `zero`; each block spans `zero..zero + 10`.
    digit_blocks: Vec<DigitBlock>,
    numerals: HashMap<char, Numeral>,
}

impl NumProps {
    pub(crate) fn load(content: &str, provenance: &str) -> Result<Self, RuleLoadError> {
        let mut props = NumProps::default();

        for (idx, line) in content.lines().enumerate() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let err = |reason: String| RuleLoadError::new(provenance, idx + 1, reason);

            let parsed: NumPropLine =
                serde_json::from_str(line).map_err(|e| err(format!("invalid JSON: {e}")))?;
            match parsed {
                NumPropLine::DigitBlock(block) => {
                    let zero = u32::from_str_radix(&block.digit_zero, 16)
                        .ok()
                        .filter(|&z| (0..10).all(|d| char::from_u32(z + d).is_some()))
                        .ok_or_else(|| err(format!("bad digit-zero '{}'", block.digit_zero)))?;
                    props.digit_blocks.push(DigitBlock { zero, script: block.script });
                }
                NumPropLine::Numeral(numeral) => {
                    let mut chars = numeral.txt.chars();
                    let (Some(c), None) = (chars.next(), chars.next()) else {
                        return Err(err(format!("numeral '{}' must be one character", numeral.txt)));
                    };
                    props.numerals.insert(
                        c,
                        Numeral {
                            value: numeral.value,
                            is_large_power: numeral.is_large_power,
                            script: numeral.script,
                        },
                    );
                }
            }
        }

        props.digit_blocks.sort_unstable_by_key(|b| b.zero);
        if let Some(pair) = props.digit_blocks.windows(2).find(|w| w[0].zero + 10 > w[1].zero) {
            return Err(RuleLoadError::new(
                provenance,
                0,
                format!("digit blocks at U+{:04X} and U+{:04X} overlap", pair[0].zero, pair[1].zero),
            ));
        }
        Ok(props)
    }

    /// Returns `(block zero, digit value)` for a decimal digit.
    pub fn digit(&self, c: char) -> Option<(u32, u32)> {
        let cp = c as u32;
        let pos = self.digit_blocks.partition_point(|b| b.zero <= cp);
        let block = self.digit_blocks.get(pos.checked_sub(1)?)?;
        (cp < block.zero + 10).then_some((block.zero, cp - block.zero))
    }

    pub fn numeral(&self, c: char) -> Option<&Numeral> {
        self.numerals.get(&c)
    }

    pub fn n_digit_blocks(&self) -> usize {
        self.digit_blocks.len()
    }

    pub fn n_numerals(&self) -> usize {
        self.numerals.len()
    }

    fn block_script(&self, zero: u32) -> Option<&str> {
        self.digit_blocks.iter().find(|b| b.zero == zero).map(|b| b.script.as_str())
    }
}

/// Renders a numeric value the way it is printed in romanized text.
pub(crate) fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Finds the numeric edges of one line.
pub(crate) struct NumericRecognizer<'a> {
    props: &'a NumProps,
    markers: &'a NumericMarkers,
    priority: u32,
}

impl<'a> NumericRecognizer<'a> {
    pub(crate) fn new(props: &'a NumProps, markers: &'a NumericMarkers, priority: u32) -> Self {
        Self { props, markers, priority }
    }

    pub(crate) fn recognize(&self, chars: &[char]) -> Vec<Edge> {
        let mut edges = Vec::new();
        self.add_digit_runs(chars, &mut edges);
        self.add_numerals(chars, &mut edges);
        edges
    }

    fn add_digit_runs(&self, chars: &[char], edges: &mut Vec<Edge>) {
        let mut i = 0;
        while i < chars.len() {
            let Some((zero, _)) = self.props.digit(chars[i]) else {
                i += 1;
                continue;
            };
            let end = self.run_end(chars, i, zero);
            if let Some((txt, value)) = self.parse_run(&chars[i..end]) {
                let script = self.props.block_script(zero).map(str::to_string);
                edges.push(self.numeric_edge(
                    chars,
                    i,
                    end,
                    txt.clone(),
                    value,
                    script.clone(),
                    NumericForm::Positional,
                    Cost::NUMBER,
                ));

                if i > 0 {
                    let sign = chars[i - 1];
                    let free_standing = i < 2 || !chars[i - 2].is_alphanumeric();
                    let negative = self.markers.minus_signs.contains(&sign);
                    if free_standing && (negative || self.markers.plus_signs.contains(&sign)) {
                        let (txt, value) = if negative {
                            (format!("-{txt}"), -value)
                        } else {
                            (format!("+{txt}"), value)
                        };
                        edges.push(self.numeric_edge(
                            chars,
                            i - 1,
                            end,
                            txt,
                            value,
                            script,
                            NumericForm::Positional,
                            Cost::NUMBER,
                        ));
                    }
                }
            }
            i = end;
        }
    }

    /// End of the maximal run starting at `start`: digits of one block, plus
    /// separators that are directly followed by another digit of that block.
    fn run_end(&self, chars: &[char], start: usize, zero: u32) -> usize {
        let same_block = |c: char| self.props.digit(c).is_some_and(|(z, _)| z == zero);
        let mut end = start;
        while end < chars.len() {
            let c = chars[end];
            if same_block(c) {
                end += 1;
            } else if self.is_separator(c) && chars.get(end + 1).is_some_and(|&next| same_block(next)) {
                end += 1;
            } else {
                break;
            }
        }
        end
    }

    fn is_separator(&self, c: char) -> bool {
        self.markers.decimal_points.contains(&c) || self.markers.group_separators.contains(&c)
    }

    /// Validates `digits (group digit{3})* (decimal digits+)?` and returns the
    /// ASCII rendering and value, or `None` for a malformed run.
    fn parse_run(&self, run: &[char]) -> Option<(String, f64)> {
        let mut txt = String::with_capacity(run.len());
        let mut plain = String::with_capacity(run.len());
        let mut seen_decimal = false;
        let mut digits_since_sep = 0usize;
        let mut last_sep_was_group = false;

        for &c in run {
            if let Some((_, d)) = self.props.digit(c) {
                let digit = char::from_digit(d, 10)?;
                txt.push(digit);
                plain.push(digit);
                digits_since_sep += 1;
                continue;
            }

            let is_decimal = self.markers.decimal_points.contains(&c);
            let is_group = self.markers.group_separators.contains(&c);
            let as_group = match (is_decimal, is_group) {
                (true, false) => false,
                (false, true) => true,
                // Both roles: repeated use can only mean grouping; a single use is ambiguous.
                (true, true) if run.iter().filter(|&&x| x == c).count() > 1 => true,
                _ => return None,
            };

            if last_sep_was_group && digits_since_sep != 3 {
                return None;
            }
            if as_group {
                if seen_decimal {
                    return None;
                }
                txt.push(',');
                last_sep_was_group = true;
            } else {
                if seen_decimal {
                    return None;
                }
                seen_decimal = true;
                txt.push('.');
                plain.push('.');
                last_sep_was_group = false;
            }
            digits_since_sep = 0;
        }

        if last_sep_was_group && digits_since_sep != 3 {
            return None;
        }
        let value = plain.parse::<f64>().ok()?;
        Some((txt, value))
    }

    fn add_numerals(&self, chars: &[char], edges: &mut Vec<Edge>) {
        let numeral_at = |i: usize| chars.get(i).and_then(|&c| self.props.numeral(c));

        for (i, &c) in chars.iter().enumerate() {
            if let Some(numeral) = self.props.numeral(c) {
                let value = numeral.value as f64;
                edges.push(self.numeric_edge(
                    chars,
                    i,
                    i + 1,
                    format_value(value),
                    value,
                    numeral.script.clone(),
                    if numeral.is_digit() { NumericForm::Positional } else { NumericForm::Multiplicative },
                    Cost::SINGLE_NUMERAL,
                ));
            }
        }

        let mut i = 0;
        while i < chars.len() {
            if numeral_at(i).is_none() {
                i += 1;
                continue;
            }
            let mut run_end = i;
            while numeral_at(run_end).is_some() {
                run_end += 1;
            }
            let run: Vec<&Numeral> = (i..run_end).filter_map(numeral_at).collect();
            let script = run[0].script.clone();

            if run.len() >= 2 && run.iter().all(|n| n.is_digit()) {
                let value = run.iter().fold(0f64, |acc, n| acc * 10.0 + n.value as f64);
                let txt: String = run.iter().map(|n| n.value.to_string()).collect();
                edges.push(self.numeric_edge(
                    chars,
                    i,
                    run_end,
                    txt,
                    value,
                    script,
                    NumericForm::Positional,
                    Cost::NUMBER,
                ));
                i = run_end;
                continue;
            }

            let mut start = i;
            while start < run_end {
                let (value, consumed) = parse_multiplicative(&run[start - i..]);
                if consumed >= 2 {
                    let value = value as f64;
                    edges.push(self.numeric_edge(
                        chars,
                        start,
                        start + consumed,
                        format_value(value),
                        value,
                        script.clone(),
                        NumericForm::Multiplicative,
                        Cost::NUMBER,
                    ));
                }
                start += consumed.max(1);
            }
            i = run_end;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn numeric_edge(
        &self,
        chars: &[char],
        start: usize,
        end: usize,
        txt: String,
        value: f64,
        script: Option<String>,
        form: NumericForm,
        cost: Cost,
    ) -> Edge {
        let orig_txt: String = chars[start..end].iter().collect();
        Edge::new_numeric(start, end, txt, cost, self.priority, NumData { value, orig_txt, script, form })
    }
}

/// Parses the longest valid multiplicative prefix of `run`.
/// Returns the value and the number of numerals consumed.
fn parse_multiplicative(run: &[&Numeral]) -> (u64, usize) {
    let mut total: u64 = 0;
    let mut section: u64 = 0;
    let mut pending: Option<u64> = None;
    let mut last_small = u64::MAX;
    let mut last_large = u64::MAX;
    let mut consumed = 0;

    for (k, numeral) in run.iter().enumerate() {
        let value = numeral.value;
        if numeral.is_digit() {
            if value == 0 && pending.is_none() {
                // 〇/零 as a place holder: 二千零五
            } else if pending.is_some() {
                break;
            } else {
                pending = Some(value);
            }
        } else if numeral.is_large_power {
            let sec = section + pending.unwrap_or(0);
            if value >= last_large || sec == 0 {
                break;
            }
            total = total.saturating_add(sec.saturating_mul(value));
            section = 0;
            pending = None;
            last_small = u64::MAX;
            last_large = value;
        } else {
            if value >= last_small {
                break;
            }
            section += pending.unwrap_or(1) * value;
            pending = None;
            last_small = value;
        }
        consumed = k + 1;
    }

    (total.saturating_add(section + pending.unwrap_or(0)), consumed)
}
