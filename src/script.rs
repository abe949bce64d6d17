//! Unicode script table loaded from `Scripts.txt`.

use std::collections::HashMap;

use crate::error::RuleLoadError;
use crate::utils::{parse_hex_ranges, slot_value_in_double_colon_del_list, split_list};

/// Represents a script with its properties.
#[derive(Debug, Clone)]
pub struct Script {
    pub script_name: String,
    pub alt_script_names: Vec<String>,
    pub direction: Option<String>,
    pub languages: Vec<String>,
    /// Inherent vowel of an abugida consonant (`a` for Devanagari).
    pub abugida_default_vowel: Option<String>,
    vowel_signs: Vec<(u32, u32)>,
    viramas: Vec<(u32, u32)>,
}

impl Script {
    pub fn is_abugida(&self) -> bool {
        self.abugida_default_vowel.is_some()
    }

    pub(crate) fn is_vowel_sign(&self, c: char) -> bool {
        in_ranges(&self.vowel_signs, c)
    }

    pub(crate) fn is_virama(&self, c: char) -> bool {
        in_ranges(&self.viramas, c)
    }
}

fn in_ranges(ranges: &[(u32, u32)], c: char) -> bool {
    let cp = c as u32;
    ranges.iter().any(|&(lo, hi)| lo <= cp && cp <= hi)
}

/// Script lookup by code point (binary search over sorted, disjoint ranges) and by name.
#[derive(Debug, Default)]
pub struct ScriptTable {
    scripts: Vec<Script>,
    /// `(lo, hi, index into scripts)`, sorted by `lo`.
    ranges: Vec<(u32, u32, usize)>,
    by_name: HashMap<String, usize>,
}

impl ScriptTable {
    pub(crate) fn load(content: &str, provenance: &str) -> Result<Self, RuleLoadError> {
        let mut table = ScriptTable::default();

        for (idx, line) in content.lines().enumerate() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 1;
            let err = |reason: String| RuleLoadError::new(provenance, line_no, reason);

            let script_name = slot_value_in_double_colon_del_list(line, "script-name")
                .ok_or_else(|| err("missing '::script-name'".to_string()))?;
            if table.by_name.contains_key(&script_name.to_lowercase()) {
                return Err(err(format!("duplicate script '{script_name}'")));
            }

            let list = |slot: &str| -> Vec<String> {
                slot_value_in_double_colon_del_list(line, slot)
                    .map(|v| split_list(v).map(str::to_string).collect())
                    .unwrap_or_default()
            };
            let ranges_of = |slot: &str| -> Result<Vec<(u32, u32)>, RuleLoadError> {
                match slot_value_in_double_colon_del_list(line, slot) {
                    Some(v) => parse_hex_ranges(v).map_err(err),
                    None => Ok(Vec::new()),
                }
            };

            let ranges = ranges_of("range")?;
            if ranges.is_empty() {
                return Err(err(format!("script '{script_name}' has no '::range'")));
            }

            let index = table.scripts.len();
            let script = Script {
                script_name: script_name.to_string(),
                alt_script_names: list("alt-script-name"),
                direction: slot_value_in_double_colon_del_list(line, "direction")
                    .map(str::to_string),
                languages: list("language"),
                abugida_default_vowel: list("abugida-default-vowel").into_iter().next(),
                vowel_signs: ranges_of("vowel-sign")?,
                viramas: ranges_of("virama")?,
            };

            table.by_name.insert(script.script_name.to_lowercase(), index);
            for alt in &script.alt_script_names {
                table.by_name.insert(alt.to_lowercase(), index);
            }
            table.ranges.extend(ranges.into_iter().map(|(lo, hi)| (lo, hi, index)));
            table.scripts.push(script);
        }

        table.ranges.sort_unstable_by_key(|&(lo, _, _)| lo);
        if let Some(pair) = table.ranges.windows(2).find(|w| w[0].1 >= w[1].0) {
            return Err(RuleLoadError::new(
                provenance,
                0,
                format!(
                    "ranges of {} and {} overlap at U+{:04X}",
                    table.scripts[pair[0].2].script_name,
                    table.scripts[pair[1].2].script_name,
                    pair[1].0
                ),
            ));
        }

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn script_of(&self, c: char) -> Option<&Script> {
        let cp = c as u32;
        let pos = self.ranges.partition_point(|&(lo, _, _)| lo <= cp);
        let &(_, hi, index) = self.ranges.get(pos.checked_sub(1)?)?;
        (cp <= hi).then(|| &self.scripts[index])
    }

    pub fn by_name(&self, name: &str) -> Option<&Script> {
        self.by_name.get(&name.to_lowercase()).map(|&i| &self.scripts[i])
    }

    /// Whether any script lists `lcode` among its languages.
    pub fn knows_language(&self, lcode: &str) -> bool {
        self.scripts.iter().any(|s| s.languages.iter().any(|l| l == lcode))
    }

    /// Scripts present in `chars`, in order of first occurrence.
    pub fn detect_scripts(&self, chars: &[char]) -> Vec<&Script> {
        let mut found: Vec<&Script> = Vec::new();
        for &c in chars {
            if let Some(script) = self.script_of(c)
                && !found.iter().any(|s| std::ptr::eq(*s, script))
            {
                found.push(script);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPTS: &str = "\
# test scripts
::script-name Latin ::range 0041-005A,0061-007A ::language eng
::script-name Devanagari ::range 0900-097F ::language hin,san ::abugida-default-vowel a ::vowel-sign 093E-094C ::virama 094D
::script-name Han ::alt-script-name CJK ::range 4E00-9FFF ::language zho
";

    #[test]
    fn lookup_by_char_and_name() {
        let table = ScriptTable::load(SCRIPTS, "test").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.script_of('q').unwrap().script_name, "Latin");
        assert_eq!(table.script_of('न').unwrap().script_name, "Devanagari");
        assert!(table.script_of('!').is_none());
        assert!(table.script_of('\u{FFFF}').is_none());
        assert_eq!(table.by_name("cjk").unwrap().script_name, "Han");
        assert!(table.knows_language("san"));
        assert!(!table.knows_language("fra"));
    }

    #[test]
    fn abugida_properties() {
        let table = ScriptTable::load(SCRIPTS, "test").unwrap();
        let deva = table.by_name("Devanagari").unwrap();
        assert!(deva.is_abugida());
        assert!(deva.is_virama('\u{094D}'));
        assert!(deva.is_vowel_sign('\u{0947}'));
        assert!(!deva.is_vowel_sign('न'));
    }

    #[test]
    fn detects_in_first_occurrence_order() {
        let table = ScriptTable::load(SCRIPTS, "test").unwrap();
        let chars: Vec<char> = "中 ab नम x".chars().collect();
        let names: Vec<&str> =
            table.detect_scripts(&chars).iter().map(|s| s.script_name.as_str()).collect();
        assert_eq!(names, ["Han", "Latin", "Devanagari"]);
    }

    #[test]
    fn malformed_tables_fail() {
        let err = ScriptTable::load("::script-name X ::range 00G0", "Scripts.txt").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(ScriptTable::load("::script-name X", "s").is_err());
        assert!(
            ScriptTable::load("::script-name X ::range 0041\n::script-name Y ::range 0040-0042", "s")
                .is_err()
        );
    }
}
