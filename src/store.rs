//! The process-wide rule store: rule sets, script table and numeral properties.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use tracing::debug;
use unicode_normalization::UnicodeNormalization;
use unicode_properties::{GeneralCategoryGroup, UnicodeGeneralCategory};

use crate::error::RuleLoadError;
use crate::numeric::NumProps;
use crate::rom_rule::RomRule;
use crate::rule_set::{RuleSet, RuleSetId};
use crate::script::ScriptTable;

/// Raw text of the data files a [`RuleStore`] is built from.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSources<'a> {
    /// `Scripts.txt` format.
    pub scripts: &'a str,
    /// `(provenance, content)` pairs of rule tables, loaded in order.
    pub rule_tables: &'a [(&'a str, &'a str)],
    /// `<hanzi> <accented pinyin>` lines.
    pub pinyin: &'a str,
    /// `NumProps.jsonl` format.
    pub num_props: &'a str,
}

impl RuleSources<'static> {
    /// The data set compiled into the crate.
    pub fn embedded() -> Self {
        RuleSources {
            scripts: include_str!("../data/Scripts.txt"),
            rule_tables: &[("man", include_str!("../data/romanization-table.txt"))],
            pinyin: include_str!("../data/Chinese_to_Pinyin.txt"),
            num_props: include_str!("../data/NumProps.jsonl"),
        }
    }
}

static EMBEDDED_STORE: LazyLock<Result<Arc<RuleStore>, RuleLoadError>> =
    LazyLock::new(|| RuleStore::from_sources(&RuleSources::embedded()).map(Arc::new));

/// Immutable after construction; share it through `Arc`.
#[derive(Debug)]
pub struct RuleStore {
    sets: HashMap<RuleSetId, RuleSet>,
    scripts: ScriptTable,
    num_props: NumProps,
    next_ordinal: u32,
}

impl RuleStore {
    pub const DATA_VERSION: &'static str = "polyroman-data-2025.06";

    /// The embedded store, loaded once per process.
    pub fn embedded() -> Result<Arc<RuleStore>, RuleLoadError> {
        EMBEDDED_STORE.clone()
    }

    pub fn from_sources(sources: &RuleSources<'_>) -> Result<Self, RuleLoadError> {
        let mut store = RuleStore {
            sets: HashMap::new(),
            scripts: ScriptTable::load(sources.scripts, "Scripts.txt")?,
            num_props: NumProps::load(sources.num_props, "NumProps.jsonl")?,
            next_ordinal: 0,
        };
        store.sets.insert(RuleSetId::Generic, RuleSet::new(RuleSetId::Generic));

        for (provenance, content) in sources.rule_tables {
            store.load_rom_table(content, provenance)?;
        }
        store.load_chinese_pinyin_file(sources.pinyin)?;

        debug!(
            rules = store.next_ordinal,
            rule_sets = store.sets.len(),
            scripts = store.scripts.len(),
            digit_blocks = store.num_props.n_digit_blocks(),
            numerals = store.num_props.n_numerals(),
            "rule store loaded"
        );
        Ok(store)
    }

    fn load_rom_table(&mut self, content: &str, provenance: &str) -> Result<(), RuleLoadError> {
        for (idx, line) in content.lines().enumerate() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let rule = RomRule::from_line(line, provenance, idx + 1)?;
            self.add_rom_rule(rule);
        }
        Ok(())
    }

    /// Pinyin readings are stored without tone marks, as plain ASCII.
    fn load_chinese_pinyin_file(&mut self, content: &str) -> Result<(), RuleLoadError> {
        for (idx, line) in content.lines().enumerate() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let Some((chinese, pinyin_with_accent)) = line.trim().split_once(char::is_whitespace)
            else {
                return Err(RuleLoadError::new(
                    "Chinese_to_Pinyin.txt",
                    idx + 1,
                    format!("expected '<hanzi> <pinyin>', got '{line}'"),
                ));
            };

            let rom: String = pinyin_with_accent
                .trim()
                .nfd()
                .filter(|c| c.general_category_group() != GeneralCategoryGroup::Mark)
                .collect::<String>()
                .replace('ü', "u");

            self.add_rom_rule(RomRule::new_simple(chinese.to_string(), &rom));
        }
        Ok(())
    }

    /// Places a rule into the language sets it names, else into the set of its
    /// source script, else into the generic set.
    fn add_rom_rule(&mut self, mut rule: RomRule) {
        rule.ordinal = self.next_ordinal;
        self.next_ordinal += 1;

        if !rule.lcodes.is_empty() {
            for lcode in rule.lcodes.clone() {
                let id = RuleSetId::Language(lcode);
                self.sets
                    .entry(id.clone())
                    .or_insert_with(|| RuleSet::new(id))
                    .add_rule(rule.clone());
            }
            return;
        }

        let id = rule
            .s
            .chars()
            .next()
            .and_then(|c| self.scripts.script_of(c))
            .map_or(RuleSetId::Generic, |script| RuleSetId::Script(script.script_name.clone()));
        self.sets.entry(id.clone()).or_insert_with(|| RuleSet::new(id)).add_rule(rule);
    }

    pub fn rule_set(&self, id: &RuleSetId) -> Option<&RuleSet> {
        self.sets.get(id)
    }

    pub fn rule_sets(&self) -> impl Iterator<Item = &RuleSet> {
        self.sets.values()
    }

    pub fn has_language(&self, lcode: &str) -> bool {
        self.sets.contains_key(&RuleSetId::Language(lcode.to_string()))
    }

    /// A language is known when it has its own rule set or a script lists it.
    pub fn knows_language(&self, lcode: &str) -> bool {
        self.has_language(lcode) || self.scripts.knows_language(lcode)
    }

    pub fn scripts(&self) -> &ScriptTable {
        &self.scripts
    }

    pub fn num_props(&self) -> &NumProps {
        &self.num_props
    }

    pub fn n_rules(&self) -> usize {
        self.next_ordinal as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPTS: &str = "\
::script-name Hiragana ::range 3041-309F ::language jpn
::script-name Han ::range 4E00-9FFF ::language zho,jpn
";

    fn store(rules: &str, pinyin: &str) -> Result<RuleStore, RuleLoadError> {
        RuleStore::from_sources(&RuleSources {
            scripts: SCRIPTS,
            rule_tables: &[("t", rules)],
            pinyin,
            num_props: "",
        })
    }

    #[test]
    fn places_rules_by_lcode_script_and_generic() {
        let store = store(
            "::s か ::t ka\n::s ん ::t n' ::lcode jpn,ain\n::s ! ::t !\n",
            "",
        )
        .unwrap();
        let hira = store.rule_set(&RuleSetId::Script("Hiragana".into())).unwrap();
        assert_eq!(hira.rules_for("か")[0].t, "ka");
        assert!(store.has_language("jpn"));
        assert!(store.has_language("ain"));
        assert_eq!(store.rule_set(&RuleSetId::Generic).unwrap().rules_for("!").len(), 1);
        assert_eq!(store.n_rules(), 3);
        assert!(store.knows_language("zho"));
        assert!(!store.knows_language("fra"));
    }

    #[test]
    fn ordinals_follow_load_order() {
        let store = store("::s か ::t ka\n::s か ::t ga ::cost 2\n", "").unwrap();
        let hira = store.rule_set(&RuleSetId::Script("Hiragana".into())).unwrap();
        let ordinals: Vec<u32> = hira.rules_for("か").iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, [0, 1]);
    }

    #[test]
    fn pinyin_is_de_accented() {
        let store = store("", "# comment\n你 nǐ\n女 nǚ\n").unwrap();
        let han = store.rule_set(&RuleSetId::Script("Han".into())).unwrap();
        assert_eq!(han.rules_for("你")[0].t, "ni");
        assert_eq!(han.rules_for("女")[0].t, "nu");
    }

    #[test]
    fn load_errors_name_source_and_line() {
        let err = store("::s か ::t ka\n\n::s き\n", "").unwrap_err();
        assert_eq!((err.source_name.as_str(), err.line), ("t", 3));

        let err = store("", "你\n").unwrap_err();
        assert_eq!(err.source_name, "Chinese_to_Pinyin.txt");
    }

    #[test]
    fn embedded_store_loads() {
        let store = RuleStore::embedded().unwrap();
        assert!(store.n_rules() > 100);
        assert!(store.has_language("jpn"));
        assert!(store.scripts().by_name("Devanagari").is_some_and(|s| s.is_abugida()));
        assert!(store.num_props().digit('٣').is_some());
    }
}
