//! Chooses the rule sets that apply to one line, most specific first.

use tracing::debug;

use crate::error::RomanizationError;
use crate::rom_rule::is_iso639_3;
use crate::rule_set::{NumericMarkers, RuleSet, RuleSetId};
use crate::store::RuleStore;

#[derive(Debug, Clone, Copy)]
pub struct ResolvedSet<'a> {
    pub set: &'a RuleSet,
    /// 0 is the most specific.
    pub priority: u32,
}

/// The rule sets for one line plus the language code that survived validation.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub sets: Vec<ResolvedSet<'a>>,
    pub lcode: Option<&'a str>,
}

impl Resolution<'_> {
    /// Priority given to edges that no rule set produced. Ranks below every set.
    pub fn intrinsic_priority(&self) -> u32 {
        self.sets.len() as u32
    }

    pub fn markers(&self) -> NumericMarkers {
        NumericMarkers::merged(self.sets.iter().map(|r| r.set.markers()))
    }
}

/// Resolves rule sets for `chars`: the language set for `lcode` if any, then
/// the sets of the detected scripts in first-occurrence order, then generic.
///
/// With `strict`, an `lcode` that is malformed or unknown to the store is an
/// error; otherwise it is ignored and detection alone decides.
pub fn resolve<'a>(
    store: &'a RuleStore,
    lcode: Option<&'a str>,
    chars: &[char],
    strict: bool,
) -> Result<Resolution<'a>, RomanizationError> {
    let valid_lcode = validate_lcode(store, lcode, strict)?;
    let mut sets = Vec::new();
    let mut push = |set: &'a RuleSet| {
        let priority = sets.len() as u32;
        sets.push(ResolvedSet { set, priority });
    };

    if let Some(lc) = valid_lcode
        && let Some(set) = store.rule_set(&RuleSetId::Language(lc.to_string()))
    {
        push(set);
    }

    for script in store.scripts().detect_scripts(chars) {
        if let Some(set) = store.rule_set(&RuleSetId::Script(script.script_name.clone())) {
            push(set);
        }
    }

    if let Some(set) = store.rule_set(&RuleSetId::Generic) {
        push(set);
    }

    Ok(Resolution { sets, lcode: valid_lcode })
}

/// Returns the language code to use, or `None` when there is none or it is ignored.
/// An empty code counts as absent.
pub fn validate_lcode<'a>(
    store: &RuleStore,
    lcode: Option<&'a str>,
    strict: bool,
) -> Result<Option<&'a str>, RomanizationError> {
    match lcode.filter(|lc| !lc.is_empty()) {
        Some(lc) if is_iso639_3(lc) && store.knows_language(lc) => Ok(Some(lc)),
        Some(lc) if strict => Err(RomanizationError::UnknownLanguageCode(lc.to_string())),
        Some(lc) => {
            debug!(lcode = lc, "unknown language code, falling back to script detection");
            Ok(None)
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RuleSources;

    fn store() -> RuleStore {
        RuleStore::from_sources(&RuleSources {
            scripts: "::script-name Latin ::range 0041-005A,0061-007A ::language eng\n\
                      ::script-name Greek ::range 0370-03FF ::language ell",
            rule_tables: &[(
                "t",
                "::s a ::t a\n::s α ::t a\n::s ! ::t !\n::s ε ::t e ::lcode grc\n",
            )],
            pinyin: "",
            num_props: "",
        })
        .unwrap()
    }

    fn ids(resolution: &Resolution<'_>) -> Vec<String> {
        resolution.sets.iter().map(|r| r.set.id().to_string()).collect()
    }

    #[test]
    fn order_is_language_scripts_generic() {
        let store = store();
        let chars: Vec<char> = "αa".chars().collect();
        let resolution = resolve(&store, Some("grc"), &chars, false).unwrap();
        assert_eq!(ids(&resolution), ["lang:grc", "script:Greek", "script:Latin", "generic"]);
        let priorities: Vec<u32> = resolution.sets.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, [0, 1, 2, 3]);
        assert_eq!(resolution.intrinsic_priority(), 4);
    }

    #[test]
    fn language_without_rule_set_uses_detection() {
        let store = store();
        let chars: Vec<char> = "a".chars().collect();
        let resolution = resolve(&store, Some("eng"), &chars, true).unwrap();
        assert_eq!(ids(&resolution), ["script:Latin", "generic"]);
        assert_eq!(resolution.lcode, Some("eng"));
    }

    #[test]
    fn unknown_codes_are_lenient_by_default() {
        let store = store();
        let chars: Vec<char> = "a".chars().collect();
        let resolution = resolve(&store, Some("xyz"), &chars, false).unwrap();
        assert_eq!(ids(&resolution), ["script:Latin", "generic"]);
        assert_eq!(resolution.lcode, None);
        assert!(resolve(&store, Some(""), &chars, true).is_ok());
    }

    #[test]
    fn strict_mode_rejects_unknown_codes() {
        let store = store();
        let chars: Vec<char> = "a".chars().collect();
        for bad in ["xyz", "GRC", "english"] {
            let err = resolve(&store, Some(bad), &chars, true).unwrap_err();
            assert!(matches!(err, RomanizationError::UnknownLanguageCode(code) if code == bad));
        }
    }
}
