//! Lattice builder: applies the resolved rule sets, the numeric recognizer and
//! the built-in candidate sources to every offset of a line.

use tracing::trace;
use unicode_normalization::UnicodeNormalization;
use unicode_properties::{GeneralCategory, GeneralCategoryGroup, UnicodeGeneralCategory};

use crate::config::RomanizerConfig;
use crate::edge::{Cost, Edge, EdgeKind};
use crate::lattice::Lattice;
use crate::numeric::NumericRecognizer;
use crate::path;
use crate::resolver::{Resolution, resolve};
use crate::rom_rule::SpanContext;
use crate::rule_set::NumericMarkers;
use crate::store::RuleStore;

static HANGUL_LEADS: &[&str] = &[
    "g", "gg", "n", "d", "dd", "r", "m", "b", "bb", "s", "ss", "-", "j", "jj", "c", "k", "t", "p", "h",
];
static HANGUL_VOWELS: &[&str] = &[
    "a", "ae", "ya", "yae", "eo", "e", "yeo", "ye", "o", "wa", "wai", "oe", "yo", "u", "weo", "we",
    "wi", "yu", "eu", "yi", "i",
];
static HANGUL_TAILS: &[&str] = &[
    "-", "g", "gg", "gs", "n", "nj", "nh", "d", "l", "lg", "lm", "lb", "ls", "lt", "lp", "lh", "m",
    "b", "bs", "s", "ss", "ng", "j", "c", "k", "t", "p", "h",
];

/// Languages whose abugida consonants lose the inherent vowel at the end of a word.
const FINAL_VOWEL_DROPPING_LCODES: &[&str] = &["asm", "ben", "guj", "kas", "pan"];

const SOKUON: [char; 2] = ['っ', 'ッ'];
const LONG_VOWEL_MARK: char = 'ー';

/// Decomposed fragments are romanized with their own lattice, one level deep.
const MAX_DECOMPOSITION_DEPTH: usize = 1;

fn is_letter_or_mark(c: char) -> bool {
    matches!(c.general_category_group(), GeneralCategoryGroup::Letter | GeneralCategoryGroup::Mark)
}

pub(crate) fn is_at_start_of_word(chars: &[char], position: usize) -> bool {
    position == 0 || !is_letter_or_mark(chars[position - 1])
}

pub(crate) fn is_at_end_of_word(chars: &[char], position: usize) -> bool {
    chars.get(position).is_none_or(|&c| !is_letter_or_mark(c))
}

fn is_kana(c: char) -> bool {
    ('\u{3041}'..='\u{30FA}').contains(&c)
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn is_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !is_vowel(c.to_ascii_lowercase())
}

/// Algorithmic romanization of a precomposed Hangul syllable (U+AC00..U+D7A3).
pub(crate) fn hangul_romanization(c: char) -> Option<String> {
    let cp = c as u32;
    if !(0xAC00..=0xD7A3).contains(&cp) {
        return None;
    }

    let code = cp - 0xAC00;
    let lead_index = (code / (28 * 21)) as usize;
    let vowel_index = ((code / 28) % 21) as usize;
    let tail_index = (code % 28) as usize;

    let rom = format!(
        "{}{}{}",
        HANGUL_LEADS[lead_index], HANGUL_VOWELS[vowel_index], HANGUL_TAILS[tail_index]
    );
    Some(rom.replace('-', ""))
}

pub(crate) struct LatticeBuilder<'a> {
    store: &'a RuleStore,
    resolution: Resolution<'a>,
    config: &'a RomanizerConfig,
    markers: NumericMarkers,
    depth: usize,
}

impl<'a> LatticeBuilder<'a> {
    pub(crate) fn new(
        store: &'a RuleStore,
        resolution: Resolution<'a>,
        config: &'a RomanizerConfig,
    ) -> Self {
        let markers = resolution.markers();
        Self { store, resolution, config, markers, depth: 0 }
    }

    pub(crate) fn build(&self, chars: &[char]) -> Lattice {
        let intrinsic = self.resolution.intrinsic_priority();
        let mut numeric_by_start: Vec<Vec<Edge>> = vec![Vec::new(); chars.len()];
        if self.config.numbers {
            let recognizer = NumericRecognizer::new(self.store.num_props(), &self.markers, intrinsic);
            for edge in recognizer.recognize(chars) {
                numeric_by_start[edge.start()].push(edge);
            }
        }

        let mut edges = Vec::new();
        for (i, numeric_edges) in numeric_by_start.into_iter().enumerate() {
            let n_rule_edges = self.add_rule_edges(chars, i, &mut edges);
            let c = chars[i];

            if let Some(rom) = hangul_romanization(c) {
                edges.push(self.intrinsic_edge(i, rom, EdgeKind::Syllable, Cost::SYLLABLE));
            } else if let Some(rom) = self.decomposition_rom(c) {
                edges.push(self.intrinsic_edge(i, rom, EdgeKind::Decomposition, Cost::DECOMPOSITION));
            }

            edges.extend(numeric_edges);
            if let Some((_, d)) = self.store.num_props().digit(c)
                && let Some(digit) = char::from_digit(d, 10)
            {
                edges.push(self.intrinsic_edge(i, digit.to_string(), EdgeKind::Digit, Cost::DIGIT));
            }

            if c.is_whitespace() {
                let txt = if c.general_category() == GeneralCategory::SpaceSeparator {
                    " ".to_string()
                } else {
                    c.to_string()
                };
                edges.push(self.intrinsic_edge(i, txt, EdgeKind::Whitespace, Cost::WHITESPACE));
            }

            if n_rule_edges == 0 {
                edges.push(self.intrinsic_edge(i, c.to_string(), EdgeKind::Fallback, Cost::FALLBACK));
            }
        }

        add_expansions(chars, &mut edges);

        let mut lattice = Lattice::new(chars.to_vec(), edges);
        lattice.repair_coverage(intrinsic);
        trace!(chars = lattice.len(), edges = lattice.edges().len(), depth = self.depth, "lattice built");
        lattice
    }

    /// Emits rule and alternate edges starting at `i`; returns the number of rules applied.
    fn add_rule_edges(&self, chars: &[char], i: usize, edges: &mut Vec<Edge>) -> usize {
        let mut n_applied = 0;
        for resolved in &self.resolution.sets {
            for (end, rules) in resolved.set.matches_at(chars, i) {
                let ctx = SpanContext {
                    prev_char: i.checked_sub(1).map(|p| chars[p]),
                    next_char: chars.get(end).copied(),
                    at_start_of_word: is_at_start_of_word(chars, i),
                    at_end_of_word: is_at_end_of_word(chars, end),
                };
                for rule in rules.iter().filter(|rule| rule.applies_in(&ctx)) {
                    edges.push(Edge::new_regular(
                        i,
                        end,
                        self.add_default_abugida_vowel(&rule.t, chars, end),
                        EdgeKind::Rule,
                        rule.cost,
                        resolved.priority,
                        rule.ordinal,
                    ));
                    for alt in &rule.t_alts {
                        edges.push(Edge::new_regular(
                            i,
                            end,
                            self.add_default_abugida_vowel(alt, chars, end),
                            EdgeKind::Alternate,
                            rule.cost.saturating_add(Cost::ALTERNATE_PENALTY),
                            resolved.priority,
                            rule.ordinal,
                        ));
                    }
                    n_applied += 1;
                }
            }
        }
        n_applied
    }

    /// Appends the inherent vowel to a consonant of an abugida script, unless a
    /// vowel sign or virama follows, or the word ends in a language that drops it.
    fn add_default_abugida_vowel(&self, rom: &str, chars: &[char], end: usize) -> String {
        let last = chars[end - 1];
        let Some(script) = self.store.scripts().script_of(last) else {
            return rom.to_string();
        };
        let Some(vowel) = script.abugida_default_vowel.as_deref() else {
            return rom.to_string();
        };
        if last.general_category_group() != GeneralCategoryGroup::Letter
            || !rom.chars().last().is_some_and(is_consonant)
        {
            return rom.to_string();
        }

        let followed_by_sign =
            chars.get(end).is_some_and(|&next| script.is_vowel_sign(next) || script.is_virama(next));
        let drops_final_vowel = match self.resolution.lcode {
            Some(lcode) if FINAL_VOWEL_DROPPING_LCODES.contains(&lcode) => true,
            Some("san") => false,
            _ => script.script_name == "Devanagari",
        };

        if followed_by_sign || (drops_final_vowel && is_at_end_of_word(chars, end)) {
            rom.to_string()
        } else {
            format!("{rom}{vowel}")
        }
    }

    /// Romanization of a character's compatibility decomposition with marks removed,
    /// e.g. `ά` to `a`, `ｶ` to `ka`, `ﬁ` to `fi`.
    fn decomposition_rom(&self, c: char) -> Option<String> {
        if self.depth >= MAX_DECOMPOSITION_DEPTH {
            return None;
        }
        let decomposed: Vec<char> =
            c.to_string().nfkd().filter(|d| d.general_category_group() != GeneralCategoryGroup::Mark).collect();
        if decomposed.is_empty() || decomposed == [c] {
            return None;
        }

        let resolution = resolve(self.store, self.resolution.lcode, &decomposed, false).ok()?;
        let nested = LatticeBuilder {
            store: self.store,
            markers: resolution.markers(),
            resolution,
            config: self.config,
            depth: self.depth + 1,
        };
        let lattice = nested.build(&decomposed);
        let selection = path::select(&lattice).ok()?;
        Some(selection.text(&lattice))
    }

    fn intrinsic_edge(&self, i: usize, txt: String, kind: EdgeKind, cost: Cost) -> Edge {
        Edge::new_regular(i, i + 1, txt, kind, cost, self.resolution.intrinsic_priority(), u32::MAX)
    }
}

/// Kana context expansions: a sokuon doubles the next consonant (`っか` to `kka`,
/// `っち` to `tchi`) and a long-vowel mark repeats the preceding vowel (`コー` to `koo`).
fn add_expansions(chars: &[char], edges: &mut Vec<Edge>) {
    let expansion = |edge: &Edge, start: usize, end: usize, txt: String| {
        Edge::new_regular(start, end, txt, EdgeKind::Expansion, edge.cost(), edge.priority(), edge.ordinal())
    };
    let is_kana_rom = |edge: &Edge| {
        matches!(edge.kind(), Some(EdgeKind::Rule | EdgeKind::Alternate))
            && is_kana(chars[edge.start()])
            && !SOKUON.contains(&chars[edge.start()])
    };

    let sokuon_edges: Vec<Edge> = edges
        .iter()
        .filter(|e| is_kana_rom(e) && e.start() > 0 && SOKUON.contains(&chars[e.start() - 1]))
        .filter_map(|e| {
            let first = e.txt().chars().next().filter(|&c| is_consonant(c))?;
            let doubled = if e.txt().starts_with("ch") { 't' } else { first };
            Some(expansion(e, e.start() - 1, e.end(), format!("{doubled}{}", e.txt())))
        })
        .collect();
    edges.extend(sokuon_edges);

    let long_vowel_edges: Vec<Edge> = edges
        .iter()
        .filter(|e| {
            (is_kana_rom(e) || e.kind() == Some(EdgeKind::Expansion))
                && chars.get(e.end()) == Some(&LONG_VOWEL_MARK)
        })
        .filter_map(|e| {
            let vowel = e.txt().chars().last().filter(|&c| is_vowel(c))?;
            Some(expansion(e, e.start(), e.end() + 1, format!("{}{vowel}", e.txt())))
        })
        .collect();
    edges.extend(long_vowel_edges);
}
