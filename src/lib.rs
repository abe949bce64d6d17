//! Main library for the polyroman project.
//!
//! This library provides the [`Romanizer`] struct, the entry point for
//! converting text in any supported script into Latin letters. Each line is
//! turned into a lattice of candidate romanizations (rule matches, numbers,
//! syllables, decompositions and fallbacks) and the cheapest path through the
//! lattice is the result.

use std::borrow::Cow;
use std::fmt;
use std::io::{BufRead, Write};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde_json::{Value, json};
use tracing::{trace, warn};

pub use crate::config::RomanizerConfig;
pub use crate::edge::{Cost, Edge, EdgeData, EdgeKind, NumData, NumericForm};
pub use crate::error::{RomanizationError, RuleLoadError};
pub use crate::lattice::Lattice;
pub use crate::numeric::{NumProps, Numeral};
pub use crate::path::{PathCost, Selection};
pub use crate::projection::{AltEdge, ResolvedOutput, RomanizationResult};
pub use crate::rule_set::{NumericMarkers, RuleSet, RuleSetId};
pub use crate::script::{Script, ScriptTable};
pub use crate::store::{RuleSources, RuleStore};

use crate::builder::LatticeBuilder;
use crate::resolver::{resolve, validate_lcode};
use crate::utils::decode_unicode_escapes;

mod builder;
mod config;
mod edge;
mod error;
mod lattice;
mod numeric;
mod path;
mod projection;
mod resolver;
mod rom_rule;
mod rule_set;
mod script;
mod store;
mod utils;

const LCODE_DIRECTIVE: &str = "::lcode ";
const MAX_ENCODING_WARNINGS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RomFormat {
    #[default]
    Str,
    Edges,
    Alts,
    Lattice,
}

impl RomFormat {
    pub fn name(self) -> &'static str {
        match self {
            RomFormat::Str => "str",
            RomFormat::Edges => "edges",
            RomFormat::Alts => "alts",
            RomFormat::Lattice => "lattice",
        }
    }
}

impl FromStr for RomFormat {
    type Err = RomanizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" => Ok(RomFormat::Str),
            "edges" => Ok(RomFormat::Edges),
            "alts" => Ok(RomFormat::Alts),
            "lattice" => Ok(RomFormat::Lattice),
            other => Err(RomanizationError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for RomFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) use rom_format::RomFormatType;

/// Output formats as types, so the projection is chosen at compile time.
pub mod rom_format {
    use crate::projection::{AltEdge, ResolvedOutput, RomanizationResult};
    use crate::{Edge, RomFormat};

    pub struct Str;
    pub struct Edges;
    pub struct Alts;
    pub struct Lattice;

    pub trait RomFormatType {
        const FORMAT: RomFormat;
        type Output: Clone;

        fn project(output: &ResolvedOutput) -> Self::Output;
        fn into_result(value: Self::Output) -> RomanizationResult;
    }

    impl RomFormatType for Str {
        const FORMAT: RomFormat = RomFormat::Str;
        type Output = String;

        fn project(output: &ResolvedOutput) -> String {
            output.string()
        }

        fn into_result(value: String) -> RomanizationResult {
            RomanizationResult::Str(value)
        }
    }

    impl RomFormatType for Edges {
        const FORMAT: RomFormat = RomFormat::Edges;
        type Output = Vec<Edge>;

        fn project(output: &ResolvedOutput) -> Vec<Edge> {
            output.edges().into_iter().cloned().collect()
        }

        fn into_result(value: Vec<Edge>) -> RomanizationResult {
            RomanizationResult::Edges(value)
        }
    }

    impl RomFormatType for Alts {
        const FORMAT: RomFormat = RomFormat::Alts;
        type Output = Vec<AltEdge>;

        fn project(output: &ResolvedOutput) -> Vec<AltEdge> {
            output.alts()
        }

        fn into_result(value: Vec<AltEdge>) -> RomanizationResult {
            RomanizationResult::Alts(value)
        }
    }

    impl RomFormatType for Lattice {
        const FORMAT: RomFormat = RomFormat::Lattice;
        type Output = Vec<Edge>;

        fn project(output: &ResolvedOutput) -> Vec<Edge> {
            output.lattice().to_vec()
        }

        fn into_result(value: Vec<Edge>) -> RomanizationResult {
            RomanizationResult::Edges(value)
        }
    }

    pub trait IsStrFormat: RomFormatType<Output = String> {}
    pub trait IsEdgeFormat: RomFormatType<Output = Vec<Edge>> {}

    impl IsStrFormat for Str {}
    impl IsEdgeFormat for Edges {}
    impl IsEdgeFormat for Lattice {}
}

pub struct RomanizationOutput<F: RomFormatType> {
    value: F::Output,
    _marker: PhantomData<F>,
}

impl<F: RomFormatType> RomanizationOutput<F> {
    pub fn format(&self) -> RomFormat {
        F::FORMAT
    }

    pub fn value(&self) -> &F::Output {
        &self.value
    }

    pub fn into_inner(self) -> F::Output {
        self.value
    }

    pub fn into_result(self) -> RomanizationResult {
        F::into_result(self.value)
    }

    /// Text for `Str`, pretty-printed JSON otherwise.
    pub fn render(&self) -> Result<String, RomanizationError> {
        F::into_result(self.value.clone()).to_string()
    }
}

impl<F: rom_format::IsStrFormat> RomanizationOutput<F> {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<F: rom_format::IsEdgeFormat> RomanizationOutput<F> {
    pub fn as_edges(&self) -> &[Edge] {
        &self.value
    }
}

impl RomanizationOutput<rom_format::Alts> {
    pub fn as_alts(&self) -> &[AltEdge] {
        &self.value
    }
}

impl<'a, F: rom_format::IsEdgeFormat> IntoIterator for &'a RomanizationOutput<F> {
    type Item = &'a Edge;
    type IntoIter = std::slice::Iter<'a, Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.value.iter()
    }
}

impl<F: rom_format::IsEdgeFormat> IntoIterator for RomanizationOutput<F> {
    type Item = Edge;
    type IntoIter = std::vec::IntoIter<Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.value.into_iter()
    }
}

impl<F: RomFormatType> fmt::Display for RomanizationOutput<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(s) => write!(f, "{s}"),
            Err(e) => write!(f, "Error: {e:?}"),
        }
    }
}

/// Options for [`Romanizer::romanize_file`] and [`Romanizer::romanize_file_parallel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamOptions<'a> {
    /// Language code for lines without a `::lcode` directive.
    pub lcode: Option<&'a str>,
    pub rom_format: RomFormat,
    /// Stop after this many input lines.
    pub max_lines: Option<usize>,
    /// Decode `\uXXXX`-style escapes before romanizing.
    pub decode_unicode: bool,
}

/// The main struct for romanization.
///
/// It shares an immutable [`RuleStore`] and carries a [`RomanizerConfig`].
/// Cloning is cheap, and one instance can be used from many threads.
#[derive(Debug, Clone)]
pub struct Romanizer {
    store: Arc<RuleStore>,
    config: RomanizerConfig,
}

impl Romanizer {
    /// Creates a romanizer over the embedded rule data, loaded once per process.
    pub fn new() -> Result<Self, RomanizationError> {
        Ok(Self::with_store(RuleStore::embedded()?))
    }

    pub fn with_store(store: Arc<RuleStore>) -> Self {
        Self { store, config: RomanizerConfig::default() }
    }

    pub fn with_config(mut self, config: RomanizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RomanizerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Romanizes one line and returns the lattice with its selected path.
    ///
    /// # Arguments
    ///
    /// lcode: [ISO 639-3 language code](https://iso639-3.sil.org/code_tables/639/data)
    /// (e.g., jpn, hin, ara, rus, zho)
    ///
    /// # Errors
    ///
    /// `UnknownLanguageCode` when the romanizer is configured with strict
    /// language codes and `lcode` is malformed or unknown.
    ///
    /// # Example
    /// ```
    /// # use polyroman::Romanizer;
    /// # let romanizer = Romanizer::new().unwrap();
    /// let output = romanizer.romanize("안녕", None).unwrap();
    ///
    /// assert_eq!(output.string(), "annyeong");
    /// assert_eq!(output.edges().len(), 2);
    /// ```
    pub fn romanize(&self, text: &str, lcode: Option<&str>) -> Result<ResolvedOutput, RomanizationError> {
        let chars: Vec<char> = text.chars().collect();
        let resolution = resolve(&self.store, lcode, &chars, self.config.strict_lcodes)?;
        let lattice = LatticeBuilder::new(&self.store, resolution, &self.config).build(&chars);
        let selection = path::select(&lattice)?;
        trace!(
            len = lattice.len(),
            edges = lattice.edges().len(),
            path = selection.path().len(),
            cost = selection.total().cost,
            "romanized line"
        );
        Ok(ResolvedOutput::new(lattice, selection, self.config.max_alternates))
    }

    /// Romanizes a given string into the format chosen by `F`.
    ///
    /// # Example
    /// ```
    /// # use polyroman::{Romanizer, rom_format};
    /// # let romanizer = Romanizer::new().unwrap();
    /// let result = romanizer.romanize_string::<rom_format::Str>("Привет", None).unwrap();
    ///
    /// println!("{result}");
    /// ```
    pub fn romanize_string<F: RomFormatType>(
        &self,
        s: &str,
        lcode: Option<&str>,
    ) -> Result<RomanizationOutput<F>, RomanizationError> {
        let output = self.romanize(s, lcode)?;
        Ok(RomanizationOutput { value: F::project(&output), _marker: PhantomData })
    }

    /// Decodes Unicode escape sequences before performing romanization.
    ///
    /// # Example
    /// ```
    /// # use polyroman::{Romanizer, rom_format};
    /// # let romanizer = Romanizer::new().unwrap();
    /// let result = romanizer
    ///     .romanize_escaped::<rom_format::Str>(r"\u03B4\u03B1", None)
    ///     .unwrap();
    ///
    /// assert_eq!(result.as_str(), "da");
    /// ```
    pub fn romanize_escaped<F: RomFormatType>(
        &self,
        s: &str,
        lcode: Option<&str>,
    ) -> Result<RomanizationOutput<F>, RomanizationError> {
        let s = decode_unicode_escapes(s);
        self.romanize_string::<F>(&s, lcode)
    }

    /// Decodes Unicode escape sequences and then romanizes the string using the specified `RomFormat`.
    pub fn romanize_escaped_with_format(
        &self,
        s: &str,
        lcode: Option<&str>,
        rom_format: Option<RomFormat>,
    ) -> Result<RomanizationResult, RomanizationError> {
        let s = decode_unicode_escapes(s);
        self.romanize_with_format(&s, lcode, rom_format)
    }

    /// Romanizes a given string using `RomFormat`.
    ///
    /// # Example
    /// ```
    /// # use polyroman::{Romanizer, RomFormat};
    /// # let romanizer = Romanizer::new().unwrap();
    /// let result = romanizer
    ///     .romanize_with_format(
    ///         "Γειά",
    ///         None,
    ///         None, // `None` defaults to `RomFormat::Str`.
    ///     )
    ///     .unwrap();
    ///
    /// assert_eq!(result.to_string().unwrap(), "Geia");
    /// ```
    pub fn romanize_with_format(
        &self,
        s: &str,
        lcode: Option<&str>,
        rom_format: Option<RomFormat>,
    ) -> Result<RomanizationResult, RomanizationError> {
        let output = self.romanize(s, lcode)?;
        Ok(output.project(rom_format.unwrap_or_default()))
    }

    /// Like [`romanize_with_format`](Self::romanize_with_format), with the format
    /// given by name: `str`, `edges`, `alts` or `lattice`.
    pub fn romanize_with_format_name(
        &self,
        s: &str,
        lcode: Option<&str>,
        format_name: &str,
    ) -> Result<RomanizationResult, RomanizationError> {
        let rom_format = format_name.parse()?;
        self.romanize_with_format(s, lcode, Some(rom_format))
    }

    /// Romanizes multi-line text. Each line is romanized on its own and the
    /// original line breaks (`\n`, `\r\n`, `\r`) are kept as they are.
    ///
    /// # Example
    /// ```
    /// # use polyroman::Romanizer;
    /// # let romanizer = Romanizer::new().unwrap();
    /// let text = romanizer.romanize_text("Мир\r\n\nмир", None).unwrap();
    ///
    /// assert_eq!(text, "Mir\r\n\nmir");
    /// ```
    pub fn romanize_text(&self, text: &str, lcode: Option<&str>) -> Result<String, RomanizationError> {
        validate_lcode(&self.store, lcode, self.config.strict_lcodes)?;

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find(['\n', '\r']) {
            out.push_str(&self.romanize(&rest[..pos], lcode)?.string());
            let break_len = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
            out.push_str(&rest[pos..pos + break_len]);
            rest = &rest[pos + break_len..];
        }
        out.push_str(&self.romanize(rest, lcode)?.string());
        Ok(out)
    }

    /// Romanizes independent lines on the rayon thread pool. The output order
    /// matches the input order.
    pub fn romanize_lines_parallel<S: AsRef<str> + Sync>(
        &self,
        lines: &[S],
        lcode: Option<&str>,
    ) -> Result<Vec<String>, RomanizationError> {
        validate_lcode(&self.store, lcode, self.config.strict_lcodes)?;
        lines
            .par_iter()
            .map(|line| self.romanize(line.as_ref(), lcode).map(|output| output.string()))
            .collect()
    }

    /// Romanizes one stream line, honouring a leading `::lcode xxx` directive.
    /// JSON formats are written compactly, one line per input line.
    fn romanize_stream_line(&self, line: &str, options: &StreamOptions<'_>) -> Result<String, RomanizationError> {
        let romanize = |text: &str, lcode: Option<&str>| {
            if options.decode_unicode {
                self.romanize_escaped_with_format(text, lcode, Some(options.rom_format))
            } else {
                self.romanize_with_format(text, lcode, Some(options.rom_format))
            }
        };

        let Some(rest_of_line) = line.strip_prefix(LCODE_DIRECTIVE) else {
            return romanize(line, options.lcode)?.to_line();
        };

        let (lcode, text) = rest_of_line.split_once(char::is_whitespace).unwrap_or((rest_of_line, ""));
        let result = romanize(text, Some(lcode))?;

        match result {
            RomanizationResult::Str(s) => Ok(format!("{LCODE_DIRECTIVE}{lcode} {s}")),
            other => {
                let mut items = vec![json!([0, 0, "", format!("lcode: {lcode}")])];
                if let Value::Array(edges) = serde_json::to_value(&other)? {
                    items.extend(edges);
                }
                Ok(serde_json::to_string(&Value::Array(items))?)
            }
        }
    }

    /// Romanizes a stream of text line by line and writes the output to another stream.
    ///
    /// This method processes large amounts of text by reading from a buffered
    /// reader and writing to a writer without loading the entire content into memory.
    /// Lines with bytes that are not valid UTF-8 are romanized with the bad bytes
    /// replaced and reported with `tracing::warn!`.
    ///
    /// # Errors
    ///
    /// Fails if any I/O operation on `reader` or `writer` fails, or if a line
    /// carries an unknown language code while strict codes are configured.
    pub fn romanize_file<R: BufRead, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
        options: StreamOptions<'_>,
    ) -> Result<(), RomanizationError> {
        let mut line_number = 0;
        let mut non_utf8_lines = 0;
        let mut buffer = vec![];

        loop {
            if options.max_lines.is_some_and(|max| line_number >= max) {
                break;
            }
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            line_number += 1;

            let line = String::from_utf8_lossy(&buffer);
            if let Cow::Owned(_) = line {
                non_utf8_lines += 1;
                if non_utf8_lines <= MAX_ENCODING_WARNINGS {
                    warn!(line = line_number, "non-UTF-8 bytes were replaced");
                } else if non_utf8_lines == MAX_ENCODING_WARNINGS + 1 {
                    warn!("too many encoding errors, no further lines reported");
                }
            }

            let line: &str = &line;
            let line = line.strip_suffix('\n').unwrap_or(line);
            let line = line.strip_suffix('\r').unwrap_or(line);
            writeln!(writer, "{}", self.romanize_stream_line(line, &options)?)?;
        }

        if non_utf8_lines > 0 {
            warn!(lines = non_utf8_lines, "input contained lines with non-UTF-8 bytes");
        }

        writer.flush()?;
        Ok(())
    }

    /// Romanizes a stream of text line by line in parallel.
    ///
    /// This version reads the entire input into memory to process lines concurrently.
    /// It is faster than [`romanize_file`](Self::romanize_file) on many cores but
    /// needs memory for the whole input, and input that is not valid UTF-8 is
    /// an I/O error. The output order is preserved.
    pub fn romanize_file_parallel<R: BufRead, W: Write>(
        &self,
        reader: R,
        mut writer: W,
        options: StreamOptions<'_>,
    ) -> Result<(), RomanizationError> {
        let mut lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
        if let Some(max) = options.max_lines {
            lines.truncate(max);
        }

        let results: Vec<String> = lines
            .par_iter()
            .map(|line| self.romanize_stream_line(line, &options))
            .collect::<Result<_, _>>()?;

        for output in results {
            writeln!(writer, "{output}")?;
        }

        writer.flush()?;
        Ok(())
    }
}
