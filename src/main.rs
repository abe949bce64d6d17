//! Command-line interface for polyroman.

use clap::{Parser, ValueEnum};
use polyroman::{PathCost, ResolvedOutput, RomFormat, RomanizationError, Romanizer, RomanizerConfig, StreamOptions};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, BufReader, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::{fs, time};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthStr;

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum CliRomFormat {
    #[default]
    Str,
    Edges,
    Alts,
    Lattice,
}

impl From<CliRomFormat> for RomFormat {
    fn from(cli_format: CliRomFormat) -> Self {
        match cli_format {
            CliRomFormat::Str => RomFormat::Str,
            CliRomFormat::Edges => RomFormat::Edges,
            CliRomFormat::Alts => RomFormat::Alts,
            CliRomFormat::Lattice => RomFormat::Lattice,
        }
    }
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Failed to open input file '{path}': {source}")]
    InputFileOpen { path: PathBuf, source: io::Error },

    #[error("Failed to create output file '{path}': {source}")]
    OutputFileCreate { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("REPL error: {0}")]
    Repl(#[from] ReadlineError),

    #[error("Romanization failed: {0}")]
    Romanization(#[from] RomanizationError),
}

impl CliError {
    fn is_broken_pipe(&self) -> bool {
        match self {
            CliError::Io(e) | CliError::Romanization(RomanizationError::Io(e)) => {
                e.kind() == io::ErrorKind::BrokenPipe
            }
            _ => false,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Direct text input to be romanized.
    #[arg(value_name = "DIRECT_INPUT")]
    direct_input: Vec<String>,

    /// Input file path (default: stdin).
    #[arg(short, long, value_name = "FILE")]
    input_filename: Option<PathBuf>,

    /// Output file path (default: stdout).
    #[arg(short, long, value_name = "FILE")]
    output_filename: Option<PathBuf>,

    /// ISO 639-3 language code (e.g., 'jpn').
    #[arg(short = 'l', long)]
    lcode: Option<String>,

    /// Output format of romanization. 'edges' provides offsets.
    #[arg(short = 'f', long, value_enum, default_value_t = CliRomFormat::default())]
    rom_format: CliRomFormat,

    /// Limit romanization to the first n lines of a file.
    #[arg(long)]
    max_lines: Option<usize>,

    /// Decodes Unicode escape notation, e.g., \\u03B4 to δ.
    #[arg(short = 'd', long, action = clap::ArgAction::SetTrue)]
    decode_unicode: bool,

    /// Enable parallel file processing.
    #[arg(short = 'p', long = "use-parallel", action = clap::ArgAction::SetTrue)]
    use_parallel: bool,

    /// Run and display a few samples.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    sample: bool,

    /// Suppress the sample listing and the trailing notes.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    silent: bool,

    /// Reject unknown or malformed language codes instead of ignoring them.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    strict: bool,

    /// Maximum number of alternates per edge in the 'alts' format.
    #[arg(long, value_name = "N")]
    max_alternates: Option<usize>,

    /// Do not recognize numbers.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_numbers: bool,

    /// JSON file with romanizer options; command-line flags take precedence.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug information to stderr.
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,
}

impl Cli {
    fn romanizer_config(&self) -> Result<RomanizerConfig, RomanizationError> {
        let mut config = match &self.config {
            Some(path) => RomanizerConfig::from_json_file(path)?,
            None => RomanizerConfig::default(),
        };
        if self.strict {
            config = config.strict_lcodes(true);
        }
        if self.max_alternates.is_some() {
            config = config.max_alternates(self.max_alternates);
        }
        if self.no_numbers {
            config = config.numbers(false);
        }
        Ok(config)
    }

    fn stream_options(&self) -> StreamOptions<'_> {
        StreamOptions {
            lcode: self.lcode.as_deref(),
            rom_format: self.rom_format.into(),
            max_lines: self.max_lines,
            decode_unicode: self.decode_unicode,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(&cli) {
        if err.is_broken_pipe() {
            return;
        }

        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let romanizer = Romanizer::new()?.with_config(cli.romanizer_config()?);

    if cli.direct_input.is_empty()
        && cli.input_filename.is_none()
        && !cli.sample
        && io::stdin().is_terminal()
    {
        run_repl(&romanizer, cli)?;
        return Ok(());
    }

    if cli.sample
        && cli.direct_input.is_empty()
        && cli.input_filename.is_none()
        && cli.output_filename.is_none()
        && !cli.silent
    {
        show_samples(&romanizer)?;
        return Ok(());
    }

    let mut writer = open_output(cli.output_filename.as_deref())?;

    if !cli.direct_input.is_empty() {
        process_direct_input(&romanizer, cli, &mut writer)?;
    }

    if cli.input_filename.is_some() || cli.direct_input.is_empty() {
        process_stream(&romanizer, cli, &mut writer)?;
    }

    writer.flush()?;

    if cli.sample && !cli.silent {
        eprintln!("Note: The --sample option was ignored because input was provided via other flags.");
    }

    Ok(())
}

fn process_direct_input(romanizer: &Romanizer, cli: &Cli, writer: &mut dyn Write) -> Result<(), CliError> {
    let rom_format = Some(cli.rom_format.into());
    let lcode = cli.lcode.as_deref();
    for s in &cli.direct_input {
        let result = if !cli.decode_unicode {
            romanizer.romanize_with_format(s, lcode, rom_format)?
        } else {
            romanizer.romanize_escaped_with_format(s, lcode, rom_format)?
        };
        writeln!(writer, "{}", result.to_string()?)?;
    }
    Ok(())
}

fn process_stream(romanizer: &Romanizer, cli: &Cli, writer: &mut dyn Write) -> Result<(), CliError> {
    let reader = open_input(cli.input_filename.as_deref())?;
    let options = cli.stream_options();

    if cli.use_parallel {
        romanizer.romanize_file_parallel(reader, writer, options)?;
    } else {
        romanizer.romanize_file(reader, writer, options)?;
    }
    Ok(())
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>, CliError> {
    let Some(path) = path else {
        return Ok(Box::new(io::stdin().lock()));
    };
    let file = fs::File::open(path)
        .map_err(|source| CliError::InputFileOpen { path: path.to_path_buf(), source })?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    };
    let file = fs::File::create(path)
        .map_err(|source| CliError::OutputFileCreate { path: path.to_path_buf(), source })?;
    Ok(Box::new(BufWriter::new(file)))
}

const REPL_HELP: &str = "\
:lcode xxx     romanize as language xxx (':lcode' alone clears it)
:format name   show str, edges, alts or lattice
:help          this text
:exit, :quit   leave";

/// Interactive state that REPL commands can change between lines.
struct ReplSession {
    lcode: Option<String>,
    format: RomFormat,
}

enum ReplCommand<'a> {
    Exit,
    Help,
    SetLcode(Option<&'a str>),
    SetFormat(&'a str),
    Romanize(&'a str),
}

impl<'a> ReplCommand<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (command, arg) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let arg = arg.trim();
        Some(match command {
            ":exit" | ":quit" => ReplCommand::Exit,
            ":help" => ReplCommand::Help,
            ":lcode" => ReplCommand::SetLcode((!arg.is_empty()).then_some(arg)),
            ":format" => ReplCommand::SetFormat(arg),
            _ => ReplCommand::Romanize(line),
        })
    }
}

impl ReplSession {
    /// Handles one input line. Returns `false` when the session should end.
    fn handle(&mut self, romanizer: &Romanizer, line: &str) -> bool {
        match ReplCommand::parse(line) {
            None => {}
            Some(ReplCommand::Exit) => return false,
            Some(ReplCommand::Help) => println!("{REPL_HELP}"),
            Some(ReplCommand::SetLcode(lcode)) => {
                self.lcode = lcode.map(str::to_string);
                println!("lcode: {}", self.lcode.as_deref().unwrap_or("(none)"));
            }
            Some(ReplCommand::SetFormat(name)) => match name.parse() {
                Ok(format) => {
                    self.format = format;
                    println!("format: {format}");
                }
                Err(e) => eprintln!("Error: {e}"),
            },
            Some(ReplCommand::Romanize(text)) => match romanizer.romanize(text, self.lcode.as_deref()) {
                Ok(output) => println!("{}", render_for_terminal(&output, self.format)),
                Err(e) => eprintln!("Error: {e}"),
            },
        }
        true
    }
}

/// Human-readable rendering of one romanized line: the string, or one edge per row.
fn render_for_terminal(output: &ResolvedOutput, format: RomFormat) -> String {
    match format {
        RomFormat::Str => output.string(),
        RomFormat::Edges => output.edges().iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"),
        RomFormat::Lattice => output.lattice().iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"),
        RomFormat::Alts => {
            let mut rows = vec![format!("{}  (cost {})", output.string(), format_path_cost(output.total_cost()))];
            for alt in output.alts() {
                let others: Vec<&str> = alt.alternates.iter().map(|e| e.txt()).collect();
                let row = if others.is_empty() {
                    format!("  {}", alt.edge)
                } else {
                    format!("  {}  | {}", alt.edge, others.join(" | "))
                };
                rows.push(row);
            }
            rows.join("\n")
        }
    }
}

fn format_path_cost(total: PathCost) -> String {
    format!("{}.{:03}", total.cost / 1000, total.cost % 1000)
}

fn run_repl(romanizer: &Romanizer, cli: &Cli) -> Result<(), CliError> {
    let mut rl = DefaultEditor::new()?;

    let history_path = dirs::cache_dir().and_then(|mut path| {
        path.push("polyroman");
        fs::create_dir_all(&path).ok()?;
        path.push("history.txt");
        Some(path)
    });

    if let Some(path) = &history_path
        && let Err(err) = rl.load_history(path)
    {
        tracing::debug!(?path, %err, "no REPL history loaded");
    }

    let mut session = ReplSession { lcode: cli.lcode.clone(), format: cli.rom_format.into() };
    println!("polyroman {} (type :help for commands)", env!("CARGO_PKG_VERSION"));

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                rl.add_history_entry(&line)?;
                if !session.handle(romanizer, &line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted. To exit, press Ctrl-D or type :exit.");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("REPL Error: {err}");
                break;
            }
        }
    }

    if let Some(path) = &history_path
        && let Err(err) = rl.save_history(path)
    {
        tracing::warn!(?path, %err, "could not save REPL history");
    }

    Ok(())
}

const SAMPLES: &[(&str, &str)] = &[
    ("jpn", "一兆二千万四十二えん ほしい！"),
    ("jpn", "こんにちは、せかい。"),
    ("ara", "مرحبا بالعالم"),
    ("ell", "Καλημέρα, κόσμε."),
    ("heb", "שלום עולם"),
    ("hin", "नमस्ते दुनिया"),
    ("kor", "안녕하세요 세계"),
    ("rus", "Привет, мир! Как дела?"),
    ("ukr", "Привіт, світе!"),
    ("zho", "你好，世界！谢谢。"),
    ("", "¡Hola! ¿Cómo estás?"),
    ("", "Tôi yêu tiếng Việt!"),
    ("", "٣٬٥٠٠٫٢٥ ريال"),
    ("", "ラーメンとカレー"),
];

/// Column width of the sample text column, in terminal cells.
const SAMPLE_COLUMN_WIDTH: usize = 29;

/// Pads `text` with spaces to `width` terminal cells; wide characters count twice.
fn pad_to_width(text: &str, width: usize) -> String {
    let padding = width.saturating_sub(UnicodeWidthStr::width(text));
    format!("{text}{}", " ".repeat(padding))
}

fn show_samples(romanizer: &Romanizer) -> Result<(), CliError> {
    println!("Running sample conversions with polyroman:");
    println!("{}", "-".repeat(SAMPLE_COLUMN_WIDTH + 30));

    let mut elapsed = time::Duration::ZERO;
    for &(lcode, text) in SAMPLES {
        let start = time::Instant::now();
        let output = romanizer.romanize(text, Some(lcode))?;
        elapsed += start.elapsed();

        let label = if lcode.is_empty() { "     ".to_string() } else { format!("[{lcode}]") };
        println!(
            "{label} {} -> {}  (cost {}, {} edges)",
            pad_to_width(text, SAMPLE_COLUMN_WIDTH),
            output.string(),
            format_path_cost(output.total_cost()),
            output.edges().len()
        );
    }

    println!("{}", "-".repeat(SAMPLE_COLUMN_WIDTH + 30));
    let per_sample_us = elapsed.as_secs_f64() * 1e6 / SAMPLES.len() as f64;
    println!("Avg. processing time: {per_sample_us:.1} μs per sample");

    Ok(())
}
