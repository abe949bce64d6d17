use polyroman::{
    RomFormat, RomanizationError, Romanizer, RomanizerConfig, RuleSources, RuleStore, StreamOptions,
    rom_format,
};
use std::io::{BufReader, Cursor};
use std::{fs::File, sync::Arc};

fn romanizer() -> Romanizer {
    Romanizer::new().unwrap()
}

fn romanize(text: &str, lcode: Option<&str>) -> String {
    romanizer().romanize(text, lcode).unwrap().string()
}

fn assert_stream_output(input_path: &str, expected_output: &str, parallel: bool) {
    let expected_output_normalized = expected_output.replace("\r\n", "\n");

    let romanizer = romanizer();
    let mut buf = vec![];
    let reader = BufReader::new(File::open(input_path).unwrap());
    if parallel {
        romanizer.romanize_file_parallel(reader, &mut buf, StreamOptions::default()).unwrap();
    } else {
        romanizer.romanize_file(reader, &mut buf, StreamOptions::default()).unwrap();
    }

    let actual_output_normalized = String::from_utf8(buf).unwrap().replace("\r\n", "\n");

    assert_eq!(actual_output_normalized, expected_output_normalized);
}

#[test]
fn test_multi_script_romanization() {
    assert_stream_output(
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/test/multi-script.txt"),
        include_str!("test/multi-script.ref.txt"),
        false,
    );
}

#[test]
fn test_multi_script_romanization_parallel() {
    assert_stream_output(
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/test/multi-script.txt"),
        include_str!("test/multi-script.ref.txt"),
        true,
    );
}

#[test]
fn japanese_greeting_without_language_code() {
    assert_eq!(romanize("こんにちは", None), "kon'nichiha");
    assert_eq!(romanize("こんにちは", None), romanize("こんにちは", None));
}

#[test]
fn arabic_edges_partition_the_input() {
    let output = romanizer().romanize("مرحبا", Some("ara")).unwrap();
    let edges = output.edges();
    assert!(!output.string().is_empty());
    assert!(output.string().is_ascii());

    let mut position = 0;
    for edge in &edges {
        assert_eq!(edge.start(), position);
        assert!(edge.end() > edge.start());
        position = edge.end();
    }
    assert_eq!(position, 5);
    assert_eq!(output.string(), "mrhba");
}

#[test]
fn numeric_round_trip() {
    let output = romanizer().romanize("123", None).unwrap();
    let edges = output.edges();
    assert_eq!(edges.len(), 1);
    let edge = edges[0];
    assert!(edge.is_numeric());
    assert_eq!(edge.edge_type(), "numeric");
    assert_eq!(edge.value(), Some(123.0));
    assert_eq!(edge.orig_txt(), Some("123"));
    assert_eq!(edge.txt(), "123");
}

#[test]
fn numbers_in_other_scripts() {
    let output = romanizer().romanize("٣٬٥٠٠٫٢٥", None).unwrap();
    assert_eq!(output.string(), "3,500.25");
    assert_eq!(output.edges()[0].value(), Some(3500.25));

    assert_eq!(romanize("二〇二四年", Some("zho")), "2024nian");
    assert_eq!(romanize("一兆二千万四十二えん", Some("jpn")), "1000020000042en");
    assert_eq!(romanize("-42", None), "-42");
    assert_eq!(romanizer().romanize("-42", None).unwrap().edges()[0].value(), Some(-42.0));
}

#[test]
fn numbers_can_be_disabled() {
    let romanizer = romanizer().with_config(RomanizerConfig::default().numbers(false));
    let output = romanizer.romanize("42", None).unwrap();
    assert_eq!(output.string(), "42");
    assert!(output.lattice().iter().all(|e| !e.is_numeric()));
}

#[test]
fn language_code_selects_language_rules() {
    assert_eq!(romanize("を", None), "wo");
    assert_eq!(romanize("を", Some("jpn")), "o");
    assert_eq!(romanize("Київ", Some("ukr")), "Kyyiv");
    assert_eq!(romanize("Київ", None), "Kiyiv");
}

#[test]
fn inherent_vowel_depends_on_language() {
    assert_eq!(romanize("कमल", Some("hin")), "kamal");
    assert_eq!(romanize("कमल", Some("san")), "kamala");
    assert_eq!(romanize("नमस्ते", None), "namaste");
}

#[test]
fn romanize_text_preserves_line_breaks() {
    let romanizer = romanizer();
    assert_eq!(romanizer.romanize_text("Мир\nмир", None).unwrap(), "Mir\nmir");
    assert_eq!(romanizer.romanize_text("Мир\r\nмир\r", None).unwrap(), "Mir\r\nmir\r");
    assert_eq!(romanizer.romanize_text("\n\nМир\n", None).unwrap(), "\n\nMir\n");
    assert_eq!(romanizer.romanize_text("", None).unwrap(), "");
}

#[test]
fn parallel_lines_keep_their_order() {
    let lines = ["Мир", "안녕", "", "こんにちは", "Γειά"];
    let out = romanizer().romanize_lines_parallel(&lines, None).unwrap();
    assert_eq!(out, ["Mir", "annyeong", "", "kon'nichiha", "Geia"]);
}

#[test]
fn invalid_format_name_is_rejected() {
    let err = romanizer().romanize_with_format_name("Мир", None, "json").unwrap_err();
    assert!(matches!(err, RomanizationError::InvalidFormat(name) if name == "json"));

    let ok = romanizer().romanize_with_format_name("Мир", None, "edges").unwrap();
    assert_eq!(ok.as_edges().map(|e| e.len()), Some(3));
}

#[test]
fn strict_language_codes() {
    let lenient = romanizer();
    assert_eq!(lenient.romanize("Мир", Some("xx")).unwrap().string(), "Mir");
    assert_eq!(lenient.romanize("Мир", Some("zzz")).unwrap().string(), "Mir");

    let strict = romanizer().with_config(RomanizerConfig::default().strict_lcodes(true));
    for bad in ["xx", "zzz", "RUS"] {
        let err = strict.romanize("Мир", Some(bad)).unwrap_err();
        assert!(matches!(err, RomanizationError::UnknownLanguageCode(code) if code == bad));
    }
    assert!(strict.romanize("Мир", Some("rus")).is_ok());
    assert!(strict.romanize("Мир", Some("")).is_ok());
    assert!(matches!(
        strict.romanize_text("", Some("zzz")),
        Err(RomanizationError::UnknownLanguageCode(_))
    ));
}

#[test]
fn alternates_are_ranked_and_capped() {
    let output = romanizer().romanize("שלום", Some("heb")).unwrap();
    assert_eq!(output.string(), "shlvm");
    let alts = output.alts();
    let vav = alts.iter().find(|alt| alt.edge.start() == 2).unwrap();
    let texts: Vec<&str> = vav.alternates.iter().map(|e| e.txt()).collect();
    assert_eq!(texts, ["o", "u"]);

    let capped = romanizer()
        .with_config(RomanizerConfig::default().max_alternates(Some(1)))
        .romanize("שלום", Some("heb"))
        .unwrap();
    let vav = capped.alts().into_iter().find(|alt| alt.edge.start() == 2).unwrap();
    assert_eq!(vav.alternates.len(), 1);
}

#[test]
fn views_are_consistent() {
    let romanizer = romanizer();
    for text in ["こんにちは", "ラーメン", "1,234.5 kg", "Γειά σου", "✨ユーロマン✨"] {
        let output = romanizer.romanize(text, None).unwrap();
        let joined: String = output.edges().iter().map(|e| e.txt()).collect();
        assert_eq!(joined, output.string());

        let alts: Vec<_> = output.alts().into_iter().map(|alt| alt.edge).collect();
        let edges: Vec<_> = output.edges().into_iter().cloned().collect();
        assert_eq!(alts, edges);
        assert!(edges.iter().all(|e| output.lattice().contains(e)));
    }
}

#[test]
fn typed_and_dynamic_formats_agree() {
    let romanizer = romanizer();
    let typed = romanizer.romanize_string::<rom_format::Alts>("ラーメン", None).unwrap();
    let dynamic = romanizer.romanize_with_format("ラーメン", None, Some(RomFormat::Alts)).unwrap();
    assert_eq!(typed.as_alts(), dynamic.as_alts().unwrap());
    assert_eq!(typed.render().unwrap(), dynamic.to_string().unwrap());

    let lattice = romanizer.romanize_string::<rom_format::Lattice>("ラーメン", None).unwrap();
    let edges = romanizer.romanize_string::<rom_format::Edges>("ラーメン", None).unwrap();
    assert!(lattice.as_edges().len() > edges.as_edges().len());
    assert_eq!(edges.into_iter().map(|e| e.txt().to_string()).collect::<String>(), "raamen");
}

#[test]
fn escaped_input_is_decoded_by_the_wrapper() {
    let romanizer = romanizer();
    let escaped = romanizer.romanize_escaped::<rom_format::Str>(r"\u041C\u0438\u0440", None).unwrap();
    assert_eq!(escaped.as_str(), "Mir");
    assert_eq!(romanizer.romanize(r"\u041C", None).unwrap().string(), r"\u041C");
}

#[test]
fn stream_options() {
    let romanizer = romanizer();
    let input = "Мир\n::lcode jpn を\nмир\n";

    let mut buf = vec![];
    let options = StreamOptions { max_lines: Some(2), ..Default::default() };
    romanizer.romanize_file(Cursor::new(input), &mut buf, options).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "Mir\n::lcode jpn o\n");

    let mut buf = vec![];
    let options = StreamOptions { decode_unicode: true, ..Default::default() };
    romanizer.romanize_file(Cursor::new(r"\u03B4"), &mut buf, options).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "d\n");

    let mut buf = vec![];
    let options = StreamOptions { rom_format: RomFormat::Edges, ..Default::default() };
    romanizer.romanize_file_parallel(Cursor::new("Мир"), &mut buf, options).unwrap();
    assert_eq!(
        String::from_utf8(buf).unwrap(),
        "[[0,1,\"M\",\"rom\"],[1,2,\"i\",\"rom\"],[2,3,\"r\",\"rom\"]]\n"
    );
}

#[test]
fn line_limit_is_the_same_for_both_stream_modes() {
    let romanizer = romanizer();
    let input = "Мир\nмир\n";

    for max_lines in [0, 1, 5] {
        let options = StreamOptions { max_lines: Some(max_lines), ..Default::default() };
        let mut sequential = vec![];
        romanizer.romanize_file(Cursor::new(input), &mut sequential, options).unwrap();
        let mut parallel = vec![];
        romanizer.romanize_file_parallel(Cursor::new(input), &mut parallel, options).unwrap();
        assert_eq!(sequential, parallel, "max_lines = {max_lines}");
    }

    let mut buf = vec![];
    let options = StreamOptions { max_lines: Some(0), ..Default::default() };
    romanizer.romanize_file(Cursor::new(input), &mut buf, options).unwrap();
    assert!(buf.is_empty());
}

#[test]
fn stream_replaces_invalid_utf8() {
    let mut buf = vec![];
    romanizer()
        .romanize_file(Cursor::new(b"ab\xff\nMir\n".to_vec()), &mut buf, StreamOptions::default())
        .unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "ab\u{FFFD}\nMir\n");
}

#[test]
fn strict_stream_rejects_unknown_directive() {
    let strict = romanizer().with_config(RomanizerConfig::default().strict_lcodes(true));
    let mut buf = vec![];
    let err = strict
        .romanize_file(Cursor::new("::lcode qqq Мир\n"), &mut buf, StreamOptions::default())
        .unwrap_err();
    assert!(matches!(err, RomanizationError::UnknownLanguageCode(_)));
}

#[test]
fn custom_rule_store() {
    let store = RuleStore::from_sources(&RuleSources {
        scripts: "::script-name Latin ::range 0041-005A,0061-007A ::language deu",
        rule_tables: &[("custom", "::s sch ::t sh\n::s s ::t s\n::s c ::t c\n::s h ::t h\n")],
        pinyin: "",
        num_props: "",
    })
    .unwrap();
    let romanizer = Romanizer::with_store(Arc::new(store));
    assert_eq!(romanizer.romanize("schule", Some("deu")).unwrap().string(), "shule");

    let err = RuleStore::from_sources(&RuleSources {
        rule_tables: &[("custom", "::t x\n")],
        ..Default::default()
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "custom:1: rule has no '::s' source");
}

#[test]
fn config_from_json() {
    let config = RomanizerConfig::from_json_str(r#"{"max_alternates": 2, "numbers": false}"#).unwrap();
    assert_eq!(config, RomanizerConfig::default().max_alternates(Some(2)).numbers(false));
    assert!(matches!(
        RomanizerConfig::from_json_str(r#"{"unknown": 1}"#),
        Err(RomanizationError::InvalidConfig(_))
    ));
}
