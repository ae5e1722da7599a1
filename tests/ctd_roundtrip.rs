// tests/ctd_roundtrip.rs

use ctdwrap::core::{
    command_line::{AssemblyError, CommandLineAssembler},
    ctd_document::CtdError,
    ctd_reader::{self, NodeConfiguration},
    job_loader::{Job, bind_generated_outputs},
    parameters::Value,
    ports::PortBindings,
};
use std::fs;
use std::path::{Path, PathBuf};

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/test.ctd")
}

fn fixture_text() -> String {
    fs::read_to_string(fixture_path()).unwrap()
}

fn load() -> NodeConfiguration {
    ctd_reader::read_file(&fixture_path()).unwrap()
}

const EDITS: [(&str, &str); 4] = [
    ("x", "22.4"),
    ("1.end_id", "2204"),
    ("1.2.z", "1979"),
    ("1.o", "filename"),
];

#[test]
fn writer_edits_are_visible_after_rereading() {
    let config = load();
    let mut writer = config.writer().unwrap();
    for (path, value) in EDITS {
        writer.set_parameter_value(path, value).unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("edited.ctd");
    writer.write(&out).unwrap();

    let edited = ctd_reader::read_file(&out).unwrap();
    let tree = edited.tree();
    assert_eq!(tree.get_leaf("x").unwrap().value(), Some(&Value::Double(22.4)));
    assert_eq!(tree.get_leaf("1.end_id").unwrap().value(), Some(&Value::Int(2204)));
    assert_eq!(tree.get_leaf("1.2.z").unwrap().value(), Some(&Value::Int(1979)));
    assert_eq!(
        tree.get_leaf("1.o").unwrap().value(),
        Some(&Value::File("filename".to_string()))
    );
    assert_eq!(tree.get_leaf("x").unwrap().string_rep(), "22.4");
}

#[test]
fn writer_changes_nothing_but_the_edited_values() {
    let config = load();
    let mut writer = config.writer().unwrap();
    writer.apply(EDITS).unwrap();
    let written = String::from_utf8(writer.to_bytes().unwrap()).unwrap();

    let expected = fixture_text()
        .replace(r#"name="x" value="1.5""#, r#"name="x" value="22.4""#)
        .replace(r#"name="end_id" value="10""#, r#"name="end_id" value="2204""#)
        .replace(r#"name="z" value="3""#, r#"name="z" value="1979""#)
        .replace(r#"name="o" value="""#, r#"name="o" value="filename""#);
    assert_eq!(written, expected);

    // Every parameter outside the edit set reads back identically.
    let edited = ctd_reader::read(&written).unwrap();
    let edited_paths: Vec<&str> = EDITS.iter().map(|(p, _)| *p).collect();
    for (path, original) in config.tree().leaves() {
        let reread = edited.tree().get_leaf(&path).unwrap();
        if edited_paths.contains(&path.as_str()) {
            assert_ne!(reread.value(), original.value(), "{} should have changed", path);
        } else {
            assert_eq!(reread, original, "{} should be unchanged", path);
        }
    }
}

#[test]
fn writer_rejects_unknown_paths_and_invalid_values() {
    let mut writer = load().writer().unwrap();
    assert!(matches!(
        writer.set_parameter_value("1.2.nope", "1"),
        Err(CtdError::UnknownParameterPath { .. })
    ));
    assert!(matches!(
        writer.set_parameter_value("1.2.z", "9999"),
        Err(CtdError::InvalidParameterValue { .. })
    ));
    assert_eq!(String::from_utf8(writer.to_bytes().unwrap()).unwrap(), fixture_text());
}

#[test]
fn reader_extracts_metadata_ports_and_sections() {
    let config = load();
    assert_eq!(config.info().name, "TestTool");
    assert_eq!(config.info().version, "1.2.0");
    assert_eq!(config.info().program(), "testtool");
    assert_eq!(config.inputs().len(), 1);
    assert_eq!(config.inputs()[0].name(), "in");
    assert_eq!(config.inputs()[0].mime_types(), ["mzML", "txt"]);
    assert_eq!(config.outputs()[0].name(), "1.o");
    assert!(config.outputs()[0].is_optional());
    assert_eq!(config.tree().list_children("1").unwrap(), ["end_id", "verbose", "2", "o"]);
    assert_eq!(config.tree().get_leaf("1.2.z").unwrap().section(), "1.2");
}

#[test]
fn missing_required_file_fails_until_bound() {
    let config = load();
    let assembler = CommandLineAssembler::from_configuration(&config);

    let err = assembler.assemble(&PortBindings::new()).unwrap_err();
    assert_eq!(
        err,
        AssemblyError::MissingRequiredParameter {
            path: "in".to_string()
        }
    );

    let mut bindings = PortBindings::new();
    bindings.bind("in", "/data/run.mzML");
    let tokens = assembler.assemble(&bindings).unwrap();
    assert_eq!(tokens.iter().filter(|t| *t == "/data/run.mzML").count(), 1);
    assert_eq!(
        tokens,
        ["-x", "1.5", "-in", "/data/run.mzML", "--end=10", "-z", "3", "-tags", "alpha", "beta"]
    );
}

#[test]
fn assembly_is_stable_across_calls() {
    let config = load();
    let assembler = CommandLineAssembler::from_configuration(&config);
    let mut bindings = PortBindings::new();
    bindings.bind("in", "a.txt");
    bindings.bind("1.o", "out.csv");
    let first = assembler.assemble(&bindings).unwrap();
    let second = assembler.assemble(&bindings).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.last().map(String::as_str), Some("out.csv"));
}

#[test]
fn job_file_drives_edits_and_bindings() {
    let dir = tempfile::tempdir().unwrap();
    fs::copy(fixture_path(), dir.path().join("tool.ctd")).unwrap();
    let job_path = dir.path().join("ctdwrap.toml");
    fs::write(
        &job_path,
        r#"
ctd = "tool.ctd"
output_dir = "results"

[params]
"1.verbose" = "true"
"1.2.tags" = "one@@@__@@@two"

[ports]
in = "inputs/sample.txt"

[port_options."1.o"]
linked_input = 0
"#,
    )
    .unwrap();

    let job = Job::load(&job_path).unwrap();
    let mut config = ctd_reader::read_file(&job.ctd_path().unwrap()).unwrap();
    job.apply_params(config.tree_mut()).unwrap();
    job.apply_port_options(&mut config).unwrap();

    let mut bindings = job.bindings();
    bind_generated_outputs(&config, &mut bindings, &job.output_dir().unwrap());

    let tokens = CommandLineAssembler::from_configuration(&config)
        .assemble(&bindings)
        .unwrap();
    let sample = dir.path().join("inputs/sample.txt").display().to_string();
    let result = dir.path().join("results/sample.csv").display().to_string();
    assert_eq!(
        tokens,
        [
            "-x",
            "1.5",
            "-in",
            sample.as_str(),
            "--end=10",
            "-v",
            "-z",
            "3",
            "-tags",
            "one",
            "two",
            "-out",
            result.as_str(),
        ]
    );
}
