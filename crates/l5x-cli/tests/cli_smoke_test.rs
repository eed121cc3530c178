use std::fs;

use clap::Parser;
use tempfile::tempdir;

use l5x_cli::{Args, CliError, run};

const PROJECT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<RSLogix5000Content SchemaRevision="1.0" SoftwareRevision="33.00" TargetName="Plant" TargetType="Controller">
<Controller Use="Target" Name="Plant">
<Tags>
<Tag Name="Start" TagType="Base" DataType="BOOL" Radix="Decimal" Constant="false" ExternalAccess="Read/Write">
<Data Format="L5K">
<![CDATA[0]]>
</Data>
<Data Format="Decorated">
<DataValue DataType="BOOL" Radix="Decimal" Value="0"/>
</Data>
</Tag>
</Tags>
<Programs>
<Program Name="MainProgram" MainRoutineName="MainRoutine">
<Routines>
<Routine Name="MainRoutine" Type="RLL">
<RLLContent>
<Rung Number="0" Type="N">
<Text>
<![CDATA[XIC(Start)OTE(Start);]]>
</Text>
</Rung>
</RLLContent>
</Routine>
</Routines>
</Program>
</Programs>
<Tasks>
<Task Name="MainTask" Type="CONTINUOUS" Priority="10" Watchdog="500">
<ScheduledPrograms>
<ScheduledProgram Name="MainProgram"/>
</ScheduledPrograms>
</Task>
</Tasks>
</Controller>
</RSLogix5000Content>
"#;

fn args(argv: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("l5x").chain(argv.iter().copied())).unwrap()
}

#[test]
fn e2e_validate_clean_project() {
    let dir = tempdir().expect("Failed to create temp directory");
    let input = dir.path().join("plant.L5X");
    fs::write(&input, PROJECT).unwrap();

    let mut out = Vec::new();
    run(
        &args(&["validate", input.to_str().unwrap(), "--log-level", "off"]),
        &mut out,
    )
    .unwrap();
    let printed = String::from_utf8(out).unwrap();
    assert!(!printed.contains("error["), "unexpected errors:\n{printed}");
}

#[test]
fn e2e_validate_reports_errors() {
    let dir = tempdir().expect("Failed to create temp directory");
    let input = dir.path().join("broken.L5X");
    fs::write(&input, PROJECT.replace("XIC(Start)", "XIC(Missing)")).unwrap();

    let mut out = Vec::new();
    let err = run(&args(&["validate", input.to_str().unwrap()]), &mut out).unwrap_err();
    assert!(matches!(err, CliError::Invalid { errors: 1 }));

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("UndefinedTag"), "{printed}");
    assert!(printed.contains("Missing"), "{printed}");
}

#[test]
fn e2e_validate_single_category() {
    let dir = tempdir().expect("Failed to create temp directory");
    let input = dir.path().join("broken.L5X");
    fs::write(&input, PROJECT.replace("XIC(Start)", "XIC(Missing)")).unwrap();

    let mut out = Vec::new();
    run(
        &args(&["validate", input.to_str().unwrap(), "--category", "tasks"]),
        &mut out,
    )
    .unwrap();

    let err = run(
        &args(&["validate", input.to_str().unwrap(), "--category", "bogus"]),
        &mut Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CliError::UnknownCategory(_)));
}

#[test]
fn e2e_normalize_round_trips() {
    let dir = tempdir().expect("Failed to create temp directory");
    let input = dir.path().join("plant.L5X");
    let output = dir.path().join("normalized.L5X");
    fs::write(&input, PROJECT).unwrap();

    run(
        &args(&["normalize", input.to_str().unwrap(), "-o", output.to_str().unwrap()]),
        &mut Vec::new(),
    )
    .unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), PROJECT);

    let mut out = Vec::new();
    run(&args(&["normalize", input.to_str().unwrap()]), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), PROJECT);
}

#[test]
fn e2e_rung_prints_canonical_text_and_references() {
    let mut out = Vec::new();
    run(&args(&["rung", "XIC(Start)JSR(Fill,0);"]), &mut out).unwrap();

    let printed = String::from_utf8(out).unwrap();
    let lines: Vec<_> = printed.lines().collect();
    assert_eq!(lines[0], "XIC(Start)JSR(Fill,0);");
    assert!(lines.contains(&"tag Start"));
    assert!(lines.contains(&"routine Fill"));
}

#[test]
fn e2e_rung_rejects_missing_terminator() {
    let err = run(&args(&["rung", "XIC(Start)"]), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, CliError::Rung { .. }));
}

#[test]
fn e2e_missing_input_is_io_error() {
    let dir = tempdir().expect("Failed to create temp directory");
    let err = run(
        &args(&["validate", dir.path().join("absent.L5X").to_str().unwrap()]),
        &mut Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CliError::Io(_)));
}
