// Integration tests for the batch runner

use anyhow::{Result, anyhow, bail};
use binmill::metadata::ProcessorMetadata;
use binmill::runner::{ExecMode, FnFactory, InputSource, RunConfig, Runner, UnitFactory};
use binmill::stream::read_to_vec;
use binmill::testing::{MemorySink, TempWorkspace};
use binmill::unit::{Artifact, ProcessingUnit, UnitContext, context};
use std::io::Write;
use std::sync::Arc;

/// Writes each input reversed to `<stem>.rev`. Inputs named `bad*` emit one
/// artifact and then fail.
fn reverse_factory() -> impl UnitFactory {
    FnFactory::new(
        ProcessorMetadata::new("reverse", "Writes each input reversed").with_extensions(["bin"]),
        |ctx: Arc<UnitContext>| -> Result<ProcessingUnit> {
            let mut data = read_to_vec(&mut ctx.open_input()?)?;
            data.reverse();
            let stem = ctx
                .input()
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            let mut items = vec![Ok(Artifact::new(format!("{stem}.rev"), data))];
            if stem.starts_with("bad") {
                items.push(Err(anyhow!("corrupt record in {stem}")));
            }
            Ok(ProcessingUnit::segmented(ctx, items))
        },
    )
}

fn quiet(config: RunConfig) -> Runner {
    Runner::new(config).with_logger(Arc::new(MemorySink::new()))
}

// ============================================================================
// Parallel batches
// ============================================================================

#[test]
fn parallel_batch_commits_every_output() -> Result<()> {
    let ws = TempWorkspace::new()?;
    ws.write_file("in/a.bin", &[1, 2, 3])?;
    ws.write_file("in/b.bin", &[4, 5])?;
    ws.write_file("in/sub/c.bin", &[6])?;

    let config = RunConfig::new(ws.file_path("out"))
        .with_input(InputSource::new(ws.file_path("in"), "a.bin").parallel(true))
        .with_input(InputSource::new(ws.file_path("in"), "b.bin").parallel(true))
        .with_input(InputSource::new(ws.file_path("in"), "sub/c.bin").parallel(true))
        .with_workers(3);
    assert_eq!(config.exec_mode(), ExecMode::Parallel { threads: Some(3) });

    let runner = quiet(config);
    let report = runner.run(&reverse_factory())?;

    assert!(report.is_success());
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.bytes_committed, 6);
    assert_eq!(ws.read_file("out/a.rev")?, vec![3, 2, 1]);
    assert_eq!(ws.read_file("out/b.rev")?, vec![5, 4]);
    assert_eq!(ws.read_file("out/sub/c.rev")?, vec![6]);

    let inputs: Vec<_> = report.outcomes.iter().map(|o| o.input.clone()).collect();
    let expected = vec![
        ws.file_path("in/a.bin"),
        ws.file_path("in/b.bin"),
        ws.file_path("in/sub/c.bin"),
    ];
    assert_eq!(inputs, expected);

    let metrics = runner.metrics();
    assert_eq!(metrics.counter("units_succeeded"), 3);
    assert_eq!(metrics.counter("artifacts_written"), 3);
    assert_eq!(metrics.counter("bytes_committed"), 6);
    assert!(metrics.elapsed().is_some());
    Ok(())
}

#[test]
fn failed_unit_does_not_stop_the_batch_and_is_discarded() -> Result<()> {
    let ws = TempWorkspace::new()?;
    ws.write_file("in/good.bin", &[1, 2])?;
    ws.write_file("in/bad.bin", &[9, 9])?;
    ws.write_file("in/more.bin", &[3])?;

    let mut config = RunConfig::new(ws.file_path("out"));
    for name in ["good.bin", "bad.bin", "more.bin", "missing.bin"] {
        config = config.with_input(InputSource::new(ws.file_path("in"), name).parallel(true));
    }

    let runner = quiet(config);
    let report = runner.run(&reverse_factory())?;

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 2);
    assert!(report.outcomes[0].is_success());
    let bad = report.outcomes[1].error.as_ref().unwrap();
    assert!(bad.to_string().contains("corrupt record"));
    assert!(report.outcomes[3].error.is_some());

    assert_eq!(ws.read_file("out/good.rev")?, vec![2, 1]);
    assert_eq!(ws.read_file("out/more.rev")?, vec![3]);
    // the failed unit wrote one artifact before failing; none of it lands
    assert!(!ws.file_path("out/bad.rev").exists());
    assert_eq!(report.bytes_committed, 3);
    assert_eq!(runner.metrics().counter("units_failed"), 2);
    Ok(())
}

#[test]
fn single_worker_batch_runs_in_order() -> Result<()> {
    let ws = TempWorkspace::new()?;
    ws.write_file("in/a.bin", &[1])?;
    ws.write_file("in/b.bin", &[2])?;

    let config = RunConfig::new(ws.file_path("out"))
        .with_input(InputSource::new(ws.file_path("in"), "a.bin").parallel(true))
        .with_input(InputSource::new(ws.file_path("in"), "b.bin").parallel(true))
        .with_workers(1);
    assert_eq!(config.exec_mode(), ExecMode::Sequential);

    let report = quiet(config).run(&reverse_factory())?;
    assert!(report.is_success());
    assert_eq!(ws.read_file("out/a.rev")?, vec![1]);
    assert_eq!(ws.read_file("out/b.rev")?, vec![2]);
    Ok(())
}

// ============================================================================
// Serial inputs
// ============================================================================

#[test]
fn serial_direct_unit_writes_through_the_context() -> Result<()> {
    let ws = TempWorkspace::new()?;
    ws.write_file("in/data/header.bin", b"MAGIC")?;

    let factory = FnFactory::new(
        ProcessorMetadata::new("magic", "Copies the first four bytes"),
        |ctx: Arc<UnitContext>| -> Result<ProcessingUnit> {
            Ok(ProcessingUnit::direct(ctx, |unit| {
                let data = read_to_vec(&mut context::open_input()?)?;
                let mut out = context::open_output("magic.bin")?;
                out.write_all(&data[..4])?;
                unit.log(log::Level::Info, &format!("{} args", unit.args().len()));
                Ok(())
            }))
        },
    );

    let sink = MemorySink::new();
    let config = RunConfig::new(ws.file_path("out"))
        .with_input(InputSource::new(ws.file_path("in"), "data/header.bin"))
        .with_args(vec!["--fast".into()]);
    let report = Runner::new(config)
        .with_logger(Arc::new(sink.clone()))
        .run(&factory)?;

    assert!(report.is_success());
    assert_eq!(report.outcomes[0].artifacts, 0);
    // serial output goes straight to real storage
    assert_eq!(report.bytes_committed, 0);
    assert_eq!(ws.read_file("out/data/magic.bin")?, b"MAGI");
    assert!(sink.contains("1 args"));
    Ok(())
}

#[test]
fn preload_hands_units_materialized_input() -> Result<()> {
    let ws = TempWorkspace::new()?;
    ws.write_file("in/x.bin", &[0; 32])?;

    let factory = FnFactory::new(
        ProcessorMetadata::new("probe", "Checks its input stream"),
        |ctx: Arc<UnitContext>| -> Result<ProcessingUnit> {
            if !ctx.open_input()?.is_materialized() {
                bail!("input was not preloaded");
            }
            Ok(ProcessingUnit::segmented(ctx, Vec::new()))
        },
    );
    let input = InputSource::new(ws.file_path("in"), "x.bin");

    let config = RunConfig::new(ws.file_path("out")).with_input(input);
    let report = quiet(config.clone()).run(&factory)?;
    assert_eq!(report.failed(), 1);

    let report = quiet(config.with_preload(true)).run(&factory)?;
    assert!(report.is_success());
    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn run_config_loads_from_json() -> Result<()> {
    let ws = TempWorkspace::new()?;
    let path = ws.write_file(
        "run.json",
        br#"{
            "output_root": "out",
            "workers": 2,
            "inputs": [
                { "base": "in", "relative": "a.bin", "parallel": true },
                { "base": "in", "relative": "b.bin" }
            ]
        }"#,
    )?;

    let config = RunConfig::from_json_file(&path)?;
    assert_eq!(config.output_root, std::path::PathBuf::from("out"));
    assert_eq!(config.exec_mode(), ExecMode::Parallel { threads: Some(2) });
    assert!(!config.preload);
    assert_eq!(config.inputs.len(), 2);
    assert!(config.inputs[0].parallel);
    assert!(!config.inputs[1].parallel);
    assert_eq!(config.inputs[1].path(), std::path::Path::new("in/b.bin"));

    assert!(RunConfig::from_json_file(ws.file_path("missing.json")).is_err());
    Ok(())
}

#[test]
fn metrics_serialize_to_json() -> Result<()> {
    let ws = TempWorkspace::new()?;
    ws.write_file("in/a.bin", &[1, 2])?;
    let config = RunConfig::new(ws.file_path("out"))
        .with_input(InputSource::new(ws.file_path("in"), "a.bin").parallel(true));
    let runner = quiet(config);
    runner.run(&reverse_factory())?;

    let metrics_path = ws.file_path("metrics.json");
    runner.metrics().save_to_file(&metrics_path)?;
    let value: serde_json::Value = serde_json::from_slice(&ws.read_file("metrics.json")?)?;
    assert_eq!(value["counters"]["units_succeeded"], 1);
    assert_eq!(value["counters"]["bytes_committed"], 2);
    assert!(value["execution_time_ms"].is_u64());
    let key = ws.file_path("in/a.bin").to_string_lossy().into_owned();
    assert!(value["unit_time_ms"][key.as_str()].is_u64());
    Ok(())
}
