use std::fmt::Write as _;
use std::path::Path;

use salary_range::app::pipeline::{ModelSource, run_pipeline};
use salary_range::data::generate_records;
use salary_range::domain::{BoostParams, DivisorMode, RunConfig};
use salary_range::report::format_run_summary;

fn write_csv(path: &Path, count: usize) {
    write_csv_with_prefix(path, count, "");
}

fn write_csv_with_prefix(path: &Path, count: usize, prefix: &str) {
    let mut csv = String::from("string,target_l,target_u\n");
    for r in generate_records(count, 5).unwrap() {
        writeln!(csv, "\"{prefix}{}\",{},{}", r.text, r.target_lower, r.target_upper).unwrap();
    }
    // Inverted row: skipped, reported as a row error.
    csv.push_str("\"broken row\",90000,10000\n");
    std::fs::write(path, csv).unwrap();
}

fn config_for(data: &Path) -> RunConfig {
    RunConfig {
        data_path: data.to_path_buf(),
        max_len: 24,
        boost: BoostParams {
            n_estimators: 30,
            ..BoostParams::default()
        },
        ..RunConfig::default()
    }
}

#[test]
fn csv_run_prints_accuracy_last() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.csv");
    write_csv(&data, 80);

    let config = config_for(&data);
    let run = run_pipeline(&config).unwrap();
    assert_eq!(run.ingest.records.len(), 80);
    assert_eq!(run.ingest.row_errors.len(), 1);
    assert_eq!(run.split.test, 32);

    let summary = format_run_summary(&run, &config);
    let last = summary.lines().last().unwrap();
    assert_eq!(last, format!("acc is {}", run.accuracy));
}

#[test]
fn boosting_reduces_training_loss() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.csv");
    write_csv(&data, 150);

    let run = run_pipeline(&config_for(&data)).unwrap();
    let ModelSource::Trained { history, .. } = &run.source else {
        panic!("expected a trained model");
    };
    let first = history.first().unwrap();
    let last = history.last().unwrap();
    assert!(last.train_loss < first.train_loss);
}

#[test]
fn saved_model_reproduces_the_score() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.csv");
    let model = dir.path().join("model.json");
    write_csv(&data, 80);

    let trained = run_pipeline(&RunConfig {
        save_model: Some(model.clone()),
        ..config_for(&data)
    })
    .unwrap();
    let loaded = run_pipeline(&RunConfig {
        use_trained: Some(model),
        ..config_for(&data)
    })
    .unwrap();

    assert!(matches!(loaded.source, ModelSource::Loaded { .. }));
    assert!((trained.accuracy - loaded.accuracy).abs() < 1e-9);
    assert!((trained.test_loss - loaded.test_loss).abs() < 1e-6);
}

#[test]
fn saved_model_keeps_its_vocabulary_on_other_data() {
    let dir = tempfile::tempdir().unwrap();
    let data_a = dir.path().join("a.csv");
    let data_b = dir.path().join("b.csv");
    let model = dir.path().join("model.json");
    let job = dir.path().join("job.txt");
    write_csv(&data_a, 80);
    write_csv_with_prefix(&data_b, 80, "apply now for this exciting new opportunity today ");
    std::fs::write(&job, "We are hiring a senior nurse based in leeds.\n").unwrap();

    let trained = run_pipeline(&RunConfig {
        save_model: Some(model.clone()),
        predict: Some(job.clone()),
        ..config_for(&data_a)
    })
    .unwrap();
    let reloaded = run_pipeline(&RunConfig {
        use_trained: Some(model),
        predict: Some(job),
        ..config_for(&data_b)
    })
    .unwrap();

    assert_eq!(trained.prediction, reloaded.prediction);
}

#[test]
fn optional_outputs_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.csv");
    let export = dir.path().join("predictions.csv");
    let job = dir.path().join("job.txt");
    let plots = dir.path().join("plots");
    write_csv(&data, 60);
    std::fs::write(&job, "We are hiring a senior data engineer based in london.\n").unwrap();

    let run = run_pipeline(&RunConfig {
        export: Some(export.clone()),
        predict: Some(job),
        plot: true,
        plot_dir: plots.clone(),
        val_fraction: 0.2,
        ..config_for(&data)
    })
    .unwrap();

    let exported = std::fs::read_to_string(&export).unwrap();
    assert_eq!(exported.lines().count(), run.scored.len() + 1);
    assert!(plots.join("loss.png").exists());
    assert!(plots.join("accuracy.png").exists());
    let predicted = run.prediction.unwrap();
    assert!(predicted.is_finite());
}

#[test]
fn legacy_divisor_scales_the_mean() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.csv");
    write_csv(&data, 50);

    let standard = run_pipeline(&config_for(&data)).unwrap();
    let legacy = run_pipeline(&RunConfig {
        divisor: DivisorMode::LastIndex,
        ..config_for(&data)
    })
    .unwrap();

    let n = standard.scored.len() as f64;
    assert!((legacy.accuracy - standard.accuracy * n / (n - 1.0)).abs() < 1e-9);
}

#[test]
fn missing_data_file_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_pipeline(&config_for(&dir.path().join("nope.csv"))).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
