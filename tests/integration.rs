//! Integration tests for calidad: Parquet files on disk, registry
//! resolution, the full assessment pipeline and chart specs.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use std::{path::Path, sync::Arc};

use arrow::{
    array::{Int64Array, RecordBatch, StringArray},
    datatypes::{DataType, Field, Schema},
};
use parquet::arrow::ArrowWriter;

use calidad::{
    histogram_chart, run_operations, AggregateOp, Config, DatasetRegistry, Dialect, Grade,
    HistogramBinner, QualityAssessmentEngine, QualityScorer, TableScan,
};

type Row = (Option<i64>, Option<String>, Option<i64>);

fn corpus_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, true),
        Field::new("text", DataType::Utf8, true),
        Field::new("token_count", DataType::Int64, true),
    ]))
}

fn write_corpus(path: &Path, rows: &[Row]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    let ids: Vec<Option<i64>> = rows.iter().map(|r| r.0).collect();
    let texts: Vec<Option<&str>> = rows.iter().map(|r| r.1.as_deref()).collect();
    let tokens: Vec<Option<i64>> = rows.iter().map(|r| r.2).collect();
    let batch = RecordBatch::try_new(
        corpus_schema(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(texts)),
            Arc::new(Int64Array::from(tokens)),
        ],
    )
    .expect("batch");

    let file = std::fs::File::create(path).expect("create");
    let mut writer = ArrowWriter::try_new(file, corpus_schema(), None).expect("writer");
    writer.write(&batch).expect("write");
    writer.close().expect("close");
}

fn prose(i: usize) -> String {
    format!(
        "Comprehensive documentation section {i} describes wonderful landscapes \
         surrounding peaceful mountain villages throughout extraordinary seasons"
    )
}

/// 200 rows: 180 clean, 10 sharing one text, 5 with markup, 5 repetitive.
fn dirty_corpus() -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();
    for i in 0..180 {
        rows.push((Some(i as i64), Some(prose(i)), Some(40 + (i as i64 % 20))));
    }
    for i in 180..190 {
        rows.push((
            Some(i as i64),
            Some("exactly the same sentence in every one of these rows".to_string()),
            Some(45),
        ));
    }
    for i in 190..195 {
        rows.push((
            Some(i as i64),
            Some(format!("<html><body>page {i}</body></html>")),
            Some(30),
        ));
    }
    for i in 195..200 {
        rows.push((
            Some(i as i64),
            Some(format!("spam spam spam spam spam spam is all row {i} says")),
            Some(25),
        ));
    }
    rows
}

fn full_sample_engine() -> QualityAssessmentEngine {
    QualityAssessmentEngine::new(
        Config::default()
            .with_sample_size(1_000)
            .with_workers(2)
            .with_seed(17),
    )
    .expect("engine")
}

#[test]
fn test_end_to_end_parquet_assessment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("corpus.parquet");
    write_corpus(&path, &dirty_corpus());

    let scan = TableScan::from_parquet(&path).expect("scan");
    assert_eq!(scan.row_count(), 200);

    let bundle = full_sample_engine().assess(&scan).expect("bundle");
    assert_eq!(bundle.row_count, 200);
    // 10 rows share one text: 9 duplicates.
    assert_eq!(bundle.duplicate_texts, 9);
    assert_eq!(bundle.duplicate_ids, 0);
    assert_eq!(bundle.markup.html_like, 5);
    // The sample covers the whole table, so repetition is exact.
    assert_eq!(bundle.repetition.sample_count, 5);
    assert_eq!(bundle.repetition.point_estimate_total, 5);

    let result = QualityScorer::new().score(&bundle);
    assert!(result.score < 100.0);
    assert!(result.score > 0.0);
    assert!(!result.issues.is_empty());
}

#[test]
fn test_clean_corpus_grades_excellent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("clean.parquet");
    let rows: Vec<Row> = (0..100)
        .map(|i| (Some(i as i64), Some(prose(i)), Some(40 + (i as i64 % 10))))
        .collect();
    write_corpus(&path, &rows);

    let scan = TableScan::from_parquet(&path).expect("scan");
    let bundle = full_sample_engine().assess(&scan).expect("bundle");
    let result = QualityScorer::new().score(&bundle);

    assert_eq!(result.score, 100.0);
    assert_eq!(result.grade, Grade::Excellent);
    assert!(result.issues.is_empty());
}

#[test]
fn test_registry_to_grade_pipeline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    write_corpus(&root.join("webcrawl/original/v1/webcrawl.parquet"), &dirty_corpus());

    let registry = DatasetRegistry::open(root).expect("registry");
    let scan = registry
        .open_scan("webcrawl", "original", "v1")
        .expect("scan");
    assert_eq!(scan.label(), "webcrawl/original/v1");

    let bundle = full_sample_engine().assess(&scan).expect("bundle");
    assert_eq!(bundle.row_count, 200);

    // Unresolvable triples surface NotFound, not a panic or a default.
    assert!(registry.open_scan("webcrawl", "original", "v2").is_err());
    assert!(registry.open_scan("other", "original", "v1").is_err());
}

#[test]
fn test_misnamed_column_fails_loudly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("corpus.parquet");
    write_corpus(&path, &dirty_corpus());

    let engine = QualityAssessmentEngine::new(
        Config::default().with_text_column("body").with_workers(1),
    )
    .expect("engine");
    let scan = TableScan::from_parquet(&path).expect("scan");
    let err = engine.assess(&scan).err().expect("error");
    assert!(err.to_string().contains("body"));
    assert!(err.to_string().contains("corpus"));
}

#[test]
fn test_seeded_runs_are_identical_across_reopens() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("corpus.parquet");
    write_corpus(&path, &dirty_corpus());

    let engine = QualityAssessmentEngine::new(
        Config::default()
            .with_sample_size(50)
            .with_workers(4)
            .with_seed(99),
    )
    .expect("engine");

    let first = engine
        .assess(&TableScan::from_parquet(&path).expect("scan"))
        .expect("bundle");
    let second = engine
        .assess(&TableScan::from_parquet(&path).expect("scan"))
        .expect("bundle");
    assert_eq!(first, second);

    let score_a = QualityScorer::new().score(&first);
    let score_b = QualityScorer::new().score(&second);
    assert_eq!(score_a, score_b);
}

#[test]
fn test_histogram_from_parquet_column() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("corpus.parquet");
    let rows: Vec<Row> = (1..=1000)
        .map(|i| (Some(i as i64), Some(prose(i)), Some(i as i64)))
        .collect();
    write_corpus(&path, &rows);

    let scan = TableScan::from_parquet(&path).expect("scan");
    let mut values = Vec::new();
    for batch in scan.stream(&["token_count"]).expect("stream") {
        let batch = batch.expect("batch");
        let array = batch.column_by_name("token_count").expect("column");
        let floats = arrow::compute::cast(array.as_ref(), &DataType::Float64).expect("cast");
        let floats = floats
            .as_any()
            .downcast_ref::<arrow::array::Float64Array>()
            .expect("floats");
        values.extend(floats.iter().flatten());
    }

    let spec = HistogramBinner::new()
        .with_bins(10)
        .bin("token_count", &values)
        .expect("spec");
    assert_eq!(spec.bins.len(), 10);
    assert_eq!(spec.total_count(), 1000);

    for dialect in [Dialect::Vega, Dialect::VegaLite] {
        let chart = histogram_chart(&spec, dialect);
        assert!(chart["$schema"].as_str().expect("schema").contains("vega"));
    }
}

#[test]
fn test_analysis_over_parquet() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("corpus.parquet");
    let rows: Vec<Row> = (0..50)
        .map(|i| (Some(i as i64), Some(prose(i)), Some(10 * (i as i64 + 1))))
        .collect();
    write_corpus(&path, &rows);

    let scan = TableScan::from_parquet(&path).expect("scan");
    let result = run_operations(
        &scan,
        &[
            AggregateOp::RowCount,
            AggregateOp::Min("token_count".to_string()),
            AggregateOp::Max("token_count".to_string()),
            AggregateOp::Mean("token_count".to_string()),
            AggregateOp::DistinctCount("text".to_string()),
        ],
    )
    .expect("analysis");

    assert_eq!(result.row_count, Some(50));
    let stats = &result.columns["token_count"];
    assert_eq!(stats.min, Some(10.0));
    assert_eq!(stats.max, Some(500.0));
    assert_eq!(stats.mean, Some(255.0));
    assert_eq!(result.columns["text"].distinct_count, Some(50));
}

#[test]
fn test_zero_row_parquet_grades_needs_attention() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.parquet");
    write_corpus(&path, &[]);

    let scan = TableScan::from_parquet(&path).expect("scan");
    assert_eq!(scan.row_count(), 0);

    let bundle = full_sample_engine().assess(&scan).expect("bundle");
    let result = QualityScorer::new().score(&bundle);
    assert_eq!(result.score, 0.0);
    assert_eq!(result.grade, Grade::NeedsAttention);
}
