//! End-to-end tests: raw samples through windowing, inference and persistence

use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::{Array2, Array3};
use ovis_common::config::PipelineConfig;
use ovis_common::TimestampParser;
use ovis_infer::{
    argmax, persist, predict, to_tensor, window, FlattenedRow, FlattenedTable, LabeledRow,
    LabeledTable, Pipeline, Point, PointSink, RawSample, Result, SampleTable,
};

/// Sink that records every batch it receives
#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<Vec<Point>>>,
}

impl RecordingSink {
    fn batches(&self) -> Vec<Vec<Point>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PointSink for RecordingSink {
    async fn write_points(&self, points: &[Point]) -> Result<()> {
        self.batches.lock().unwrap().push(points.to_vec());
        Ok(())
    }
}

fn labels() -> Vec<String> {
    ["grazing", "lying", "walking"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn ninety_samples() -> Vec<RawSample> {
    (0..90)
        .map(|i| {
            RawSample::new(
                format!("2024-03-01 10:{:02}:{:02}", i / 60, i % 60),
                (i as f64 * 0.1).sin(),
                (i as f64 * 0.1).cos(),
                9.81,
            )
        })
        .collect()
}

/// Favors "lying" when the window's mean x is negative, "grazing" otherwise
fn mean_x_classifier(input: &Array3<f32>) -> Result<Array2<f32>> {
    let n = input.shape()[0];
    let mut out = Array2::<f32>::zeros((n, 3));
    for i in 0..n {
        let mean: f32 = input.slice(ndarray::s![i, .., 0]).mean().unwrap_or(0.0);
        if mean < 0.0 {
            out[[i, 1]] = 0.9;
            out[[i, 0]] = 0.1;
        } else {
            out[[i, 0]] = 0.6;
            out[[i, 2]] = 0.4;
        }
    }
    Ok(out)
}

fn labeled_with_times(times: &[&str]) -> LabeledTable {
    let mut table = LabeledTable::new(1, None);
    for time in times {
        table
            .push(LabeledRow {
                window: FlattenedRow {
                    x: vec![0.0],
                    y: vec![0.0],
                    z: vec![1.0],
                    time: time.to_string(),
                    entity: None,
                },
                behaviour: "grazing".to_string(),
                confidence: 0.7,
            })
            .unwrap();
    }
    table
}

#[test]
fn test_ninety_samples_end_to_end() {
    let input = ninety_samples();
    let table = SampleTable::from_samples(&input);

    let flattened = window(&table, 30, "Time").unwrap();
    assert_eq!(flattened.len(), 3);
    for (i, row) in flattened.rows().iter().enumerate() {
        assert_eq!(row.time, input[i * 30 + 29].time);
    }

    let tensor = to_tensor(flattened.rows(), 30).unwrap();
    assert_eq!(tensor.shape(), &[3, 30, 3]);

    let labeled = predict(&flattened, &mean_x_classifier, &labels()).unwrap();
    assert_eq!(labeled.len(), 3);
    for row in labeled.rows() {
        assert!(labels().contains(&row.behaviour));
        assert!((0.0..=1.0).contains(&row.confidence));
    }
}

#[test]
fn test_argmax_confidence() {
    let probabilities = ndarray::array![[0.1_f32, 0.7, 0.2]];
    let (idx, confidence) = argmax(probabilities.row(0)).unwrap();
    assert_eq!(labels()[idx], "lying");
    assert_eq!(confidence, 0.7);

    let mut flattened = FlattenedTable::new(1);
    flattened
        .push(FlattenedRow {
            x: vec![0.0],
            y: vec![0.0],
            z: vec![0.0],
            time: "t".to_string(),
            entity: None,
        })
        .unwrap();
    let vocab: Vec<String> = vec!["lying".into(), "grazing".into(), "walking".into()];
    let classifier = |_: &Array3<f32>| -> Result<Array2<f32>> { Ok(probabilities.clone()) };

    let labeled = predict(&flattened, &classifier, &vocab).unwrap();
    assert_eq!(labeled.rows()[0].behaviour, "grazing");
    assert!((labeled.rows()[0].confidence - 0.7).abs() < 1e-6);
}

#[tokio::test]
async fn test_persist_skips_invalid_timestamp() {
    let table = labeled_with_times(&[
        "2024-03-01T10:00:00Z",
        "garbage",
        "2024-03-01T10:00:30Z",
    ]);
    let sink = RecordingSink::default();

    let written = persist(&table, &sink, "behavior_pred", None, &TimestampParser::utc())
        .await
        .unwrap();

    assert_eq!(written, 2);
    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert!(batches[0].iter().all(|p| p.measurement == "behavior_pred"));
    assert_eq!(batches[0][0].timestamp_ns, 1_709_287_200_000_000_000);
}

#[tokio::test]
async fn test_persist_all_invalid_makes_no_write() {
    let table = labeled_with_times(&["garbage", "", "also garbage"]);
    let sink = RecordingSink::default();

    let written = persist(&table, &sink, "behavior_pred", None, &TimestampParser::utc())
        .await
        .unwrap();

    assert_eq!(written, 0);
    assert!(sink.batches().is_empty());
}

#[tokio::test]
async fn test_pipeline_run_and_persist_with_sheep_tag() {
    let mut config = PipelineConfig::default();
    config.window_length = 2;
    config.chunk_size = 4;
    config.labels = labels();

    let mut table = SampleTable::new(["timestamp", "acc_x", "acc_y", "acc_z", "Sheep_ID"]);
    let rows = [
        ("2024-03-01 10:00:00", "-1", "ewe-3"),
        ("2024-03-01 10:00:01", "-1", "ewe-3"),
        ("2024-03-01 10:00:02", "1", "0"),
        ("2024-03-01 10:00:03", "1", "0"),
        ("2024-03-01 10:00:04", "1", "ewe-4"),
    ];
    for (time, x, id) in rows {
        table.push_text_row([time, x, "0", "9.8", id]).unwrap();
    }

    let pipeline = Pipeline::new(&config, mean_x_classifier).unwrap();
    let labeled = pipeline.run(&table).unwrap();

    assert_eq!(labeled.len(), 2);
    assert_eq!(labeled.rows()[0].behaviour, "lying");
    assert_eq!(labeled.rows()[1].behaviour, "grazing");

    let sink = RecordingSink::default();
    let written = pipeline.persist(&labeled, &sink).await.unwrap();
    assert_eq!(written, 2);

    let batch = &sink.batches()[0];
    assert_eq!(batch[0].tags.get("sheep_id").map(String::as_str), Some("ewe-3"));
    assert!(batch[1].tags.is_empty());
}

#[test]
fn test_pipeline_flatten_chunks_drops_chunk_tails() {
    let mut config = PipelineConfig::default();
    config.window_length = 3;
    config.chunk_size = 6;
    config.labels = labels();
    let pipeline = Pipeline::new(&config, mean_x_classifier).unwrap();

    let input = ninety_samples();
    // Second chunk is short (5 rows): one window, two rows lost
    let chunks = vec![
        Ok(SampleTable::from_samples(&input[..6])),
        Ok(SampleTable::from_samples(&input[6..11])),
    ];

    let flattened = pipeline.flatten_chunks(chunks).unwrap();
    assert_eq!(flattened.len(), 3);
    assert_eq!(flattened.rows()[2].time, input[8].time);
}
