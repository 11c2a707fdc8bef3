//! Windowing, inference and persistence wired together
//!
//! [`Pipeline`] owns the validated settings and the injected classifier. The
//! sink is passed per call so one pipeline can feed several destinations.

use ovis_common::config::PipelineConfig;
use ovis_common::TimestampParser;
use tracing::info;

use crate::error::{Error, Result};
use crate::inference::{predict, Classifier};
use crate::records::{FlattenedTable, LabeledTable};
use crate::sink::PointSink;
use crate::table::SampleTable;
use crate::windower::{validate_chunking, window_chunks, window_with, WindowSpec};
use crate::writer;

pub struct Pipeline<C> {
    spec: WindowSpec,
    chunk_size: usize,
    labels: Vec<String>,
    measurement: String,
    parser: TimestampParser,
    classifier: C,
}

impl<C: Classifier> Pipeline<C> {
    /// Validate `config` and bind `classifier`
    pub fn new(config: &PipelineConfig, classifier: C) -> Result<Self> {
        config.validate()?;
        validate_chunking(config.chunk_size, config.window_length)?;
        if config.labels.is_empty() {
            return Err(Error::configuration(
                "pipeline.labels must list the classifier's behaviour labels",
            ));
        }

        let mut spec = WindowSpec::new(config.window_length, config.time_column.trim())?;
        if let Some(entity) = config.entity_column() {
            spec = spec.with_entity_column(entity);
        }

        Ok(Self {
            spec,
            chunk_size: config.chunk_size,
            labels: config.labels.clone(),
            measurement: config.measurement.clone(),
            parser: TimestampParser::new(config.utc_offset()?),
            classifier,
        })
    }

    pub fn window_spec(&self) -> &WindowSpec {
        &self.spec
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Window a whole table
    pub fn flatten(&self, table: &SampleTable) -> Result<FlattenedTable> {
        window_with(table, &self.spec)
    }

    /// Window a chunk stream; each chunk is windowed independently
    pub fn flatten_chunks<I>(&self, chunks: I) -> Result<FlattenedTable>
    where
        I: IntoIterator<Item = Result<SampleTable>>,
    {
        window_chunks(chunks, &self.spec, self.chunk_size)
    }

    /// Classify already-flattened windows
    pub fn label(&self, flattened: &FlattenedTable) -> Result<LabeledTable> {
        predict(flattened, &self.classifier, &self.labels)
    }

    /// Window and classify `table`
    pub fn run(&self, table: &SampleTable) -> Result<LabeledTable> {
        let flattened = self.flatten(table)?;
        let labeled = self.label(&flattened)?;
        info!(
            input_rows = table.len(),
            windows = labeled.len(),
            "Pipeline run complete"
        );
        Ok(labeled)
    }

    /// Persist labeled windows with the configured measurement and entity tag
    pub async fn persist<S>(&self, labeled: &LabeledTable, sink: &S) -> Result<usize>
    where
        S: PointSink + ?Sized,
    {
        writer::persist(
            labeled,
            sink,
            &self.measurement,
            self.spec.entity_column(),
            &self.parser,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    fn config() -> PipelineConfig {
        let mut config: PipelineConfig = ovis_common::config::TomlConfig::default().pipeline;
        config.window_length = 3;
        config.chunk_size = 9;
        config.labels = vec!["lying".to_string(), "grazing".to_string()];
        config
    }

    fn grazing(input: &Array3<f32>) -> Result<Array2<f32>> {
        Ok(Array2::from_shape_fn((input.shape()[0], 2), |(_, c)| {
            if c == 1 {
                0.8
            } else {
                0.2
            }
        }))
    }

    #[test]
    fn test_new_rejects_bad_chunking() {
        let mut bad = config();
        bad.chunk_size = 10;
        let err = Pipeline::new(&bad, grazing).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_new_rejects_empty_labels() {
        let mut bad = config();
        bad.labels.clear();
        assert!(Pipeline::new(&bad, grazing).is_err());
    }

    #[test]
    fn test_new_rejects_bad_offset() {
        let mut bad = config();
        bad.source_utc_offset = "two hours".to_string();
        let err = Pipeline::new(&bad, grazing).err().unwrap();
        assert!(matches!(err, Error::Common(_)));
    }

    #[test]
    fn test_run_windows_and_labels() {
        let pipeline = Pipeline::new(&config(), grazing).unwrap();
        let samples: Vec<_> = (0..7)
            .map(|i| crate::table::RawSample::new(format!("t{i}"), 0.0, 0.0, 1.0))
            .collect();

        let labeled = pipeline.run(&SampleTable::from_samples(&samples)).unwrap();

        assert_eq!(labeled.len(), 2);
        assert!(labeled.rows().iter().all(|r| r.behaviour == "grazing"));
        assert_eq!(labeled.rows()[1].window.time, "t5");
    }

    #[test]
    fn test_entity_column_from_config() {
        let pipeline = Pipeline::new(&config(), grazing).unwrap();
        assert_eq!(pipeline.window_spec().entity_column(), Some("sheep_id"));

        let mut no_entity = config();
        no_entity.entity_column = Some(String::new());
        let pipeline = Pipeline::new(&no_entity, grazing).unwrap();
        assert_eq!(pipeline.window_spec().entity_column(), None);
    }
}
