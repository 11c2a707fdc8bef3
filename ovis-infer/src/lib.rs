//! # Ovis Infer
//!
//! Sheep behaviour inference from tri-axial accelerometer data:
//! - Fixed-length windowing of raw samples into flattened rows
//! - Tensor assembly and batched classification through a [`Classifier`]
//! - Persistence of labeled windows to a [`PointSink`] (InfluxDB v2)
//! - CSV ingestion and flattened/labeled CSV export

pub mod error;
pub mod export;
pub mod influx;
pub mod inference;
pub mod ingest;
pub mod pipeline;
pub mod records;
pub mod sink;
pub mod table;
pub mod tensor;
pub mod windower;
pub mod writer;

pub use error::{Error, Result};
pub use inference::{argmax, predict, Classifier};
pub use influx::InfluxClient;
pub use pipeline::Pipeline;
pub use records::{FlattenedRow, FlattenedTable, LabeledRow, LabeledTable};
pub use sink::{Point, PointSink};
pub use table::{RawSample, SampleTable};
pub use tensor::to_tensor;
pub use windower::{window, window_chunks, window_with, WindowSpec};
pub use writer::persist;
