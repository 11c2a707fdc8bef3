//! Flattened windows to classifier input tensor

use ndarray::Array3;

use crate::error::{Error, Result};
use crate::records::FlattenedRow;

/// Channels per time step (x, y, z)
pub const AXIS_CHANNELS: usize = 3;

/// Stack rows into a `(N, window_length, 3)` f32 tensor
///
/// The axis channel is the innermost dimension: `tensor[[i, t, 0]]` is x,
/// `[.., 1]` is y and `[.., 2]` is z of sample `t` in window `i`.
pub fn to_tensor(rows: &[FlattenedRow], window_length: usize) -> Result<Array3<f32>> {
    let mut tensor = Array3::<f32>::zeros((rows.len(), window_length, AXIS_CHANNELS));

    for (i, row) in rows.iter().enumerate() {
        for (channel, (name, series)) in ["x", "y", "z"].into_iter().zip(row.axes()).enumerate() {
            if series.len() != window_length {
                return Err(Error::shape(format!(
                    "row {}: expected {} '{}' fields, found {} (tensor shape ({}, {}, {}))",
                    i,
                    window_length,
                    name,
                    series.len(),
                    rows.len(),
                    window_length,
                    AXIS_CHANNELS
                )));
            }
            for (t, value) in series.iter().enumerate() {
                tensor[[i, t, channel]] = *value as f32;
            }
        }
    }

    Ok(tensor)
}
