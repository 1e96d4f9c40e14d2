//! Several sensor streams carried in one block.
//!
//! Sensors are packed side by side as channel groups. The [`SENSORS_KEY`]
//! metadata entry maps each sensor name to its channel `offset`, its
//! `channels` count and its own `metadata`, so the streams can be split apart
//! again downstream.

use super::block::rates_match;
use super::{DataError, DataResult, MetaValue, Metadata, Samples, TimeSeriesBlock};

/// Metadata key holding the channel layout of a multi-sensor block.
pub const SENSORS_KEY: &str = "sensors";

/// Pack one block per sensor into a single `[frames, channels]` block.
///
/// Every sensor must have the same frame count and sample rate. Channels are
/// laid out in the order given. The packed block starts at the first sensor's
/// timestamp.
pub fn merge_sensors<'a, I>(sensors: I) -> DataResult<TimeSeriesBlock>
where
    I: IntoIterator<Item = (&'a str, &'a TimeSeriesBlock)>,
{
    let sensors: Vec<(&str, &TimeSeriesBlock)> = sensors.into_iter().collect();
    let Some(&(_, first)) = sensors.first() else {
        return Err(DataError::Empty);
    };
    let frames = first.block_size();

    let mut layout = Metadata::new();
    let mut width = 0;
    for &(name, block) in &sensors {
        if block.block_size() != frames {
            return Err(mismatch(
                name,
                format!("{} frames, expected {}", block.block_size(), frames),
            ));
        }
        if !rates_match(first.sample_rate(), block.sample_rate()) {
            return Err(mismatch(
                name,
                format!("{} Hz, expected {} Hz", block.sample_rate(), first.sample_rate()),
            ));
        }
        let entry = Metadata::from([
            ("offset".to_string(), MetaValue::from(width)),
            ("channels".to_string(), MetaValue::from(block.frame_width())),
            ("metadata".to_string(), MetaValue::Map(block.metadata().clone())),
        ]);
        if layout.insert(name.to_string(), MetaValue::Map(entry)).is_some() {
            return Err(mismatch(name, "listed more than once".to_string()));
        }
        width += block.frame_width();
    }

    let mut data = Vec::with_capacity(frames * width);
    for frame in 0..frames {
        for (_, block) in &sensors {
            data.extend_from_slice(block.values().frame(frame).unwrap_or_default());
        }
    }

    TimeSeriesBlock::with_metadata(
        Samples::new(vec![frames, width], data)?,
        first.sample_rate(),
        first.start_timestamp(),
        Metadata::from([(SENSORS_KEY.to_string(), MetaValue::Map(layout))]),
    )
}

/// Channels of one sensor as a standalone `[frames, channels]` block.
///
/// The result carries the sensor's own metadata, not the packed block's.
pub fn sensor_block(block: &TimeSeriesBlock, sensor: &str) -> DataResult<TimeSeriesBlock> {
    let layout = block
        .metadata()
        .get(SENSORS_KEY)
        .and_then(MetaValue::as_map)
        .ok_or(DataError::MissingField(SENSORS_KEY))?;
    let entry = layout
        .get(sensor)
        .and_then(MetaValue::as_map)
        .ok_or_else(|| DataError::UnknownSensor(sensor.to_string()))?;

    let offset = layout_index(entry, "offset", sensor)?;
    let channels = layout_index(entry, "channels", sensor)?;
    let width = block.frame_width();
    if channels == 0 || offset + channels > width {
        return Err(mismatch(
            sensor,
            format!(
                "channels {}..{} outside frame width {}",
                offset,
                offset + channels,
                width
            ),
        ));
    }

    let data: Vec<f64> = block
        .values()
        .iter_frames()
        .flat_map(|frame| frame[offset..offset + channels].iter().copied())
        .collect();
    let metadata = entry
        .get("metadata")
        .and_then(MetaValue::as_map)
        .cloned()
        .unwrap_or_default();

    TimeSeriesBlock::with_metadata(
        Samples::new(vec![block.block_size(), channels], data)?,
        block.sample_rate(),
        block.start_timestamp(),
        metadata,
    )
}

fn layout_index(entry: &Metadata, field: &str, sensor: &str) -> DataResult<usize> {
    entry
        .get(field)
        .and_then(MetaValue::as_int)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| mismatch(sensor, format!("layout entry has no valid '{field}'")))
}

fn mismatch(sensor: &str, reason: String) -> DataError {
    DataError::SensorMismatch {
        sensor: sensor.to_string(),
        reason,
    }
}
