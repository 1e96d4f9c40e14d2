use super::{DataSource, SourceResult};
use crate::data::{merge_sensors, RawSample, TimeSeriesBlock};

/// Named sensor streams read in lockstep.
///
/// Item `i` packs block `i` of every sensor into one block (see
/// [`merge_sensors`](crate::data::merge_sensors)). The stream ends with the
/// shortest sensor. Sensors that disagree on frame count or sample rate fail
/// that item only.
#[derive(Debug, Clone, Default)]
pub struct MultiSensorSource {
    sensors: Vec<(String, Vec<TimeSeriesBlock>)>,
    position: usize,
}

impl MultiSensorSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sensor stream. Channels are packed in the order sensors are added;
    /// adding a name again replaces its blocks.
    pub fn sensor(mut self, name: impl Into<String>, blocks: Vec<TimeSeriesBlock>) -> Self {
        let name = name.into();
        match self.sensors.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = blocks,
            None => self.sensors.push((name, blocks)),
        }
        self
    }

    pub fn sensor_names(&self) -> impl Iterator<Item = &str> {
        self.sensors.iter().map(|(name, _)| name.as_str())
    }

    /// Number of items, bounded by the shortest sensor.
    pub fn len(&self) -> usize {
        self.sensors
            .iter()
            .map(|(_, blocks)| blocks.len())
            .min()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataSource for MultiSensorSource {
    type Item = RawSample;

    fn next_raw_block(&mut self) -> SourceResult<Option<RawSample>> {
        if self.position >= self.len() {
            return Ok(None);
        }
        let index = self.position;
        self.position += 1;
        let merged = merge_sensors(
            self.sensors
                .iter()
                .map(|(name, blocks)| (name.as_str(), &blocks[index])),
        )?;
        Ok(Some(RawSample::Block(merged)))
    }

    fn reset(&mut self) -> SourceResult<()> {
        self.position = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sensor_block, Samples};
    use crate::source::SourceError;

    fn constant(value: f64, frames: usize, rate: f64) -> TimeSeriesBlock {
        TimeSeriesBlock::new(Samples::from_vec(vec![value; frames]), rate, 0.0).unwrap()
    }

    fn packed(src: &mut MultiSensorSource) -> TimeSeriesBlock {
        match src.next_raw_block().unwrap() {
            Some(RawSample::Block(block)) => block,
            other => panic!("expected a block, got {other:?}"),
        }
    }

    #[test]
    fn test_lockstep_until_shortest_sensor() {
        let mut src = MultiSensorSource::new()
            .sensor("a", vec![constant(1.0, 4, 10.0), constant(2.0, 4, 10.0)])
            .sensor("b", vec![constant(3.0, 4, 10.0)]);
        assert_eq!(src.len(), 1);
        assert_eq!(src.sensor_names().collect::<Vec<_>>(), vec!["a", "b"]);

        let block = packed(&mut src);
        assert_eq!(block.frame_width(), 2);
        assert_eq!(sensor_block(&block, "b").unwrap().values().as_slice(), &[3.0; 4]);
        assert!(src.next_raw_block().unwrap().is_none());

        src.reset().unwrap();
        assert!(src.next_raw_block().unwrap().is_some());
    }

    #[test]
    fn test_mismatched_item_is_recoverable() {
        let mut src = MultiSensorSource::new()
            .sensor("a", vec![constant(1.0, 4, 10.0), constant(1.0, 4, 10.0)])
            .sensor("b", vec![constant(1.0, 3, 10.0), constant(1.0, 4, 10.0)]);

        let err = src.next_raw_block().unwrap_err();
        assert!(matches!(err, SourceError::Data(_)));
        assert!(err.is_recoverable());
        assert_eq!(packed(&mut src).block_size(), 4);
    }

    #[test]
    fn test_sensor_replaced_by_name() {
        let src = MultiSensorSource::new()
            .sensor("a", vec![constant(1.0, 1, 1.0)])
            .sensor("a", vec![constant(1.0, 1, 1.0); 3]);
        assert_eq!(src.sensor_names().count(), 1);
        assert_eq!(src.len(), 3);
        assert!(MultiSensorSource::new().is_empty());
    }
}
