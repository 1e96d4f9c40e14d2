use crate::data::{sensor_block, SharedBlock};
use crate::pipeline::error::{NodeResult, PipelineError, PipelineResult};
use crate::pipeline::node::{input, BlockMap, NodeSignature, ProcessingNode};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Demultiplexes a multi-sensor block into one block per sensor.
///
/// Sensor `s` is published as `{s}_raw`. A sensor absent from the block's
/// layout fails that block.
#[derive(Debug, Clone)]
pub struct SplitSensorsNode {
    sig: NodeSignature,
    sensors: Vec<String>,
}

impl SplitSensorsNode {
    pub fn new<I, S>(input: impl Into<String>, sensors: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sensors: Vec<String> = sensors.into_iter().map(Into::into).collect();
        if sensors.is_empty() {
            return Err(PipelineError::invalid_config(
                "SplitSensors",
                "at least one sensor is required",
            ));
        }
        let duplicate = {
            let mut seen = BTreeSet::new();
            sensors.iter().find(|s| !seen.insert(s.as_str())).cloned()
        };
        if let Some(dup) = duplicate {
            return Err(PipelineError::invalid_config(
                "SplitSensors",
                format!("sensor '{dup}' listed more than once"),
            ));
        }

        let outputs = sensors.iter().map(|s| format!("{s}_raw")).collect();
        Ok(Self {
            sig: NodeSignature::new("SplitSensors", vec![input.into()], outputs),
            sensors,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.sig.name = name.into();
        self
    }

    pub fn sensors(&self) -> &[String] {
        &self.sensors
    }
}

impl ProcessingNode for SplitSensorsNode {
    fn name(&self) -> &str {
        self.sig.name()
    }

    fn requires(&self) -> &[String] {
        self.sig.requires()
    }

    fn produces(&self) -> &[String] {
        self.sig.produces()
    }

    fn process(&mut self, inputs: &BlockMap) -> NodeResult<BlockMap> {
        let block = input(inputs, self.sig.input())?;
        self.sensors
            .iter()
            .zip(self.sig.produces())
            .map(|(sensor, key)| -> NodeResult<(String, SharedBlock)> {
                Ok((key.clone(), Arc::new(sensor_block(block, sensor)?)))
            })
            .collect()
    }
}
