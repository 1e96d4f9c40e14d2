//! Declarative node descriptions.
//!
//! [`NodeSpec`] is the serializable form of a built-in node, used by the
//! configuration file. [`NodeKind`] names the variants without their settings.

use crate::analysis::{SpectrumConfig, WindowFunction};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::node::AnyNode;
use crate::pipeline::nodes::{
    ChunkRmsNode, DecisionNode, IdentityNode, MovingAverageNode, NormalizeNode, ScriptNode,
    SlidingWindowNode, SpectrumNode, SplitNode, SplitSensorsNode,
};
use serde::{Deserialize, Serialize};

/// Types of built-in nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Identity,
    Normalize,
    MovingAverage,
    Split,
    SlidingWindow,
    ChunkRms,
    Spectrum,
    Script,
    SplitSensors,
    Decision,
}

impl NodeKind {
    /// Get the display name for this node type.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::Identity => "Identity",
            NodeKind::Normalize => "Normalize",
            NodeKind::MovingAverage => "Moving Average",
            NodeKind::Split => "Split",
            NodeKind::SlidingWindow => "Sliding Window",
            NodeKind::ChunkRms => "Chunk RMS",
            NodeKind::Spectrum => "Spectrum",
            NodeKind::Script => "Script",
            NodeKind::SplitSensors => "Split Sensors",
            NodeKind::Decision => "Decision",
        }
    }

    /// Get all available node types.
    pub fn all() -> &'static [NodeKind] {
        &[
            NodeKind::Identity,
            NodeKind::Normalize,
            NodeKind::MovingAverage,
            NodeKind::Split,
            NodeKind::SlidingWindow,
            NodeKind::ChunkRms,
            NodeKind::Spectrum,
            NodeKind::Script,
            NodeKind::SplitSensors,
            NodeKind::Decision,
        ]
    }

    /// True for nodes that carry samples across blocks.
    pub fn is_stateful(&self) -> bool {
        matches!(self, NodeKind::SlidingWindow | NodeKind::ChunkRms)
    }

    /// Get a detailed description of what this node does.
    pub fn description(&self) -> &'static str {
        match self {
            NodeKind::Identity =>
                "Passes its input through unchanged.\n\
                 Optionally republishes it under an alias.",

            NodeKind::Normalize =>
                "Scales each block so its peak magnitude is 1.\n\
                 Records the applied factor as 'scale'.\n\
                 Near-silent blocks pass through untouched.",

            NodeKind::MovingAverage =>
                "Boxcar smoothing per channel.\n\
                 Output length matches the input.",

            NodeKind::Split =>
                "Publishes one input under several keys.",

            NodeKind::SlidingWindow =>
                "Accumulates samples across blocks.\n\
                 Emits overlapping fixed-length windows.\n\
                 Window and hop are given in seconds.",

            NodeKind::ChunkRms =>
                "Accumulates samples across blocks.\n\
                 Emits the RMS of each complete chunk.",

            NodeKind::Spectrum =>
                "Magnitude spectrum of each block.\n\
                 Channels are averaged before the FFT.",

            NodeKind::Script =>
                "Applies a Rhai expression to every sample.\n\
                 Variables: value, t, index, channel.",

            NodeKind::SplitSensors =>
                "Unpacks a multi-sensor block.\n\
                 Publishes each sensor as '<sensor>_raw'.",

            NodeKind::Decision =>
                "Averages the means of several inputs.\n\
                 Emits 1 above the threshold, else 0.",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Serializable description of a built-in node.
///
/// Every variant accepts an optional `name` overriding the default node name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeSpec {
    Identity {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        input: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
    Normalize {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        input: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        eps: Option<f64>,
    },
    MovingAverage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        input: String,
        window: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    Split {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        input: String,
        outputs: Vec<String>,
    },
    SlidingWindow {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        input: String,
        output: String,
        window_seconds: f64,
        hop_seconds: f64,
    },
    ChunkRms {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        input: String,
        output: String,
        chunk_seconds: f64,
    },
    Spectrum {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        input: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<WindowFunction>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        zero_pad: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remove_dc: Option<bool>,
    },
    Script {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        input: String,
        output: String,
        expression: String,
    },
    SplitSensors {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        input: String,
        sensors: Vec<String>,
    },
    Decision {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        inputs: Vec<String>,
        output: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<f64>,
    },
}

impl NodeSpec {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeSpec::Identity { .. } => NodeKind::Identity,
            NodeSpec::Normalize { .. } => NodeKind::Normalize,
            NodeSpec::MovingAverage { .. } => NodeKind::MovingAverage,
            NodeSpec::Split { .. } => NodeKind::Split,
            NodeSpec::SlidingWindow { .. } => NodeKind::SlidingWindow,
            NodeSpec::ChunkRms { .. } => NodeKind::ChunkRms,
            NodeSpec::Spectrum { .. } => NodeKind::Spectrum,
            NodeSpec::Script { .. } => NodeKind::Script,
            NodeSpec::SplitSensors { .. } => NodeKind::SplitSensors,
            NodeSpec::Decision { .. } => NodeKind::Decision,
        }
    }

    /// Construct the node, validating its parameters.
    ///
    /// # Errors
    /// `InvalidNodeConfig` for out-of-range parameters or a script that does
    /// not compile.
    pub fn build(&self) -> PipelineResult<AnyNode> {
        let node: AnyNode = match self {
            NodeSpec::Identity { name, input, alias } => {
                let mut node = IdentityNode::new(input);
                if let Some(alias) = alias {
                    node = node.alias(alias);
                }
                named(node, name, IdentityNode::with_name).into()
            }
            NodeSpec::Normalize {
                name,
                input,
                output,
                eps,
            } => {
                let mut node = NormalizeNode::new(input);
                if let Some(output) = output {
                    node = node.output(output);
                }
                if let Some(eps) = eps {
                    node = node.eps(*eps);
                }
                named(node, name, NormalizeNode::with_name).into()
            }
            NodeSpec::MovingAverage {
                name,
                input,
                window,
                output,
            } => {
                let mut node = MovingAverageNode::new(input, *window)?;
                if let Some(output) = output {
                    node = node.output(output);
                }
                named(node, name, MovingAverageNode::with_name).into()
            }
            NodeSpec::Split {
                name,
                input,
                outputs,
            } => {
                let node = SplitNode::new(input, outputs.iter().cloned())?;
                named(node, name, SplitNode::with_name).into()
            }
            NodeSpec::SlidingWindow {
                name,
                input,
                output,
                window_seconds,
                hop_seconds,
            } => {
                let node = SlidingWindowNode::new(input, output, *window_seconds, *hop_seconds)?;
                named(node, name, SlidingWindowNode::with_name).into()
            }
            NodeSpec::ChunkRms {
                name,
                input,
                output,
                chunk_seconds,
            } => {
                let node = ChunkRmsNode::new(input, output, *chunk_seconds)?;
                named(node, name, ChunkRmsNode::with_name).into()
            }
            NodeSpec::Spectrum {
                name,
                input,
                output,
                window,
                zero_pad,
                remove_dc,
            } => {
                let defaults = SpectrumConfig::default();
                let config = SpectrumConfig {
                    window: window.unwrap_or(defaults.window),
                    zero_pad: zero_pad.unwrap_or(defaults.zero_pad),
                    remove_dc: remove_dc.unwrap_or(defaults.remove_dc),
                };
                let mut node = SpectrumNode::new(input, config);
                if let Some(output) = output {
                    node = node.output(output);
                }
                named(node, name, SpectrumNode::with_name).into()
            }
            NodeSpec::Script {
                name,
                input,
                output,
                expression,
            } => {
                let node = ScriptNode::new(input, output, expression)?;
                named(node, name, ScriptNode::with_name).into()
            }
            NodeSpec::SplitSensors {
                name,
                input,
                sensors,
            } => {
                let node = SplitSensorsNode::new(input, sensors.iter().cloned())?;
                named(node, name, SplitSensorsNode::with_name).into()
            }
            NodeSpec::Decision {
                name,
                inputs,
                output,
                threshold,
            } => {
                let mut node = DecisionNode::new(inputs.iter().cloned(), output)?;
                if let Some(threshold) = threshold {
                    node = node.threshold(*threshold);
                }
                named(node, name, DecisionNode::with_name).into()
            }
        };
        Ok(node)
    }
}

fn named<N>(node: N, name: &Option<String>, with_name: fn(N, String) -> N) -> N {
    match name {
        Some(name) => with_name(node, name.clone()),
        None => node,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::PipelineError;
    use crate::pipeline::node::ProcessingNode;

    #[test]
    fn test_tagged_json() {
        let spec: NodeSpec = serde_json::from_str(
            r#"{"type": "moving_average", "input": "raw", "window": 5, "name": "Smooth"}"#,
        )
        .unwrap();
        assert_eq!(spec.kind(), NodeKind::MovingAverage);

        let node = spec.build().unwrap();
        assert_eq!(node.name(), "Smooth");
        assert_eq!(node.produces(), &["raw_ma5".to_string()]);
    }

    #[test]
    fn test_optional_fields_not_serialized() {
        let spec = NodeSpec::Normalize {
            name: None,
            input: "raw".into(),
            output: None,
            eps: None,
        };
        assert_eq!(
            serde_json::to_string(&spec).unwrap(),
            r#"{"type":"normalize","input":"raw"}"#
        );
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let spec = NodeSpec::ChunkRms {
            name: None,
            input: "raw".into(),
            output: "rms".into(),
            chunk_seconds: 0.0,
        };
        assert!(matches!(spec.build(), Err(PipelineError::InvalidNodeConfig { .. })));

        let spec = NodeSpec::Script {
            name: None,
            input: "raw".into(),
            output: "y".into(),
            expression: "value +".into(),
        };
        assert!(matches!(spec.build(), Err(PipelineError::InvalidNodeConfig { .. })));
    }

    #[test]
    fn test_spectrum_defaults() {
        let spec: NodeSpec =
            serde_json::from_str(r#"{"type": "spectrum", "input": "raw", "window": "blackman"}"#)
                .unwrap();
        let node = spec.build().unwrap();
        assert_eq!(node.produces(), &["raw_spectrum".to_string()]);
    }

    #[test]
    fn test_multi_sensor_specs() {
        let split: NodeSpec = serde_json::from_str(
            r#"{"type": "split_sensors", "input": "multi", "sensors": ["a", "b"]}"#,
        )
        .unwrap();
        assert_eq!(split.kind(), NodeKind::SplitSensors);
        assert_eq!(
            split.build().unwrap().produces(),
            &["a_raw".to_string(), "b_raw".to_string()]
        );

        let decision: NodeSpec = serde_json::from_str(
            r#"{"type": "decision", "inputs": ["a_raw", "b_raw"], "output": "alarm", "threshold": 0.9}"#,
        )
        .unwrap();
        let node = decision.build().unwrap();
        assert_eq!(node.name(), "Decision");
        assert_eq!(node.requires(), &["a_raw".to_string(), "b_raw".to_string()]);

        let empty: NodeSpec =
            serde_json::from_str(r#"{"type": "decision", "inputs": [], "output": "alarm"}"#).unwrap();
        assert!(matches!(empty.build(), Err(PipelineError::InvalidNodeConfig { .. })));
    }

    #[test]
    fn test_every_kind_has_description() {
        for kind in NodeKind::all() {
            assert!(!kind.description().is_empty());
            assert!(!kind.to_string().is_empty());
        }
    }
}
