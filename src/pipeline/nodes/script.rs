use super::single;
use crate::pipeline::error::{NodeError, NodeResult, PipelineError, PipelineResult};
use crate::pipeline::node::{input, BlockMap, NodeSignature, ProcessingNode};
use crate::scripting::{CompiledExpression, SampleContext, ScriptEngine};
use rhai::Scope;
use std::sync::Arc;

/// Applies a Rhai expression to every sample of a block.
///
/// The expression is compiled at construction; evaluation failures are
/// reported per block.
pub struct ScriptNode {
    sig: NodeSignature,
    engine: ScriptEngine,
    expr: CompiledExpression,
}

impl ScriptNode {
    pub fn new(
        input: impl Into<String>,
        output: impl Into<String>,
        expression: &str,
    ) -> PipelineResult<Self> {
        let engine = ScriptEngine::new();
        let expr = engine
            .compile(expression)
            .map_err(|e| PipelineError::invalid_config("Script", e.to_string()))?;
        Ok(Self {
            sig: NodeSignature::new("Script", vec![input.into()], vec![output.into()]),
            engine,
            expr,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.sig.name = name.into();
        self
    }

    pub fn expression(&self) -> &str {
        self.expr.source()
    }
}

impl ProcessingNode for ScriptNode {
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
        let width = block.frame_width().max(1);
        let rate = block.sample_rate();
        let mut scope = Scope::new();

        let values = block
            .values()
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let index = i / width;
                let sample = SampleContext {
                    value,
                    t: index as f64 / rate,
                    index,
                    channel: i % width,
                };
                self.engine
                    .eval_sample(&self.expr, &mut scope, sample)
                    .map_err(|e| NodeError::Failed(anyhow::Error::new(e).context(format!("sample {i}"))))
            })
            .collect::<NodeResult<Vec<f64>>>()?;

        let values = block.values().with_frame_data(values)?;
        let out = block.copy_with(Some(values), None)?;
        Ok(single(self.sig.output(), Arc::new(out)))
    }
}
