//! Rhai engine configured for per-sample expressions.

use super::ScriptError;
use rhai::{Dynamic, Engine, Scope, AST};

/// Per-sample inputs exposed to an expression.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleContext {
    pub value: f64,
    pub t: f64,
    pub index: usize,
    pub channel: usize,
}

/// A compiled expression together with its source text.
#[derive(Clone)]
pub struct CompiledExpression {
    ast: AST,
    source: String,
}

impl CompiledExpression {
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .finish()
    }
}

/// Sandboxed Rhai engine with the sample helpers registered.
pub struct ScriptEngine {
    engine: Engine,
}

impl ScriptEngine {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine);
        Self { engine }
    }

    fn configure_engine(engine: &mut Engine) {
        // Safety limits
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(32);
        engine.set_max_operations(10_000);
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(1_000);
        engine.set_max_map_size(1_000);

        engine.register_fn("clamp", |value: f64, lo: f64, hi: f64| -> f64 {
            value.max(lo).min(hi)
        });

        engine.register_fn("deadband", |value: f64, center: f64, width: f64| -> f64 {
            if (value - center).abs() <= width / 2.0 {
                center
            } else {
                value
            }
        });

        engine.register_fn("db", |value: f64| -> f64 {
            let mag = value.abs();
            if mag > 1e-10 {
                20.0 * mag.log10()
            } else {
                -200.0
            }
        });
    }

    /// Compile `source`, failing on syntax errors.
    pub fn compile(&self, source: &str) -> Result<CompiledExpression, ScriptError> {
        let ast = self
            .engine
            .compile(source)
            .map_err(|e| ScriptError::Compile(e.to_string()))?;
        Ok(CompiledExpression {
            ast,
            source: source.to_string(),
        })
    }

    /// Evaluate `expr` for one sample. Integer results are widened to `f64`.
    pub fn eval_sample(
        &self,
        expr: &CompiledExpression,
        scope: &mut Scope,
        sample: SampleContext,
    ) -> Result<f64, ScriptError> {
        scope.clear();
        scope.push("value", sample.value);
        scope.push("t", sample.t);
        scope.push("index", sample.index as i64);
        scope.push("channel", sample.channel as i64);

        let result: Dynamic = self
            .engine
            .eval_ast_with_scope(scope, &expr.ast)
            .map_err(|e| ScriptError::Eval(e.to_string()))?;

        if let Ok(v) = result.as_float() {
            Ok(v)
        } else if let Ok(v) = result.as_int() {
            Ok(v as f64)
        } else {
            Err(ScriptError::NonNumeric(result.type_name().to_string()))
        }
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}
