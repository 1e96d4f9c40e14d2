//! Rhai expressions evaluated once per sample.
//!
//! ## Variables
//!
//! - `value` - the current sample
//! - `t` - seconds since the start of the block
//! - `index` - frame index within the block
//! - `channel` - channel index within the frame
//!
//! ## Helper Functions
//!
//! - `clamp(value, lo, hi)` - limit to a range
//! - `deadband(value, center, width)` - snap values near `center` to `center`
//! - `db(value)` - `20 * log10(|value|)`, floored at -200
//!
//! ## Example Expressions
//!
//! Converting 12-bit ADC counts to volts:
//! ```rhai
//! value * 3.3 / 4095.0
//! ```
//!
//! Adding a 1 Hz test tone:
//! ```rhai
//! value + sin(t * 2.0 * PI())
//! ```

mod engine;

pub use engine::{CompiledExpression, SampleContext, ScriptEngine};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Compilation error: {0}")]
    Compile(String),

    #[error("Evaluation error: {0}")]
    Eval(String),

    #[error("Expression returned {0}, expected a number")]
    NonNumeric(String),
}

/// Common expressions, usable from configuration files.
pub mod builtins {
    /// Pass-through
    pub const IDENTITY: &str = "value";

    /// 12-bit ADC counts to volts, 3.3 V reference
    pub const ADC_TO_VOLTAGE_3V3: &str = "value * 3.3 / 4095.0";

    /// Magnitude in decibels
    pub const DECIBELS: &str = "db(value)";

    /// Values within ±0.5 of zero become zero
    pub const DEADBAND_ZERO: &str = "deadband(value, 0.0, 1.0)";

    /// Absolute value clipped to one
    pub const RECTIFY_CLIP: &str = "clamp(abs(value), 0.0, 1.0)";

    pub fn all() -> Vec<(&'static str, &'static str)> {
        vec![
            ("Identity", IDENTITY),
            ("ADC to Voltage (3.3V)", ADC_TO_VOLTAGE_3V3),
            ("Decibels", DECIBELS),
            ("Deadband (±0.5)", DEADBAND_ZERO),
            ("Rectify and Clip", RECTIFY_CLIP),
        ]
    }
}
