//! Native functions installed into globals before the first `interpret`
//! call.

use crate::value::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// `clock()`: seconds elapsed since the Unix epoch, as a float. Matches
/// Crafting Interpreters' canonical example native function.
pub fn clock(_args: &[Value]) -> Result<Value, String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| "system clock is before the Unix epoch".to_string())?;
    Ok(Value::Number(now.as_secs_f64()))
}
