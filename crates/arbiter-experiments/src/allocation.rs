//! Memoryless arm assignment.
//!
//! Every call draws independently, so one end user may see both arms
//! across consecutive decisions.

use arbiter_core::constants::MAX_PERCENT;
use arbiter_core::models::Arm;

/// Assign an arm from a uniform draw `u` in `[0, 1)`. The test arm is
/// chosen with probability `traffic_split / 100`.
pub fn draw(traffic_split: u8, u: f64) -> Arm {
    let split = f64::from(traffic_split.min(MAX_PERCENT)) / 100.0;
    if u < split {
        Arm::Test
    } else {
        Arm::Control
    }
}
