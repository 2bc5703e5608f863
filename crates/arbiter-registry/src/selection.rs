//! Choosing among several `active` versions outside an experiment.

use arbiter_core::config::RolloutSelection;
use arbiter_core::models::Version;

/// Pick from `active`, which must be ordered highest rollout first and
/// newest first on ties. `u` is a uniform draw in `[0, 1)`, used only by
/// weighted selection.
pub fn select(active: &[Version], mode: RolloutSelection, u: f64) -> Option<&Version> {
    match mode {
        RolloutSelection::Highest => active.first(),
        RolloutSelection::Weighted => weighted(active, u),
    }
}

/// Weighted choice by rollout percentage. When every weight is zero the
/// highest-ranked version is returned.
fn weighted(active: &[Version], u: f64) -> Option<&Version> {
    let total: u32 = active.iter().map(|v| u32::from(v.rollout_percentage)).sum();
    if total == 0 {
        return active.first();
    }
    let target = u.clamp(0.0, 1.0) * f64::from(total);
    let mut cumulative = 0.0;
    for version in active {
        cumulative += f64::from(version.rollout_percentage);
        if target < cumulative {
            return Some(version);
        }
    }
    active.iter().rev().find(|v| v.rollout_percentage > 0)
}
