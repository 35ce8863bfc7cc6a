//! Capability probe
//!
//! Reduces the backend's capability report to the tier and pattern dialect
//! the rest of the engine branches on. Both are resolved once per session.

use crate::backend::Capabilities;
use haptics_common::events::{CapabilityTier, PatternDialect};

/// Resolve the capability tier from a backend report
pub fn resolve_tier(caps: &Capabilities) -> CapabilityTier {
    if !caps.hardware_haptics {
        CapabilityTier::None
    } else if caps.amplitude_control == Some(false) {
        CapabilityTier::Coarse
    } else if caps.predefined_effects {
        CapabilityTier::Full
    } else {
        CapabilityTier::Amplitude
    }
}

/// Resolve which external pattern dialect to parse with
pub fn resolve_dialect(caps: &Capabilities) -> PatternDialect {
    if caps.native_pattern_parsing {
        PatternDialect::Native
    } else {
        PatternDialect::Legacy
    }
}

/// True only with hardware haptics and, where the platform distinguishes
/// it, amplitude control
pub fn supports_custom_haptics(caps: &Capabilities) -> bool {
    caps.hardware_haptics && caps.amplitude_control != Some(false)
}
