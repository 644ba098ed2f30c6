//! Tick unit constants for chart labels and summaries
//!
//! Provides decimal (base-1000) unit constants used to shorten clock tick counts.
//! Both integer and floating-point variants are available for different use cases.

/// Thousand ticks
pub const KILO: u64 = 1000;

/// Million ticks (1,000 k)
pub const MEGA: u64 = KILO * 1000;

/// Billion ticks (1,000 M)
pub const GIGA: u64 = MEGA * 1000;

/// Trillion ticks (1,000 G)
pub const TERA: u64 = GIGA * 1000;

/// Thousand ticks as f64
pub const KILO_F64: f64 = 1000.0;

/// Million ticks as f64
pub const MEGA_F64: f64 = KILO_F64 * 1000.0;

/// Billion ticks as f64
pub const GIGA_F64: f64 = MEGA_F64 * 1000.0;

/// Trillion ticks as f64
pub const TERA_F64: f64 = GIGA_F64 * 1000.0;

/// Formats a tick count into a short label with a decimal unit suffix.
///
/// Values below ten units keep one decimal so that tightly clustered axis ticks
/// (e.g. `19.3G`, `19.4G`) stay distinguishable.
pub fn format_tick_count(ticks: f64) -> String {
    let abs_ticks = ticks.abs();

    let (scaled, suffix) = if abs_ticks >= TERA_F64 {
        (ticks / TERA_F64, "T")
    } else if abs_ticks >= GIGA_F64 {
        (ticks / GIGA_F64, "G")
    } else if abs_ticks >= MEGA_F64 {
        (ticks / MEGA_F64, "M")
    } else if abs_ticks >= KILO_F64 {
        (ticks / KILO_F64, "k")
    } else {
        (ticks, "")
    };

    if scaled.abs() < 10.0 && scaled.fract().abs() > 1e-9 {
        format!("{:.1}{}", scaled, suffix)
    } else {
        format!("{:.0}{}", scaled.round(), suffix)
    }
}
