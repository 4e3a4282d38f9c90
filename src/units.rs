//! Unit conversion and display formatting.

/// Multiply m/s by this to get km/h.
pub const MS_TO_KMH: f64 = 3.6;

/// Milliseconds in one hour.
pub const MS_PER_HOUR: f64 = 3_600_000.0;

#[inline]
pub fn ms_to_kmh(speed_ms: f64) -> f64 {
    speed_ms * MS_TO_KMH
}

#[inline]
pub fn kmh_to_ms(speed_kmh: f64) -> f64 {
    speed_kmh / MS_TO_KMH
}

/// "850 m" below one kilometer, "3.42 km" above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.0} m", meters)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

/// Speed given in m/s, shown as km/h or m/s with one decimal.
pub fn format_speed(speed_ms: f64, as_kmh: bool) -> String {
    if as_kmh {
        format!("{:.1} km/h", ms_to_kmh(speed_ms))
    } else {
        format!("{:.1} m/s", speed_ms)
    }
}

/// "1h 02m 05s", "2m 05s" or "45s".
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
