//! Human-readable byte sizes and elapsed times for study log messages.

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with binary (1024) steps and two decimals.
///
/// Values beyond the terabyte range stay in TB.
///
/// ```rust
/// use aipim::format::format_size;
///
/// assert_eq!(format_size(500), "500.00 B");
/// assert_eq!(format_size(2048), "2.00 KB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in SIZE_UNITS {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    // `size` has been divided once past TB
    format!("{:.2} TB", size * 1024.0)
}

/// Format an elapsed wall-clock time given in seconds.
///
/// | range        | output             |
/// |--------------|--------------------|
/// | < 1 ms       | `12.34 µs`         |
/// | < 1 s        | `12.34 ms`         |
/// | < 60 s       | `12.34 s`          |
/// | < 1 h        | `1 min 30.2 s`     |
/// | otherwise    | `2 h 3 min 4 s`    |
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_execution_time(seconds: f64) -> String {
    if seconds < 1e-3 {
        format!("{:.2} µs", seconds * 1e6)
    } else if seconds < 1.0 {
        format!("{:.2} ms", seconds * 1e3)
    } else if seconds < 60.0 {
        format!("{seconds:.2} s")
    } else if seconds < 3600.0 {
        let mins = (seconds / 60.0).floor() as u64;
        let secs = seconds % 60.0;
        format!("{mins} min {secs:.1} s")
    } else {
        let hours = (seconds / 3600.0).floor() as u64;
        let mins = ((seconds % 3600.0) / 60.0).floor() as u64;
        let secs = seconds % 60.0;
        format!("{hours} h {mins} min {secs:.0} s")
    }
}
