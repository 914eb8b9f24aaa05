/// Human-readable byte counts for logs and the command-line summary.
///
/// Sizes are `u64` bytes everywhere else; floating point only appears here.

const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Format a byte count with binary (1024) steps and two decimals,
/// e.g. `1.50 KB`. Zero is `0 B`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Progress line `processed / total (NN%)`. An unknown (zero) total shows
/// only the processed amount.
pub fn format_progress(processed: u64, total: u64) -> String {
    if total == 0 {
        return format!("{} scanned", format_bytes(processed));
    }
    let percent = (processed as f64 / total as f64 * 100.0).min(100.0);
    format!(
        "{} / {} ({percent:.0}%)",
        format_bytes(processed),
        format_bytes(total)
    )
}
