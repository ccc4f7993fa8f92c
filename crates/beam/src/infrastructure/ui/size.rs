//! Human-readable byte counts.
//!
//! Uses decimal units and switches unit late, so small values keep their
//! precision: anything below 100 of a unit is shown in the next smaller one.

/// Formats `bytes` as `"N B"`, `"x.xx KB"`, `"x.xx MB"`, or `"x.xx GB"`.
pub fn human_size(bytes: u64) -> String {
    const KB: f64 = 1_000.0;
    const MB: f64 = 1_000_000.0;
    const GB: f64 = 1_000_000_000.0;

    let b = bytes as f64;
    if bytes < 100 {
        format!("{bytes} B")
    } else if bytes < 100_000 {
        format!("{:.2} KB", b / KB)
    } else if bytes < 100_000_000 {
        format!("{:.2} MB", b / MB)
    } else {
        format!("{:.2} GB", b / GB)
    }
}
