//! Human-readable sizes and transfer rates

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count using 1024 steps and two decimals (`"12.34 MB"`)
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

/// Bytes per second expressed in MiB/s
pub fn megabytes_per_second(bytes_per_second: f64) -> f64 {
    bytes_per_second / 1_048_576.0
}

/// Format a transfer rate as `"3.21 MB/s"`
pub fn format_rate(bytes_per_second: f64) -> String {
    format!("{:.2} MB/s", megabytes_per_second(bytes_per_second))
}
