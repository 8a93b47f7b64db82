//! Interval-to-wall-clock timestamp formatting shared by every output
//! projection that reports simulation times.

/// `interval -> simu_start_minute * 60 + tau * simu_res`, formatted as
/// `HH:MM:SS.sss`.
pub fn format_interval(interval: u32, start_minute: f64, resolution_in_second: u32) -> String {
    let total_seconds = start_minute * 60.0 + interval as f64 * resolution_in_second as f64;
    format_seconds(total_seconds)
}

pub fn format_seconds(total_seconds: f64) -> String {
    let total_seconds = total_seconds.max(0.0);
    let hours = (total_seconds / 3600.0).floor() as u64;
    let remainder = total_seconds - (hours as f64) * 3600.0;
    let minutes = (remainder / 60.0).floor() as u64;
    let seconds = remainder - (minutes as f64) * 60.0;
    format!("{hours:02}:{minutes:02}:{seconds:06.3}")
}
