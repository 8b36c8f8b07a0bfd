//! Magnitude and duration formatting for decorators.
//!
//! Counter and throughput decorators keep a stable 4-6 character field by
//! scaling values into the nearest unit and switching between one-decimal
//! and integer renderings at 10.0. Binary units divide by 1024, decimal
//! units by 1000.

use std::time::Duration;

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;
const TIB: f64 = GIB * 1024.0;

const KB: f64 = 1000.0;
const MB: f64 = KB * 1000.0;
const GB: f64 = MB * 1000.0;
const TB: f64 = GB * 1000.0;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Unit family used by counter and throughput decorators.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Units {
    /// Plain integer, no scaling.
    #[default]
    None,
    /// Kibibytes: `1 KiB = 1024 b`, suffixes `b  `/`KiB`/`MiB`/`GiB`/`TiB`.
    KiB,
    /// Kilobytes: `1 KB = 1000 b`, suffixes `b `/`KB`/`MB`/`GB`/`TB`.
    KB,
    /// Plain decimal scaling with single-letter suffixes `K`/`M`/`G`/`T`.
    K,
}

/// Formats an integer count in the given unit family.
pub fn format_count(n: i64, unit: Units) -> String {
    match unit {
        Units::None => n.to_string(),
        _ => format_rate(n as f64, unit),
    }
}

/// Formats a (possibly fractional) value, typically a per-second rate.
pub fn format_rate(n: f64, unit: Units) -> String {
    match unit {
        Units::None => format!("{n:.2}"),
        Units::KiB => {
            let (f, ext) = scale(n, &[(TIB, "TiB"), (GIB, "GiB"), (MIB, "MiB"), (KIB, "KiB")], "b  ");
            narrow(f, ext)
        }
        Units::KB => {
            let (f, ext) = scale(n, &[(TB, "TB"), (GB, "GB"), (MB, "MB"), (KB, "KB")], "b ");
            narrow(f, ext)
        }
        Units::K => {
            let (f, ext) = scale(n, &[(TB, "T"), (GB, "G"), (MB, "M"), (KB, "K")], " ");
            narrow(f, ext)
        }
    }
}

fn scale(n: f64, thresholds: &[(f64, &'static str)], base: &'static str) -> (f64, &'static str) {
    for &(unit, ext) in thresholds {
        if n >= unit {
            return (n / unit, ext);
        }
    }
    (n, base)
}

/// `9.9KiB` below ten units, ` 10KiB` at and above. The branch tests the
/// rounded value so that 9.96 lands in the integer branch instead of being
/// printed as the five-character `"10.0KiB"`.
fn narrow(f: f64, ext: &str) -> String {
    let rounded = round_unit(f, 0.1);
    if rounded >= 10.0 {
        format!("{:3}{}", rounded as i64, ext)
    } else {
        format!("{f:.1}{ext}")
    }
}

/// Rounds half-up to a multiple of `unit`, e.g. `round_unit(x, 0.1)`.
pub(crate) fn round_unit(x: f64, unit: f64) -> f64 {
    ((x / unit + 0.5) as i64) as f64 * unit
}

/// Rounds a duration half-up to a multiple of `unit`.
pub(crate) fn round_duration(d: Duration, unit: Duration) -> Duration {
    let u = unit.as_nanos();
    if u == 0 {
        return d;
    }
    let rounded = (d.as_nanos() + u / 2) / u * u;
    Duration::from_nanos(rounded.min(u64::MAX as u128) as u64)
}

/// Renders a duration in the composed `1h2m3s` style, down to 100 ms.
pub(crate) fn duration_string(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }
    let total = d.as_secs();
    let millis = d.subsec_millis();
    if total == 0 {
        return format!("{millis}ms");
    }
    let (h, m, s) = (total / 3600, total % 3600 / 60, total % 60);
    let secs = if millis > 0 {
        format!("{s}.{}s", millis / 100)
    } else {
        format!("{s}s")
    };
    if h > 0 {
        format!("{h}h{m}m{secs}")
    } else if m > 0 {
        format!("{m}m{secs}")
    } else {
        secs
    }
}

/// Short rendering for elapsed times, coarser the longer the duration.
pub(crate) fn small_duration_string(d: Duration) -> String {
    if d > 13 * WEEK {
        ">13w".to_string()
    } else if d > WEEK {
        let hours = round_duration(d, HOUR).as_secs() / 3600;
        let days = hours / 24;
        let (weeks, days) = (days / 7, days % 7);
        if days > 0 {
            format!("{weeks}w{days}d")
        } else {
            format!("{weeks}w")
        }
    } else if d > DAY {
        let hours = round_duration(d, HOUR).as_secs() / 3600;
        let (days, hours) = (hours / 24, hours % 24);
        if hours > 0 {
            format!("{days}d{hours}h")
        } else {
            format!("{days}d")
        }
    } else if d > 8 * HOUR {
        duration_string(round_duration(d, HOUR))
    } else if d > 8 * MINUTE {
        duration_string(round_duration(d, MINUTE))
    } else if d > 8 * Duration::from_secs(1) {
        duration_string(round_duration(d, Duration::from_secs(1)))
    } else {
        duration_string(round_duration(d, Duration::from_millis(100)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_kib_family() {
        assert_eq!(format_count(0, Units::KiB), "0.0b  ");
        assert_eq!(format_count(999, Units::KiB), "999b  ");
        assert_eq!(format_count(1024, Units::KiB), "1.0KiB");
        assert_eq!(format_count(10 * 1024, Units::KiB), " 10KiB");
        assert_eq!(format_count(3 * 1024 * 1024, Units::KiB), "3.0MiB");
        assert_eq!(format_count(1024 * 1024 * 1024 * 1024, Units::KiB), "1.0TiB");
    }

    #[test]
    fn count_kb_family() {
        assert_eq!(format_count(999, Units::KB), "999b ");
        assert_eq!(format_count(1_500_000, Units::KB), "1.5MB");
        assert_eq!(format_count(22_000, Units::KB), " 22KB");
    }

    #[test]
    fn count_plain_k_family() {
        // 999.5 rounds to itself at 0.1 resolution and truncates to 999.
        assert_eq!(format_count(999_500, Units::K), "999K");
        assert_eq!(format_count(1200, Units::K), "1.2K");
        assert_eq!(format_count(42, Units::K), " 42 ");
        assert_eq!(format_count(7, Units::None), "7");
    }

    #[test]
    fn near_ten_uses_integer_branch() {
        // 9.96 units rounds to 10.0, which must print as " 10", never "10.0".
        let s = format_rate(1024.0 * 9.96, Units::KiB);
        assert_eq!(s, " 10KiB");
        // Just below the rounding threshold stays fractional.
        assert_eq!(format_rate(1024.0 * 9.9, Units::KiB), "9.9KiB");
    }

    #[test]
    fn formatting_is_monotonic_within_bucket() {
        let printed = |n: i64| -> f64 {
            let s = format_count(n, Units::KiB);
            s.trim_end_matches("KiB").trim().parse().unwrap()
        };
        let mut last = 0.0;
        for n in [1024, 2048, 5 * 1024, 100 * 1024, 1000 * 1024] {
            let v = printed(n);
            assert!(v >= last, "{v} < {last}");
            last = v;
        }
    }

    #[test]
    fn rate_none_is_two_decimals() {
        assert_eq!(format_rate(12.5, Units::None), "12.50");
    }

    #[test]
    fn round_unit_half_up() {
        assert_eq!(round_unit(9.96, 0.1), 10.0);
        assert_eq!(round_unit(999.5, 1.0), 1000.0);
        assert_eq!(round_unit(2.44, 0.1), 2.4);
    }

    #[test]
    fn duration_strings() {
        assert_eq!(duration_string(Duration::ZERO), "0s");
        assert_eq!(duration_string(Duration::from_millis(900)), "900ms");
        assert_eq!(duration_string(Duration::from_millis(1500)), "1.5s");
        assert_eq!(duration_string(Duration::from_secs(5)), "5s");
        assert_eq!(duration_string(Duration::from_secs(65)), "1m5s");
        assert_eq!(duration_string(Duration::from_secs(3661)), "1h1m1s");
    }

    #[test]
    fn small_duration_buckets() {
        assert_eq!(small_duration_string(Duration::from_secs(5)), "5s");
        assert_eq!(small_duration_string(Duration::from_secs(90)), "1m30s");
        assert_eq!(small_duration_string(Duration::from_secs(600)), "10m0s");
        assert_eq!(small_duration_string(Duration::from_secs(9 * 3600)), "9h0m0s");
        assert_eq!(small_duration_string(Duration::from_secs(30 * 3600)), "1d6h");
        assert_eq!(small_duration_string(Duration::from_secs(8 * 24 * 3600)), "1w1d");
        assert_eq!(
            small_duration_string(Duration::from_secs(15 * 7 * 24 * 3600)),
            ">13w"
        );
    }
}
