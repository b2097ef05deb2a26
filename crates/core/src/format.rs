/// Unit family for [`signify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Money,
    Bytes,
}

impl Unit {
    fn suffixes(&self) -> [&'static str; 5] {
        match self {
            Unit::Money => ["", "k", "M", "B", "T"],
            Unit::Bytes => [" bytes", "kB", "MB", "GB", "TB"],
        }
    }
}

/// Human-readable magnitude with one decimal, e.g. `$1.5M` or `2.0kB`.
/// The largest suffix is T/TB; anything bigger stays in that unit.
#[must_use]
pub fn signify(value: f64, unit: Unit) -> String {
    let suffixes = unit.suffixes();
    let magnitude = if value == 0.0 || !value.is_finite() {
        0
    } else {
        (value.abs().log10() / 3.0).floor() as i64
    };
    let idx = magnitude.clamp(0, suffixes.len() as i64 - 1) as usize;
    let scaled = value / 10f64.powi(3 * idx as i32);
    let prefix = if unit == Unit::Money { "$" } else { "" };
    format!("{prefix}{scaled:.1}{}", suffixes[idx])
}
