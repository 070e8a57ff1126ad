// Value transforms between the IOTAS API (°F, 0.0–1.0 levels) and the
// host (°C, 0–100 percentages).

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Remote level (0.0–1.0) to host percentage.
pub fn level_to_percent(level: f64) -> f64 {
    level * 100.0
}

/// Host percentage to remote level (0.0–1.0).
pub fn percent_to_level(percent: f64) -> f64 {
    percent / 100.0
}

/// Remote on/off values are numeric; anything above zero is on.
pub fn is_on(value: f64) -> bool {
    value > 0.0
}

pub fn on_value(on: bool) -> f64 {
    if on { 1.0 } else { 0.0 }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn temperature_conversion() {
        assert_eq!(fahrenheit_to_celsius(212.0), 100.0);
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert!((fahrenheit_to_celsius(celsius_to_fahrenheit(21.5)) - 21.5).abs() < 1e-9);
    }

    #[test]
    fn level_conversion() {
        assert!((level_to_percent(0.4) - 40.0).abs() < 1e-9);
        assert_eq!(percent_to_level(40.0), 0.4);
        assert!(is_on(0.01));
        assert!(!is_on(0.0));
    }
}
