//! Utility functions for writing numbers into text tables

/// Format a number for a table cell, rounding away representation noise such as
/// `16.700000000000003`
pub(crate) fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return format!("{}", value);
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && (magnitude < 1e-4 || magnitude >= 1e9) {
        return format!("{:e}", significant(value, 9));
    }
    let rounded = (value * 1e9).round() / 1e9;
    if rounded == 0.0 {
        // Avoid writing negative zero
        return "0".to_string();
    }
    format!("{}", rounded)
}

/// Round a value to `digits` significant digits
fn significant(value: f64, digits: i32) -> f64 {
    let exponent = value.abs().log10().floor() as i32;
    let scale = 10f64.powi(digits - 1 - exponent);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_numbers() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-16.700000000000003), "-16.7");
        assert_eq!(format_number(0.001), "0.001");
        assert_eq!(format_number(40000.0), "40000");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn small_numbers() {
        let text = format_number(2.5e-7);
        assert!((text.parse::<f64>().unwrap() - 2.5e-7).abs() < 1e-16);
        assert!(text.contains('e'));
    }
}
