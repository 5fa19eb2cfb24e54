//! Number formatting for terminal output

/// Inserts `,` between groups of three digits in an unsigned integer string
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats `value` with `decimals` places and thousands separators
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let sign = if value < 0.0 && formatted.chars().any(|c| matches!(c, '1'..='9')) {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, group_thousands(int_part), frac),
        None => format!("{}{}", sign, group_thousands(int_part)),
    }
}

/// Dollar amount: two decimals from $1 up, up to six below
pub fn format_usd(value: f64) -> String {
    if value.abs() >= 1.0 || value == 0.0 {
        return format!("${}", format_number(value, 2));
    }

    let formatted = format!("{:.6}", value.abs());
    let trimmed = formatted.trim_end_matches('0');
    // Keep at least cents
    let decimals = trimmed.split_once('.').map_or(0, |(_, frac)| frac.len());
    let body = if decimals < 2 {
        format!("{:.2}", value.abs())
    } else {
        trimmed.to_string()
    };
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}", sign, body)
}

/// Optional dollar amount, `n/a` when absent
pub fn format_usd_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), format_usd)
}

/// Whole-dollar amount in millions, e.g. `$30,512M`
pub fn format_millions(value: f64) -> String {
    format!("${}M", format_number(value / 1_000_000.0, 0))
}

/// Optional amount in millions, `n/a` when absent
pub fn format_millions_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), format_millions)
}

/// 24h change with a direction arrow, e.g. `▲ 2.50%`
pub fn format_change(percent: Option<f64>) -> String {
    match percent {
        Some(p) if p >= 0.0 => format!("▲ {:.2}%", p),
        Some(p) => format!("▼ {:.2}%", p.abs()),
        None => "n/a".to_string(),
    }
}

/// Token supply; `∞` when the asset has no cap
pub fn format_supply(supply: Option<f64>) -> String {
    match supply {
        Some(s) if s > 0.0 => format_number(s, 0),
        _ => "∞".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1"), "1");
        assert_eq!(group_thousands("123"), "123");
        assert_eq!(group_thousands("1234"), "1,234");
        assert_eq!(group_thousands("1234567"), "1,234,567");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(65000.5, 2), "65,000.50");
        assert_eq!(format_number(-1234.0, 0), "-1,234");
        assert_eq!(format_number(-0.001, 2), "0.00");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(65000.5), "$65,000.50");
        assert_eq!(format_usd(1.0), "$1.00");
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(0.15), "$0.15");
        assert_eq!(format_usd(0.5), "$0.50");
        assert_eq!(format_usd(0.000012), "$0.000012");
        assert_eq!(format_usd(-0.25), "-$0.25");
    }

    #[test]
    fn test_format_millions() {
        assert_eq!(format_millions(30_512_345_678.0), "$30,512M");
        assert_eq!(format_millions(400_000.0), "$0M");
        assert_eq!(format_millions_opt(Some(2_000_000.0)), "$2M");
        assert_eq!(format_millions_opt(None), "n/a");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(Some(2.5)), "▲ 2.50%");
        assert_eq!(format_change(Some(-1.254)), "▼ 1.25%");
        assert_eq!(format_change(None), "n/a");
    }

    #[test]
    fn test_format_supply() {
        assert_eq!(format_supply(Some(21_000_000.0)), "21,000,000");
        assert_eq!(format_supply(None), "∞");
    }
}
