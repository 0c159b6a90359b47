//! Number formatting shared by the chart labels and the report rows.

/// Formats an amount as dollars with thousands separators, e.g.
/// `currency(1234.5, 2) == "$1,234.50"`.
pub fn currency(value: f64, decimals: usize) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}", sign, grouped(value.abs(), decimals))
}

/// Formats a share of 1.0 as a percentage with one decimal, e.g. `"12.5%"`.
pub fn percent(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

/// Formats a quantity without a fractional part when it has none.
pub fn quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        grouped(value, 0)
    } else {
        grouped(value, 2)
    }
}

fn grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value);
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let digits: Vec<char> = integer.chars().collect();
    let mut out = String::with_capacity(formatted.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*digit);
    }

    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(currency(1234567.891, 2), "$1,234,567.89");
        assert_eq!(currency(999.0, 2), "$999.00");
        assert_eq!(currency(1003.0, 0), "$1,003");
        assert_eq!(currency(-25.5, 2), "-$25.50");
        assert_eq!(currency(0.0, 2), "$0.00");
    }

    #[test]
    fn percent_and_quantity() {
        assert_eq!(percent(0.125), "12.5%");
        assert_eq!(percent(1.0), "100.0%");
        assert_eq!(quantity(12.0), "12");
        assert_eq!(quantity(1500.0), "1,500");
        assert_eq!(quantity(2.5), "2.50");
    }
}
