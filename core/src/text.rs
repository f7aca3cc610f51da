use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref DURATION_RE: Regex = Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*hours?").expect("valid regex");
    static ref NUMBER_RE: Regex = Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid regex");
    static ref DIGIT_GROUP_RE: Regex = Regex::new(r"\d(?:[\d,]*\d)?").expect("valid regex");
}

/// Case-fold text for substring matching: NFKC normalization, then lowercase.
pub fn fold(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// `needle` must already be folded.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    fold(haystack).contains(needle)
}

/// Numeric value of a formatted price: every ASCII digit concatenated, parsed
/// as an integer. No digits, or an overflowing run of digits, yields 0.
pub fn parse_price_value(price: &str) -> u64 {
    let digits: String = price.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Hours from strings like "2 hours", "1.5 Hours", "Half day (4 hours)".
/// Anything without a "<n> hour(s)" phrase parses to 0.
pub fn parse_duration_hours(duration: &str) -> f64 {
    DURATION_RE
        .captures(duration)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// First number in the string, thousands separators allowed ("1,200 sq ft").
pub fn parse_leading_number(text: &str) -> Option<f64> {
    let m = NUMBER_RE.find(text)?;
    m.as_str().replace(',', "").parse().ok()
}

/// Byte range of the only comma-grouped digit run in `price`. `None` when
/// there is no run or more than one ("¥3,000 for 2 people").
pub fn single_digit_group(price: &str) -> Option<Range<usize>> {
    let mut groups = DIGIT_GROUP_RE.find_iter(price);
    let only = groups.next()?;
    if groups.next().is_some() {
        return None;
    }
    Some(only.range())
}

/// 1234567 -> "1,234,567"
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_width_and_case() {
        assert_eq!(fold("ＫＹＯＴＯ Tea"), "kyoto tea");
    }

    #[test]
    fn price_digits() {
        assert_eq!(parse_price_value("¥8,500"), 8500);
        assert_eq!(parse_price_value("¥120,000/month"), 120_000);
        assert_eq!(parse_price_value("Contact for pricing"), 0);
        assert_eq!(parse_price_value("99999999999999999999999"), 0);
    }

    #[test]
    fn digit_groups() {
        assert_eq!(single_digit_group("¥220,000/month"), Some(2..9));
        assert_eq!(single_digit_group("¥3,000 for 2 people"), None);
        assert_eq!(single_digit_group("Price on request"), None);
    }

    #[test]
    fn duration_hours() {
        assert_eq!(parse_duration_hours("2 hours"), 2.0);
        assert_eq!(parse_duration_hours("1.5 HOURS"), 1.5);
        assert_eq!(parse_duration_hours("1 hour"), 1.0);
        assert_eq!(parse_duration_hours("Half day (4hours)"), 4.0);
        assert_eq!(parse_duration_hours("varies"), 0.0);
        assert_eq!(parse_duration_hours("45 minutes"), 0.0);
    }

    #[test]
    fn leading_number() {
        assert_eq!(parse_leading_number("85 m²"), Some(85.0));
        assert_eq!(parse_leading_number("1,200 sq ft"), Some(1200.0));
        assert_eq!(parse_leading_number("ask agent"), None);
    }

    #[test]
    fn thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(950), "950");
        assert_eq!(format_thousands(8500), "8,500");
        assert_eq!(format_thousands(45_000_000), "45,000,000");
    }
}
