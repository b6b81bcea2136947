use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use super::engine::OcrLine;

/// First run of digits and separators inside a word, ignoring currency
/// symbols or stray glyphs around it.
const PRICE_PATTERN: &str = r"\d[\d.,]*";

fn price_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PRICE_PATTERN).ok()).as_ref()
}

/// Parses a price out of one OCR word.
///
/// - `1,250` and `1.250.000` are read with thousands separators
/// - `12.5` and `1,250.75` keep their decimal part
/// - Leading or trailing noise such as `$`, `¥` or `x` is ignored
///
/// Returns `None` when the word holds no digits.
pub fn parse_price(text: &str) -> Option<f64> {
    let candidate = price_regex()?.find(text)?.as_str();
    let candidate = candidate.trim_end_matches(['.', ',']);

    let dots = candidate.matches('.').count();
    let normalized: String = if dots > 1 {
        // Several dots can only be grouping separators
        candidate.chars().filter(char::is_ascii_digit).collect()
    } else {
        candidate.chars().filter(|c| *c != ',').collect()
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Picks the price from the highest-confidence word that parses.
///
/// Ties keep the earliest word. Returns `None` if no word holds a number.
pub fn best_price(lines: &[OcrLine]) -> Option<f64> {
    let mut best: Option<(f32, f64)> = None;

    for line in lines {
        for word in &line.words {
            let Some(value) = parse_price(&word.text) else {
                continue;
            };
            if best.is_none_or(|(conf, _)| word.confidence > conf) {
                best = Some((word.confidence, value));
            }
        }
    }

    if let Some((conf, value)) = best {
        debug!("OCR price {} (conf: {:.0}%)", value, conf);
    }
    best.map(|(_, value)| value)
}
