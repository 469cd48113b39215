//! Text helpers shared by display and length estimation.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static RE_MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<]+?>").unwrap());
static RE_RTL_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{0600}-\u{06FF}]").unwrap());

/// Number of leading characters sampled when classifying directionality.
const RTL_SAMPLE_CHARS: usize = 500;
/// Fraction of Arabic-block characters above which text counts as RTL.
const RTL_THRESHOLD: f64 = 0.4;

/// Strip markup from an HTML document, leaving readable plain text.
///
/// Uses a very large width so no hard line breaks get baked in; the caller
/// handles wrapping. Falls back to a regex tag strip if `html2text` rejects
/// the input, so malformed chapters still yield something readable.
pub fn strip_markup(html: &str) -> String {
    match html2text::from_read(html.as_bytes(), 10_000) {
        Ok(clean) => clean,
        Err(err) => {
            warn!("html2text failed, stripping tags naively: {err}");
            RE_MARKUP_TAG.replace_all(html, "").into_owned()
        }
    }
}

/// Detect predominantly right-to-left text (Arabic/Persian block).
///
/// Inspects the first few hundred characters after stripping any markup, so
/// it works on both raw chapter HTML and cleaned text.
pub fn is_rtl(text: &str) -> bool {
    let clean = RE_MARKUP_TAG.replace_all(text, "");
    let sample: String = clean.chars().take(RTL_SAMPLE_CHARS).collect();
    if sample.is_empty() {
        return false;
    }
    let rtl_chars = RE_RTL_CHAR.find_iter(&sample).count();
    rtl_chars as f64 / sample.chars().count() as f64 > RTL_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_prose() {
        let text = strip_markup("<html><body><p>Hello <b>world</b></p></body></html>");
        assert!(text.contains("Hello world"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn latin_text_is_not_rtl() {
        assert!(!is_rtl("The quick brown fox jumps over the lazy dog."));
    }

    #[test]
    fn persian_text_is_rtl_even_inside_markup() {
        assert!(is_rtl("<p>سلام دنیا، این یک متن فارسی برای آزمایش است</p>"));
    }

    #[test]
    fn empty_and_markup_only_input_is_not_rtl() {
        assert!(!is_rtl(""));
        assert!(!is_rtl("<div><span></span></div>"));
    }
}
