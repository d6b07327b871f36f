//! Token extraction from the Enlighten token page.
//!
//! The portal renders the JWT verbatim inside a `<textarea>`.

use scraper::{Html, Selector};

const TOKEN_SELECTOR: &str = "textarea";

/// Return the trimmed text of the first `<textarea>` in `html`, or an
/// empty string when there is none.
pub fn extract_token(html: &str) -> String {
    let Ok(selector) = Selector::parse(TOKEN_SELECTOR) else {
        return String::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
