//! Helpers for asserting on rendered HTML in tests.

use scraper::Html;

/// Parse a full HTML document, panicking on parse errors.
pub(crate) fn parse_html_document(html: &str) -> Html {
    let document = Html::parse_document(html);
    assert_valid_html(&document);

    document
}

/// Parse an HTML fragment, panicking on parse errors.
pub(crate) fn parse_html_fragment(html: &str) -> Html {
    let fragment = Html::parse_fragment(html);
    assert_valid_html(&fragment);

    fragment
}

/// Assert that the parsed HTML has no parse errors.
///
/// Void-element warnings are ignored since maud renders `<input>` without a
/// closing slash.
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}
