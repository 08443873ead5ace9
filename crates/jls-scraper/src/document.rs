//! Queryable view over a fetched page.

use scraper::{ElementRef, Html, Selector};

/// Parses raw page bytes, invalid UTF-8 is replaced rather than rejected.
pub fn parse(page: &[u8]) -> Html {
    Html::parse_document(&String::from_utf8_lossy(page))
}

/// First descendant of `elem` matching `selector`.
pub fn first<'a>(elem: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    elem.select(selector).next()
}

/// Descendant text with whitespace runs collapsed to single spaces.
pub fn squashed_text(elem: ElementRef) -> String {
    elem.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("Invalid selector {css:?}: {e:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_squashed() {
        let html = parse(
            b"<div class='job'><h3>  Senior\n   <b>Accountant</b>\t</h3><p></p></div>",
        );
        let job = html.select(&selector("div.job")).next().unwrap();
        let title = first(job, &selector("h3")).unwrap();
        assert_eq!(squashed_text(title), "Senior Accountant");
        assert_eq!(squashed_text(first(job, &selector("p")).unwrap()), "");
        assert!(first(job, &selector("h4")).is_none());
    }

    #[test]
    fn lossy_bytes() {
        let html = parse(b"<p class='x'>caf\xe9</p>");
        let p = html.select(&selector("p.x")).next().unwrap();
        assert_eq!(squashed_text(p), "caf\u{fffd}");
    }
}
