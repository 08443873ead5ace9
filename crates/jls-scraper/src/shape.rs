//! Markup variants of a job board page and the fallback chains resolving
//! each record field within them.

use std::fmt;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::document::{first, selector, squashed_text};
use crate::record::{NO_DESCRIPTION, NO_EXPIRY, UNKNOWN_COMPANY};

/// One way of getting a field value out of a listing node.
#[derive(Debug, Clone)]
pub enum Probe {
    /// Text of the first matching descendant
    Text(Selector),
    /// Attribute of the first matching descendant
    Attr(Selector, &'static str),
    /// Text of the first matching descendant containing `marker`, minus the marker
    Marked {
        items: Selector,
        marker: &'static str,
    },
}

impl Probe {
    pub fn text(css: &str) -> Self {
        Self::Text(selector(css))
    }

    pub fn attr(css: &str, name: &'static str) -> Self {
        Self::Attr(selector(css), name)
    }

    pub fn marked(css: &str, marker: &'static str) -> Self {
        Self::Marked {
            items: selector(css),
            marker,
        }
    }

    /// Non-empty value found in `listing`, if any.
    pub fn probe(&self, listing: ElementRef) -> Option<String> {
        let value = match self {
            Self::Text(sel) => first(listing, sel).map(squashed_text),
            Self::Attr(sel, name) => first(listing, sel)
                .and_then(|e| e.value().attr(name))
                .map(|v| v.trim().to_string()),
            Self::Marked { items, marker } => listing
                .select(items)
                .map(squashed_text)
                .find(|text| text.contains(marker))
                .map(|text| text.replace(marker, "").trim().to_string()),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Probes tried in order, the first non-empty value wins.
#[derive(Debug, Clone)]
pub struct Chain {
    probes: Vec<Probe>,
    default: Option<&'static str>,
}

impl Chain {
    /// A chain without default, the field is required.
    pub fn required(probes: Vec<Probe>) -> Self {
        Self {
            probes,
            default: None,
        }
    }

    pub fn or(probes: Vec<Probe>, default: &'static str) -> Self {
        Self {
            probes,
            default: Some(default),
        }
    }

    /// `None` only when every probe failed on a required field.
    pub fn resolve(&self, listing: ElementRef) -> Option<String> {
        self.probes
            .iter()
            .find_map(|p| p.probe(listing))
            .or_else(|| self.default.map(String::from))
    }
}

/// Where the listings and their fields live for one markup variant.
#[derive(Debug)]
pub struct ShapeRules {
    pub listing: Selector,
    pub title: Chain,
    pub company: Chain,
    pub location: Chain,
    pub expiry_date: Chain,
    pub description: Chain,
}

static ANCHOR: Lazy<ShapeRules> = Lazy::new(|| ShapeRules {
    listing: selector("a.job-listing"),
    title: Chain::required(vec![Probe::text("h3.job-listing-title")]),
    company: Chain::or(
        vec![
            Probe::text("h4.job-listing-company"),
            Probe::attr("div.job-listing-company-logo img", "alt"),
        ],
        UNKNOWN_COMPANY,
    ),
    location: Chain::required(vec![Probe::text("li")]),
    expiry_date: Chain::or(
        vec![Probe::marked("div.job-listing-footer li", "Expires")],
        NO_EXPIRY,
    ),
    description: Chain::or(vec![Probe::text("p.job-listing-text")], NO_DESCRIPTION),
});

static CARD: Lazy<ShapeRules> = Lazy::new(|| ShapeRules {
    listing: selector("div.job-card, [data-job-listing]"),
    title: Chain::required(vec![Probe::text(".job-card-title")]),
    company: Chain::or(
        vec![
            Probe::text(".job-card-company"),
            Probe::attr(".job-card-logo img", "alt"),
        ],
        UNKNOWN_COMPANY,
    ),
    location: Chain::required(vec![Probe::text(".job-card-location"), Probe::text("li")]),
    expiry_date: Chain::or(vec![Probe::marked(".job-card-meta li", "Expires")], NO_EXPIRY),
    description: Chain::or(vec![Probe::text(".job-card-summary")], NO_DESCRIPTION),
});

/// Known markup variants, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Each listing is an `<a class="job-listing">`
    Anchor,
    /// Each listing is a `div.job-card` or carries `data-job-listing`
    Card,
}

impl Shape {
    pub const ALL: [Shape; 2] = [Shape::Anchor, Shape::Card];

    pub fn rules(self) -> &'static ShapeRules {
        match self {
            Self::Anchor => &*ANCHOR,
            Self::Card => &*CARD,
        }
    }

    pub fn listings(self, html: &Html) -> Vec<ElementRef<'_>> {
        html.select(&self.rules().listing).collect()
    }

    /// First shape finding any listing, with its listing nodes.
    pub fn detect(html: &Html) -> Option<(Shape, Vec<ElementRef<'_>>)> {
        Self::ALL.iter().find_map(|shape| {
            let listings = shape.listings(html);
            (!listings.is_empty()).then_some((*shape, listings))
        })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anchor => write!(f, "anchor"),
            Self::Card => write!(f, "card"),
        }
    }
}
