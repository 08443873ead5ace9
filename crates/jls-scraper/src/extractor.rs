use jls_crawler::log::Log;
use jls_crawler::log_to;
use scraper::{ElementRef, Html};

use crate::record::JobRecord;
use crate::shape::{Chain, Shape, ShapeRules};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("missing {0}")]
    MissingField(&'static str),
}

/// Records found in one document, in document order.
#[derive(Debug, Default)]
pub struct Extraction {
    pub shape: Option<Shape>,
    pub records: Vec<JobRecord>,
    pub skipped: usize,
}

pub fn extract(html: &Html, log: &dyn Log) -> Extraction {
    let Some((shape, listings)) = Shape::detect(html) else {
        return Extraction::default();
    };
    let rules = shape.rules();

    let mut extraction = Extraction {
        shape: Some(shape),
        records: Vec::with_capacity(listings.len()),
        skipped: 0,
    };
    for (i, listing) in listings.into_iter().enumerate() {
        match extract_listing(rules, listing) {
            Ok(record) => extraction.records.push(record),
            Err(e) => {
                log_to!(log, Warn, "Skipped listing #{} due to error: {e}", i + 1);
                extraction.skipped += 1;
            }
        }
    }
    extraction
}

pub fn extract_listing(rules: &ShapeRules, listing: ElementRef) -> Result<JobRecord, ExtractionError> {
    let field = |chain: &Chain, name: &'static str| {
        chain
            .resolve(listing)
            .ok_or(ExtractionError::MissingField(name))
    };

    Ok(JobRecord {
        title: field(&rules.title, "title")?,
        company: field(&rules.company, "company")?,
        location: field(&rules.location, "location")?,
        expiry_date: field(&rules.expiry_date, "expiryDate")?,
        description: field(&rules.description, "description")?,
    })
}
