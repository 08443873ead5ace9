use serde::{Deserialize, Serialize};

pub const UNKNOWN_COMPANY: &str = "Unknown";
pub const NO_EXPIRY: &str = "N/A";
pub const NO_DESCRIPTION: &str = "No description provided";

/// One job posting, every field always populated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub expiry_date: String,
    pub description: String,
}

impl JobRecord {
    pub const FIELDS: [&'static str; 5] =
        ["title", "company", "location", "expiryDate", "description"];
}
