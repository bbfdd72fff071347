use serde::Serialize;

use super::record::HealthRecord;

/// Filtering and pagination for record listings.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub record_type: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring match over display_text / code_display.
    pub search: Option<String>,
    pub page: usize,
    pub page_size: usize,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            record_type: None,
            category: None,
            search: None,
            page: 1,
            page_size: 20,
        }
    }
}

/// One page of a record listing.
#[derive(Debug, Serialize)]
pub struct RecordPage {
    pub items: Vec<HealthRecord>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}
