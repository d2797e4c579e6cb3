use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub submission_time: String,
    pub company: String,
    pub status: String,
    pub interview_details: Option<String>,
    pub business: Option<String>,
    pub address: Option<String>,
    pub benefits: Option<String>,
}

/// The seven user-supplied fields of a record; everything but the id.
/// Used both for inserts and for full-row updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordDraft {
    pub submission_time: String,
    pub company: String,
    pub status: String,
    pub interview_details: Option<String>,
    pub business: Option<String>,
    pub address: Option<String>,
    pub benefits: Option<String>,
}

impl Record {
    pub fn draft(&self) -> RecordDraft {
        RecordDraft {
            submission_time: self.submission_time.clone(),
            company: self.company.clone(),
            status: self.status.clone(),
            interview_details: self.interview_details.clone(),
            business: self.business.clone(),
            address: self.address.clone(),
            benefits: self.benefits.clone(),
        }
    }
}
