use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cowin::District;

/// The remote side answered, but with a status outside of 2xx.
#[derive(Error, Debug)]
#[error("request to {url} failed with HTTP status {status}")]
pub struct FetchError {
    pub url: String,
    pub status: u16,
}

#[derive(Debug, PartialEq)]
pub enum Mismatch {
    Label { index: usize, totals: String, age_wise: String },
    Length { totals: usize, age_wise: usize },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Label { index, totals, age_wise } => {
                write!(f, "week {} is labelled `{}` in weeklyReport but `{}` in weeklyVacAgeWiseReport", index, totals, age_wise)
            },
            Mismatch::Length { totals, age_wise } => {
                write!(f, "weeklyReport has {} weeks but weeklyVacAgeWiseReport has {}", totals, age_wise)
            }
        }
    }
}

/// The two weekly series of a district could not be joined by position.
#[derive(Error, Debug)]
#[error("weekly reports for {} (district_id={}, state_id={}) do not line up: {kind}", .district.district_name, .district.district_id, .district.state_id)]
pub struct ReportMismatchError {
    pub district: District,
    pub kind: Mismatch,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    ReportMismatch(#[from] ReportMismatchError),

    #[error("failed to retrieve data from {url}: {message}")]
    Transport { url: String, message: String },

    #[error("response from {url} is not valid JSON, or the structure has changed significantly: {source}")]
    Decode {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("unrecognised API timestamp `{0}`")]
    Timestamp(String),

    #[error("failed to write {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read configuration {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse configuration {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown report type `{0}`")]
    UnknownJob(String),
}

#[test]
fn test_mismatch_message_names_district() {
    let error = ReportMismatchError {
        district: District {
            district_id: 571,
            district_name: "Chennai".to_owned(),
            state_id: 31,
        },
        kind: Mismatch::Label { index: 2, totals: "Week 3".to_owned(), age_wise: "Week 4".to_owned() },
    };

    let message = error.to_string();
    assert!(message.contains("Chennai"));
    assert!(message.contains("district_id=571"));
    assert!(message.contains("state_id=31"));
    assert!(message.contains("week 2"));
}
