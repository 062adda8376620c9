use chrono::{Local, NaiveDate};
use regex::Regex;

use crate::error::Error;

/// Today's local date in the `YYYY-MM-DD` form expected by the `date` query parameter.
pub fn today() -> String {
    query_date(Local::now().naive_local().date())
}

pub fn query_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Reformats an API timestamp (`2021-06-01T00:00:00.000000Z`) into `DD-MM-YYYY`.
/// Only the date part is looked at; the time and zone suffix are discarded.
pub fn clean_date(timestamp: &str) -> Result<String, Error> {
    lazy_static! {
        static ref RE_API_TIMESTAMP: Regex = Regex::new(r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})T").unwrap();
    }

    let captures = match RE_API_TIMESTAMP.captures(timestamp) {
        Some(x) => { x },
        None => {
            return Err(Error::Timestamp(timestamp.to_owned()))
        }
    };

    // the regex only lets digits through, so these parses cannot fail
    let year = captures["year"].parse::<i32>().map_err(|_| Error::Timestamp(timestamp.to_owned()))?;
    let month = captures["month"].parse::<u32>().map_err(|_| Error::Timestamp(timestamp.to_owned()))?;
    let day = captures["day"].parse::<u32>().map_err(|_| Error::Timestamp(timestamp.to_owned()))?;

    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => { Ok(date.format("%d-%m-%Y").to_string()) },
        None => { Err(Error::Timestamp(timestamp.to_owned())) }
    }
}

/// `clean_date` applied to an optional upstream field; absence stays absence.
pub fn clean_optional_date(timestamp: Option<&str>) -> Result<Option<String>, Error> {
    timestamp.map(clean_date).transpose()
}

#[test]
fn test_clean_date() {
    assert_eq!(clean_date("2021-06-01T00:00:00.000000Z").unwrap(), "01-06-2021");
    assert_eq!(clean_date("2021-12-31T18:30:00.000Z").unwrap(), "31-12-2021");
}

#[test]
fn test_clean_date_rejects_garbage() {
    assert!(matches!(clean_date("01-06-2021"), Err(Error::Timestamp(_))));
    assert!(matches!(clean_date("2021-02-30T00:00:00.000000Z"), Err(Error::Timestamp(_))));
    assert!(matches!(clean_date(""), Err(Error::Timestamp(_))));
}

#[test]
fn test_clean_optional_date() {
    assert_eq!(clean_optional_date(None).unwrap(), None);
    assert_eq!(clean_optional_date(Some("2021-05-24T00:00:00.000000Z")).unwrap(), Some("24-05-2021".to_owned()));
}

#[test]
fn test_query_date() {
    assert_eq!(query_date(NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()), "2021-06-01");
    assert_eq!(today().len(), 10);
}
