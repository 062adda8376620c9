use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::cowin::public_reports::{DistrictSessions, TopLevelRecord};
use crate::cowin::vac_reports::{DistrictWeeklyVaccination, WeeklyRegistration};
use crate::error::Error;

pub const TOP_LEVEL_HEADER: [&str; 22] = [
    "district_id",
    "state_id",
    "district_name",
    "sites_total",
    "sites_govt",
    "sites_pvt",
    "sessions_total",
    "sessions_govt",
    "sessions_pvt",
    "total_vaccination",
    "male_vaccination",
    "female_vaccination",
    "other_vaccination",
    "18_30_vaccination",
    "30_45_vaccination",
    "45_60_vaccination",
    "60+_vaccination",
    "covishield",
    "covaxin",
    "dose1",
    "dose2",
    "aefi",
];

pub const WEEKLY_VACCINATION_HEADER: [&str; 12] = [
    "label",
    "startdate",
    "enddate",
    "district_id",
    "state_id",
    "district_name",
    "total",
    "18_45_vaccination",
    "45_60_vaccination",
    "60+_vaccination",
    "dose1",
    "dose2",
];

pub const NATIONAL_REGISTRATION_HEADER: [&str; 10] = [
    "label",
    "startdate",
    "enddate",
    "total",
    "age18",
    "age45",
    "age60",
    "male",
    "female",
    "others",
];

pub const DAILY_SESSION_HEADER: [&str; 8] = [
    "district_id",
    "state_id",
    "district_name",
    "session_date",
    "total",
    "planned",
    "ongoing",
    "completed",
];

// One row per (district, week); the district identity is repeated on every row.
#[derive(Serialize, Debug)]
struct WeeklyVaccinationRow<'a> {
    label: &'a str,
    startdate: Option<&'a str>,
    enddate: Option<&'a str>,
    district_id: i64,
    state_id: i64,
    district_name: &'a str,
    total: Option<i64>,
    #[serde(rename = "18_45_vaccination")]
    vaccination_18_45: Option<i64>,
    #[serde(rename = "45_60_vaccination")]
    vaccination_45_60: Option<i64>,
    #[serde(rename = "60+_vaccination")]
    vaccination_60_above: Option<i64>,
    dose1: Option<i64>,
    dose2: Option<i64>,
}

// One row per (district, day).
#[derive(Serialize, Debug)]
struct DailySessionRow<'a> {
    district_id: i64,
    state_id: i64,
    district_name: &'a str,
    session_date: &'a str,
    total: Option<i64>,
    planned: Option<i64>,
    ongoing: Option<i64>,
    completed: Option<i64>,
}

/// Writes `header` followed by one line per row. The header goes out even when
/// there are no rows. Returns the number of data rows written.
fn write_rows<S, I>(path: &Path, header: &[&str], rows: I) -> Result<usize, Error>
where
    S: Serialize,
    I: IntoIterator<Item = S>,
{
    info!(path = %path.display(), "Writing CSV");

    let written = try_write_rows(path, header, rows).map_err(|source| Error::Csv { path: path.to_owned(), source })?;

    info!(path = %path.display(), rows = written, "CSV written");
    Ok(written)
}

fn try_write_rows<S, I>(path: &Path, header: &[&str], rows: I) -> csv::Result<usize>
where
    S: Serialize,
    I: IntoIterator<Item = S>,
{
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(header)?;

    let mut written = 0;
    for row in rows {
        writer.serialize(row)?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}

pub fn write_top_level(path: &Path, records: &[TopLevelRecord]) -> Result<usize, Error> {
    write_rows(path, &TOP_LEVEL_HEADER, records)
}

pub fn write_weekly_vaccination(path: &Path, districts: &[DistrictWeeklyVaccination]) -> Result<usize, Error> {
    let rows = districts.iter().flat_map(|d| {
        d.weeks.iter().map(move |week| WeeklyVaccinationRow {
            label: &week.label,
            startdate: week.startdate.as_deref(),
            enddate: week.enddate.as_deref(),
            district_id: d.district.district_id,
            state_id: d.district.state_id,
            district_name: &d.district.district_name,
            total: week.total,
            vaccination_18_45: week.vaccination_18_45,
            vaccination_45_60: week.vaccination_45_60,
            vaccination_60_above: week.vaccination_60_above,
            dose1: week.dose1,
            dose2: week.dose2,
        })
    });

    write_rows(path, &WEEKLY_VACCINATION_HEADER, rows)
}

pub fn write_national_registration(path: &Path, weeks: &[WeeklyRegistration]) -> Result<usize, Error> {
    write_rows(path, &NATIONAL_REGISTRATION_HEADER, weeks)
}

pub fn write_daily_sessions(path: &Path, districts: &[DistrictSessions]) -> Result<usize, Error> {
    let rows = districts.iter().flat_map(|d| {
        d.sessions.iter().map(move |session| DailySessionRow {
            district_id: d.district.district_id,
            state_id: d.district.state_id,
            district_name: &d.district.district_name,
            session_date: &session.session_date,
            total: session.total,
            planned: session.planned,
            ongoing: session.ongoing,
            completed: session.completed,
        })
    });

    write_rows(path, &DAILY_SESSION_HEADER, rows)
}

// The explicit header constants must agree with the serde field names.
#[cfg(test)]
fn serialized_header<S: Serialize>(row: S) -> Vec<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.serialize(row).unwrap();
    let bytes = writer.into_inner().unwrap();
    let text = String::from_utf8(bytes).unwrap();
    text.lines().next().unwrap().split(',').map(|s| s.to_owned()).collect()
}

#[cfg(test)]
fn sample_district() -> crate::cowin::District {
    crate::cowin::District { district_id: 571, district_name: "Chennai".to_owned(), state_id: 31 }
}

#[test]
fn test_headers_match_row_types() {
    let record = TopLevelRecord {
        district_id: 1, state_id: 2, district_name: "x".to_owned(),
        sites_total: None, sites_govt: None, sites_pvt: None,
        sessions_total: None, sessions_govt: None, sessions_pvt: None,
        total_vaccination: None, male_vaccination: None, female_vaccination: None, other_vaccination: None,
        vaccination_18_30: None, vaccination_30_45: None, vaccination_45_60: None, vaccination_60_above: None,
        covishield: None, covaxin: None, dose1: None, dose2: None, aefi: None,
    };
    assert_eq!(serialized_header(&record), TOP_LEVEL_HEADER);

    let weekly = WeeklyVaccinationRow {
        label: "w", startdate: None, enddate: None, district_id: 1, state_id: 2, district_name: "x",
        total: None, vaccination_18_45: None, vaccination_45_60: None, vaccination_60_above: None, dose1: None, dose2: None,
    };
    assert_eq!(serialized_header(&weekly), WEEKLY_VACCINATION_HEADER);

    let registration = WeeklyRegistration {
        label: None, startdate: None, enddate: None, total: None, age18: None, age45: None, age60: None,
        male: None, female: None, others: None,
    };
    assert_eq!(serialized_header(&registration), NATIONAL_REGISTRATION_HEADER);

    let daily = DailySessionRow {
        district_id: 1, state_id: 2, district_name: "x", session_date: "2021-06-01",
        total: None, planned: None, ongoing: None, completed: None,
    };
    assert_eq!(serialized_header(&daily), DAILY_SESSION_HEADER);
}

#[test]
fn test_empty_export_keeps_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");

    assert_eq!(write_top_level(&path, &[]).unwrap(), 0);
    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines, vec![TOP_LEVEL_HEADER.join(",")]);
}

#[test]
fn test_daily_sessions_fan_out() {
    use crate::cowin::public_reports::SessionStatus;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daily.csv");

    let sessions = DistrictSessions {
        district: sample_district(),
        sessions: vec![
            SessionStatus { session_date: "2021-05-31".to_owned(), total: Some(10), planned: Some(1), ongoing: None, completed: Some(9) },
            SessionStatus { session_date: "2021-06-01".to_owned(), total: Some(12), planned: Some(0), ongoing: Some(2), completed: Some(10) },
        ],
    };

    assert_eq!(write_daily_sessions(&path, &[sessions]).unwrap(), 2);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines, vec![
        "district_id,state_id,district_name,session_date,total,planned,ongoing,completed",
        "571,31,Chennai,2021-05-31,10,1,,9",
        "571,31,Chennai,2021-06-01,12,0,2,10",
    ]);
}

#[test]
fn test_weekly_vaccination_fan_out() {
    use crate::cowin::vac_reports::WeeklyVaccination;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weekly.csv");

    let weekly = DistrictWeeklyVaccination {
        district: sample_district(),
        weeks: vec![WeeklyVaccination {
            label: "Week 1".to_owned(),
            startdate: Some("24-05-2021".to_owned()),
            enddate: Some("30-05-2021".to_owned()),
            total: Some(300),
            vaccination_18_45: Some(100),
            vaccination_45_60: None,
            vaccination_60_above: Some(200),
            dose1: Some(250),
            dose2: Some(50),
        }],
    };

    assert_eq!(write_weekly_vaccination(&path, &[weekly]).unwrap(), 1);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().nth(1), Some("Week 1,24-05-2021,30-05-2021,571,31,Chennai,300,100,,200,250,50"));
}

#[test]
fn test_unwritable_path_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.csv");

    match write_national_registration(&path, &[]) {
        Err(Error::Csv { path: p, .. }) => { assert_eq!(p, path) },
        other => panic!("expected a csv error, got {:?}", other)
    }
}
