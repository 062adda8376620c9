// Payloads of getVacPublicReports: the per-district weekly breakdown and the
// national weekly registration trend.

use serde::{Deserialize, Serialize};

use super::District;
use crate::common::clean_optional_date;
use crate::error::{Error, Mismatch, ReportMismatchError};

#[derive(Deserialize, Debug, Clone)]
pub struct WeeklyTotals {
    pub label: String,
    pub total: Option<i64>,
    pub dose1: Option<i64>,
    pub dose2: Option<i64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct WeeklyAgeWise {
    pub label: String,
    pub vac_18_45: Option<i64>,
    pub vac_45_60: Option<i64>,
    pub vac_60_above: Option<i64>,
    pub startdate: Option<String>, // 2021-05-24T00:00:00.000000Z
    pub enddate: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct WeeklyVacReport {
    #[serde(rename(deserialize = "weeklyReport"))]
    pub weekly_report: Vec<WeeklyTotals>,
    #[serde(rename(deserialize = "weeklyVacAgeWiseReport"))]
    pub weekly_age_wise: Vec<WeeklyAgeWise>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyVaccination {
    pub label: String,
    pub startdate: Option<String>, // DD-MM-YYYY
    pub enddate: Option<String>,
    pub total: Option<i64>,
    pub vaccination_18_45: Option<i64>,
    pub vaccination_45_60: Option<i64>,
    pub vaccination_60_above: Option<i64>,
    pub dose1: Option<i64>,
    pub dose2: Option<i64>,
}

#[derive(Debug)]
pub struct DistrictWeeklyVaccination {
    pub district: District,
    pub weeks: Vec<WeeklyVaccination>,
}

/// Joins `weeklyReport` and `weeklyVacAgeWiseReport` by position.
///
/// The upstream API is trusted to emit both series for the same weeks in the
/// same order. That is checked rather than assumed: differing lengths, or a
/// differing label at any index, fail with a `ReportMismatchError` for the
/// district and nothing is emitted for it.
pub fn merge_weekly_reports(district: &District, report: WeeklyVacReport) -> Result<DistrictWeeklyVaccination, Error> {
    let WeeklyVacReport { weekly_report, weekly_age_wise } = report;

    if weekly_report.len() != weekly_age_wise.len() {
        return Err(ReportMismatchError {
            district: district.clone(),
            kind: Mismatch::Length { totals: weekly_report.len(), age_wise: weekly_age_wise.len() },
        }.into());
    }

    let mut weeks = Vec::with_capacity(weekly_report.len());

    for (index, (totals, age_wise)) in weekly_report.into_iter().zip(weekly_age_wise).enumerate() {
        if totals.label != age_wise.label {
            return Err(ReportMismatchError {
                district: district.clone(),
                kind: Mismatch::Label { index, totals: totals.label, age_wise: age_wise.label },
            }.into());
        }

        weeks.push(WeeklyVaccination {
            label: totals.label,
            startdate: clean_optional_date(age_wise.startdate.as_deref())?,
            enddate: clean_optional_date(age_wise.enddate.as_deref())?,
            total: totals.total,
            vaccination_18_45: age_wise.vac_18_45,
            vaccination_45_60: age_wise.vac_45_60,
            vaccination_60_above: age_wise.vac_60_above,
            dose1: totals.dose1,
            dose2: totals.dose2,
        });
    }

    Ok(DistrictWeeklyVaccination {
        district: district.clone(),
        weeks,
    })
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct WeeklyRegistration {
    pub label: Option<String>,
    pub startdate: Option<String>,
    pub enddate: Option<String>,
    pub total: Option<i64>,
    pub age18: Option<i64>,
    pub age45: Option<i64>,
    pub age60: Option<i64>,
    pub male: Option<i64>,
    pub female: Option<i64>,
    pub others: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct RegistrationReport {
    #[serde(rename(deserialize = "regWeekReportData"))]
    pub weeks: Vec<WeeklyRegistration>,
}

/// National registration weeks, passed through with their date range reformatted.
pub fn build_registration_trend(report: RegistrationReport) -> Result<Vec<WeeklyRegistration>, Error> {
    let mut weeks = report.weeks;

    for week in weeks.iter_mut() {
        week.startdate = clean_optional_date(week.startdate.as_deref())?;
        week.enddate = clean_optional_date(week.enddate.as_deref())?;
    }

    Ok(weeks)
}

#[cfg(test)]
fn test_district() -> District {
    District { district_id: 392, district_name: "Pune".to_owned(), state_id: 21 }
}

#[cfg(test)]
fn weekly_payload(totals_labels: &[&str], age_labels: &[&str]) -> WeeklyVacReport {
    let totals: Vec<serde_json::Value> = totals_labels.iter().enumerate().map(|(i, label)| {
        serde_json::json!({"label": label, "total": 100 * (i + 1), "dose1": 60 * (i + 1), "dose2": 40 * (i + 1)})
    }).collect();
    let age_wise: Vec<serde_json::Value> = age_labels.iter().enumerate().map(|(i, label)| {
        serde_json::json!({
            "label": label,
            "vac_18_45": 10 * (i + 1), "vac_45_60": 20 * (i + 1), "vac_60_above": 30 * (i + 1),
            "startdate": format!("2021-05-{:02}T00:00:00.000000Z", 3 + 7 * i),
            "enddate": format!("2021-05-{:02}T00:00:00.000000Z", 9 + 7 * i)
        })
    }).collect();

    serde_json::from_value(serde_json::json!({
        "weeklyReport": totals,
        "weeklyVacAgeWiseReport": age_wise,
        "regWeekReportData": []
    })).unwrap()
}

#[test]
fn test_merge_weekly_reports() {
    let labels = ["Week 1", "Week 2", "Week 3"];
    let result = merge_weekly_reports(&test_district(), weekly_payload(&labels, &labels)).unwrap();

    assert_eq!(result.district, test_district());
    assert_eq!(result.weeks.len(), 3);
    for (week, label) in result.weeks.iter().zip(labels.iter()) {
        assert_eq!(&week.label, label);
    }

    assert_eq!(result.weeks[1], WeeklyVaccination {
        label: "Week 2".to_owned(),
        startdate: Some("10-05-2021".to_owned()),
        enddate: Some("16-05-2021".to_owned()),
        total: Some(200),
        vaccination_18_45: Some(20),
        vaccination_45_60: Some(40),
        vaccination_60_above: Some(60),
        dose1: Some(120),
        dose2: Some(80),
    });
}

#[test]
fn test_merge_weekly_reports_label_mismatch() {
    let result = merge_weekly_reports(
        &test_district(),
        weekly_payload(&["Week 1", "Week 2", "Week 3"], &["Week 1", "Week 3", "Week 2"])
    );

    match result {
        Err(Error::ReportMismatch(e)) => {
            assert_eq!(e.district, test_district());
            assert_eq!(e.kind, Mismatch::Label { index: 1, totals: "Week 2".to_owned(), age_wise: "Week 3".to_owned() });
        },
        other => panic!("expected a report mismatch, got {:?}", other)
    }
}

#[test]
fn test_merge_weekly_reports_length_mismatch() {
    let result = merge_weekly_reports(
        &test_district(),
        weekly_payload(&["Week 1", "Week 2", "Week 3"], &["Week 1", "Week 2"])
    );

    match result {
        Err(Error::ReportMismatch(e)) => {
            assert_eq!(e.district.district_id, 392);
            assert_eq!(e.kind, Mismatch::Length { totals: 3, age_wise: 2 });
        },
        other => panic!("expected a report mismatch, got {:?}", other)
    }
}

#[test]
fn test_merge_weekly_reports_bad_timestamp() {
    let report: WeeklyVacReport = serde_json::from_value(serde_json::json!({
        "weeklyReport": [{"label": "Week 1", "total": 1}],
        "weeklyVacAgeWiseReport": [{"label": "Week 1", "startdate": "last monday"}]
    })).unwrap();

    assert!(matches!(merge_weekly_reports(&test_district(), report), Err(Error::Timestamp(_))));
}

#[test]
fn test_build_registration_trend() {
    let report: RegistrationReport = serde_json::from_value(serde_json::json!({
        "regWeekReportData": [
            {
                "label": "Week 1", "startdate": "2021-01-11T00:00:00.000000Z", "enddate": "2021-01-17T00:00:00.000000Z",
                "total": 900, "age18": 100, "age45": 300, "age60": 500, "male": 450, "female": 440, "others": 10
            },
            {"label": "Week 2", "startdate": "2021-01-18T00:00:00.000000Z", "total": 50}
        ]
    })).unwrap();

    let weeks = build_registration_trend(report).unwrap();

    assert_eq!(weeks.len(), 2);
    assert_eq!(weeks[0].startdate.as_deref(), Some("11-01-2021"));
    assert_eq!(weeks[0].enddate.as_deref(), Some("17-01-2021"));
    assert_eq!(weeks[0].age60, Some(500));
    assert_eq!(weeks[1].startdate.as_deref(), Some("18-01-2021"));
    assert_eq!(weeks[1].enddate, None);
    assert_eq!(weeks[1].male, None);
}
