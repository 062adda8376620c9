// Payloads of getPublicReports and the two reports flattened out of them.

use serde::{Deserialize, Serialize};

use super::District;

#[derive(Deserialize, Debug)]
pub struct OwnershipCounts {
    pub total: Option<i64>,
    pub govt: Option<i64>,
    pub pvt: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct VaccinationCounts {
    pub total: Option<i64>,
    pub male: Option<i64>,
    pub female: Option<i64>,
    pub others: Option<i64>,
    pub covishield: Option<i64>,
    pub covaxin: Option<i64>,
    pub tot_dose_1: Option<i64>,
    pub tot_dose_2: Option<i64>,
    pub aefi: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct TopBlock {
    pub sites: OwnershipCounts,
    pub sessions: OwnershipCounts,
    pub vaccination: VaccinationCounts,
}

#[derive(Deserialize, Debug)]
pub struct VaccinationByAge {
    pub vac_18_30: Option<i64>,
    pub vac_30_45: Option<i64>,
    pub vac_45_60: Option<i64>,
    pub above_60: Option<i64>,
}

/// The slice of getPublicReports needed for the top level report. Both blocks
/// are mandatory: a report without them fails to decode rather than producing
/// a row of blanks.
#[derive(Deserialize, Debug)]
pub struct PublicReport {
    #[serde(rename(deserialize = "topBlock"))]
    pub top_block: TopBlock,
    #[serde(rename(deserialize = "vaccinationByAge"))]
    pub vaccination_by_age: VaccinationByAge,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TopLevelRecord {
    pub district_id: i64,
    pub state_id: i64,
    pub district_name: String,
    pub sites_total: Option<i64>,
    pub sites_govt: Option<i64>,
    pub sites_pvt: Option<i64>,
    pub sessions_total: Option<i64>,
    pub sessions_govt: Option<i64>,
    pub sessions_pvt: Option<i64>,
    pub total_vaccination: Option<i64>,
    pub male_vaccination: Option<i64>,
    pub female_vaccination: Option<i64>,
    pub other_vaccination: Option<i64>,
    #[serde(rename = "18_30_vaccination")]
    pub vaccination_18_30: Option<i64>,
    #[serde(rename = "30_45_vaccination")]
    pub vaccination_30_45: Option<i64>,
    #[serde(rename = "45_60_vaccination")]
    pub vaccination_45_60: Option<i64>,
    #[serde(rename = "60+_vaccination")]
    pub vaccination_60_above: Option<i64>,
    pub covishield: Option<i64>,
    pub covaxin: Option<i64>,
    pub dose1: Option<i64>,
    pub dose2: Option<i64>,
    pub aefi: Option<i64>,
}

pub fn build_top_level_record(district: &District, report: PublicReport) -> TopLevelRecord {
    let PublicReport { top_block, vaccination_by_age } = report;
    let TopBlock { sites, sessions, vaccination } = top_block;

    TopLevelRecord {
        district_id: district.district_id,
        state_id: district.state_id,
        district_name: district.district_name.to_owned(),
        sites_total: sites.total,
        sites_govt: sites.govt,
        sites_pvt: sites.pvt,
        sessions_total: sessions.total,
        sessions_govt: sessions.govt,
        sessions_pvt: sessions.pvt,
        total_vaccination: vaccination.total,
        male_vaccination: vaccination.male,
        female_vaccination: vaccination.female,
        other_vaccination: vaccination.others,
        vaccination_18_30: vaccination_by_age.vac_18_30,
        vaccination_30_45: vaccination_by_age.vac_30_45,
        vaccination_45_60: vaccination_by_age.vac_45_60,
        vaccination_60_above: vaccination_by_age.above_60,
        covishield: vaccination.covishield,
        covaxin: vaccination.covaxin,
        dose1: vaccination.tot_dose_1,
        dose2: vaccination.tot_dose_2,
        aefi: vaccination.aefi,
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub session_date: String,
    pub total: Option<i64>,
    pub planned: Option<i64>,
    pub ongoing: Option<i64>,
    pub completed: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct SessionReport {
    // named for five days, carries about thirty; no fixed length is assumed
    #[serde(rename(deserialize = "last5daySessionStatus"))]
    pub session_status: Vec<SessionStatus>,
}

#[derive(Debug)]
pub struct DistrictSessions {
    pub district: District,
    pub sessions: Vec<SessionStatus>,
}

/// Orders the daily session series oldest first. `session_date` is zero padded
/// `YYYY-MM-DD`, so string order is date order; the sort is stable for repeated dates.
pub fn build_daily_sessions(district: &District, report: SessionReport) -> DistrictSessions {
    let mut sessions = report.session_status;
    sessions.sort_by(|a, b| a.session_date.cmp(&b.session_date));

    DistrictSessions {
        district: district.clone(),
        sessions,
    }
}

#[cfg(test)]
fn test_district() -> District {
    District { district_id: 571, district_name: "Chennai".to_owned(), state_id: 31 }
}

#[test]
fn test_build_top_level_record() {
    let report: PublicReport = serde_json::from_value(serde_json::json!({
        "topBlock": {
            "sites": {"total": 120, "govt": 100, "pvt": 20},
            "sessions": {"total": 130, "govt": 105, "pvt": 25},
            "vaccination": {
                "total": 5000, "male": 2600, "female": 2390, "others": 10,
                "covishield": 4000, "covaxin": 1000,
                "tot_dose_1": 3800, "tot_dose_2": 1200, "aefi": 3,
                "today": 77
            }
        },
        "vaccinationByAge": {"vac_18_30": 900, "vac_30_45": 1400, "vac_45_60": 1500, "above_60": 1200, "total": 5000},
        "getBeneficiariesGroupBy": []
    })).unwrap();

    let record = build_top_level_record(&test_district(), report);

    assert_eq!(record, TopLevelRecord {
        district_id: 571,
        state_id: 31,
        district_name: "Chennai".to_owned(),
        sites_total: Some(120),
        sites_govt: Some(100),
        sites_pvt: Some(20),
        sessions_total: Some(130),
        sessions_govt: Some(105),
        sessions_pvt: Some(25),
        total_vaccination: Some(5000),
        male_vaccination: Some(2600),
        female_vaccination: Some(2390),
        other_vaccination: Some(10),
        vaccination_18_30: Some(900),
        vaccination_30_45: Some(1400),
        vaccination_45_60: Some(1500),
        vaccination_60_above: Some(1200),
        covishield: Some(4000),
        covaxin: Some(1000),
        dose1: Some(3800),
        dose2: Some(1200),
        aefi: Some(3),
    });
}

#[test]
fn test_missing_leaves_stay_empty() {
    let report: PublicReport = serde_json::from_value(serde_json::json!({
        "topBlock": {
            "sites": {"total": 12},
            "sessions": {"total": 13, "govt": null},
            "vaccination": {"total": 500}
        },
        "vaccinationByAge": {}
    })).unwrap();

    let record = build_top_level_record(&test_district(), report);
    assert_eq!(record.sites_total, Some(12));
    assert_eq!(record.sites_govt, None);
    assert_eq!(record.sessions_govt, None);
    assert_eq!(record.total_vaccination, Some(500));
    assert_eq!(record.aefi, None);
    assert_eq!(record.vaccination_60_above, None);
}

#[test]
fn test_missing_top_block_is_fatal() {
    let result = serde_json::from_value::<PublicReport>(serde_json::json!({
        "vaccinationByAge": {"vac_18_30": 1}
    }));
    assert!(result.is_err());

    let result = serde_json::from_value::<PublicReport>(serde_json::json!({
        "topBlock": {"sites": {}, "vaccination": {}},
        "vaccinationByAge": {}
    }));
    assert!(result.is_err());
}

#[test]
fn test_daily_sessions_sorted_and_stable() {
    let report: SessionReport = serde_json::from_value(serde_json::json!({
        "last5daySessionStatus": [
            {"session_date": "2021-06-03", "total": 30, "planned": 1, "ongoing": 2, "completed": 27},
            {"session_date": "2021-05-31", "total": 10, "planned": 0, "ongoing": 0, "completed": 10},
            {"session_date": "2021-06-01", "total": 11, "planned": 0, "ongoing": 0, "completed": 11},
            {"session_date": "2021-05-31", "total": 99, "planned": 0, "ongoing": 0, "completed": 99},
            {"session_date": "2021-06-02", "total": 20}
        ]
    })).unwrap();

    let result = build_daily_sessions(&test_district(), report);
    let dates: Vec<&str> = result.sessions.iter().map(|s| s.session_date.as_str()).collect();

    assert_eq!(dates, vec!["2021-05-31", "2021-05-31", "2021-06-01", "2021-06-02", "2021-06-03"]);
    assert_eq!(result.sessions[0].total, Some(10));
    assert_eq!(result.sessions[1].total, Some(99));
    assert_eq!(result.sessions[3].completed, None);
    assert_eq!(result.district, test_district());
}

#[test]
fn test_daily_sessions_accepts_any_length() {
    let report: SessionReport = serde_json::from_value(serde_json::json!({"last5daySessionStatus": []})).unwrap();
    assert!(build_daily_sessions(&test_district(), report).sessions.is_empty());
}
