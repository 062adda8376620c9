use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use crate::config::OutputConfig;
use crate::cowin::public_reports::{build_daily_sessions, build_top_level_record, PublicReport, SessionReport};
use crate::cowin::vac_reports::{build_registration_trend, merge_weekly_reports, RegistrationReport, WeeklyVacReport};
use crate::cowin::{Client, District};
use crate::error::Error;
use crate::integration::csv_export;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Job {
    TopLevelDistrictReport,
    WeeklyVacReportDistrict,
    NationalRegistrationTrends,
    DailySessionReportDistrict,
    All,
}

impl Job {
    pub const NAMES: [&'static str; 5] = [
        "top_level_district_report",
        "weekly_vac_report_district",
        "national_registration_trends",
        "daily_session_report_district",
        "all",
    ];

    pub fn name(self) -> &'static str {
        match self {
            Job::TopLevelDistrictReport => { Job::NAMES[0] },
            Job::WeeklyVacReportDistrict => { Job::NAMES[1] },
            Job::NationalRegistrationTrends => { Job::NAMES[2] },
            Job::DailySessionReportDistrict => { Job::NAMES[3] },
            Job::All => { Job::NAMES[4] },
        }
    }

    /// The single-file jobs this selection expands to, in run order.
    pub fn steps(self) -> Vec<Job> {
        match self {
            Job::All => {
                vec![
                    Job::WeeklyVacReportDistrict,
                    Job::TopLevelDistrictReport,
                    Job::NationalRegistrationTrends,
                    Job::DailySessionReportDistrict,
                ]
            },
            single => { vec![single] }
        }
    }

    fn needs_districts(self) -> bool {
        self != Job::NationalRegistrationTrends
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Job {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_level_district_report" => { Ok(Job::TopLevelDistrictReport) },
            "weekly_vac_report_district" => { Ok(Job::WeeklyVacReportDistrict) },
            "national_registration_trends" => { Ok(Job::NationalRegistrationTrends) },
            "daily_session_report_district" => { Ok(Job::DailySessionReportDistrict) },
            "all" => { Ok(Job::All) },
            other => { Err(Error::UnknownJob(other.to_owned())) }
        }
    }
}

/// A CSV produced by one step of a run.
#[derive(Debug, PartialEq)]
pub struct Written {
    pub job: Job,
    pub path: PathBuf,
    pub rows: usize,
}

/// Runs `job` for the query `date` (`YYYY-MM-DD`), writing into `output`.
///
/// Districts are fetched once up front and processed one at a time. The first
/// error aborts the run; a step only writes its file after every district
/// succeeded, so a failed step leaves no file behind.
pub fn run(job: Job, client: &Client, output: &OutputConfig, date: &str) -> Result<Vec<Written>, Error> {
    let districts = if job.needs_districts() {
        info!("Fetching district list");
        let districts = client.fetch_district_list()?;
        info!(count = districts.len(), "District list fetched");
        districts
    } else {
        Vec::new()
    };

    let mut written = Vec::new();

    for step in job.steps() {
        let (path, rows) = match step {
            Job::WeeklyVacReportDistrict => {
                let path = output.path_for(&output.weekly_vaccination);
                let rows = weekly_vac_report_district(client, &districts, date, &path)?;
                (path, rows)
            },
            Job::TopLevelDistrictReport => {
                let path = output.path_for(&output.top_level);
                let rows = top_level_district_report(client, &districts, date, &path)?;
                (path, rows)
            },
            Job::NationalRegistrationTrends => {
                let path = output.path_for(&output.national_registration);
                let rows = national_registration_trends(client, date, &path)?;
                (path, rows)
            },
            Job::DailySessionReportDistrict => {
                let path = output.path_for(&output.daily_sessions);
                let rows = daily_session_report_district(client, &districts, date, &path)?;
                (path, rows)
            },
            Job::All => { unreachable!("`all` is expanded by Job::steps") }
        };

        info!(job = %step, rows, path = %path.display(), "Job finished");
        written.push(Written { job: step, path, rows });
    }

    Ok(written)
}

pub fn top_level_district_report(client: &Client, districts: &[District], date: &str, path: &Path) -> Result<usize, Error> {
    let mut records = Vec::with_capacity(districts.len());

    for district in districts {
        info!(district = %district.district_name, "Building top level data");
        let report: PublicReport = client.fetch_public_report(district, date)?;
        records.push(build_top_level_record(district, report));
    }

    csv_export::write_top_level(path, &records)
}

pub fn weekly_vac_report_district(client: &Client, districts: &[District], date: &str, path: &Path) -> Result<usize, Error> {
    let mut reports = Vec::with_capacity(districts.len());

    for district in districts {
        info!(district = %district.district_name, "Building weekly data");
        let report: WeeklyVacReport = client.fetch_vac_public_report(Some(district), date)?;
        reports.push(merge_weekly_reports(district, report)?);
    }

    csv_export::write_weekly_vaccination(path, &reports)
}

pub fn national_registration_trends(client: &Client, date: &str, path: &Path) -> Result<usize, Error> {
    info!("Building national registration trend");
    let report: RegistrationReport = client.fetch_vac_public_report(None, date)?;
    let weeks = build_registration_trend(report)?;

    csv_export::write_national_registration(path, &weeks)
}

pub fn daily_session_report_district(client: &Client, districts: &[District], date: &str, path: &Path) -> Result<usize, Error> {
    let mut reports = Vec::with_capacity(districts.len());

    for district in districts {
        info!(district = %district.district_name, "Building daily session data");
        let report: SessionReport = client.fetch_public_report(district, date)?;
        reports.push(build_daily_sessions(district, report));
    }

    csv_export::write_daily_sessions(path, &reports)
}

#[cfg(test)]
mod stub {
    use std::thread;

    use serde_json::{json, Value};
    use tiny_http::{Request, Response, Server};

    use crate::config::{ApiConfig, OutputConfig};
    use crate::cowin::{Client, BROWSER_USER_AGENT};

    pub const DATE: &str = "2021-06-01";

    /// Serves every request with `handler` until the test process exits.
    /// Requests missing the browser user agent are refused with a 403.
    pub fn spawn<F>(handler: F) -> Client
    where
        F: Fn(&Request) -> (u16, Value) + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let base = format!("http://{}", addr);

        thread::spawn(move || {
            for request in server.incoming_requests() {
                let has_user_agent = request.headers().iter()
                    .any(|h| h.field.equiv("User-Agent") && h.value.as_str() == BROWSER_USER_AGENT);

                let (status, body) = if has_user_agent {
                    handler(&request)
                } else {
                    (403, json!({"message": "forbidden"}))
                };
                let _ = request.respond(Response::from_string(body.to_string()).with_status_code(status));
            }
        });

        Client::new(&ApiConfig {
            district_list_url: format!("{}/districts", base),
            public_reports_url: format!("{}/public", base),
            vac_public_reports_url: format!("{}/vac", base),
            ..ApiConfig::default()
        })
    }

    pub fn output(dir: &tempfile::TempDir) -> OutputConfig {
        OutputConfig {
            directory: dir.path().to_owned(),
            ..OutputConfig::default()
        }
    }

    pub fn path(request: &Request) -> &str {
        request.url().split('?').next().unwrap_or("")
    }

    pub fn param<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
        let query = request.url().splitn(2, '?').nth(1)?;
        query.split('&')
            .filter_map(|pair| {
                let mut parts = pair.splitn(2, '=');
                Some((parts.next()?, parts.next().unwrap_or("")))
            })
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn districts() -> Value {
        json!([
            {"district_id": 571, "district_name": "Chennai", "state_id": 31, "state_name": "Tamil Nadu"},
            {"district_id": 392, "district_name": "Pune", "state_id": 21, "state_name": "Maharashtra"}
        ])
    }

    /// Distinct numbers per district so rows can be told apart. Counter `k` of
    /// the top level CSV column order carries `district_id + k`.
    pub fn public_report(district_id: i64) -> Value {
        let n = district_id;
        json!({
            "topBlock": {
                "sites": {"total": n + 1, "govt": n + 2, "pvt": n + 3},
                "sessions": {"total": n + 4, "govt": n + 5, "pvt": n + 6},
                "vaccination": {
                    "total": n + 7, "male": n + 8, "female": n + 9, "others": n + 10,
                    "covishield": n + 15, "covaxin": n + 16,
                    "tot_dose_1": n + 17, "tot_dose_2": n + 18, "aefi": n + 19
                }
            },
            "vaccinationByAge": {"vac_18_30": n + 11, "vac_30_45": n + 12, "vac_45_60": n + 13, "above_60": n + 14},
            "last5daySessionStatus": [
                {"session_date": "2021-05-31", "total": n, "planned": 0, "ongoing": 0, "completed": n},
                {"session_date": "2021-05-29", "total": 1, "planned": 1, "ongoing": 0, "completed": 0},
                {"session_date": "2021-05-30", "total": 2, "planned": 0, "ongoing": 1, "completed": 1}
            ]
        })
    }

    pub fn vac_report(district_id: i64) -> Value {
        let weeks = ["Week 1", "Week 2", "Week 3"];
        json!({
            "weeklyReport": weeks.iter().enumerate().map(|(i, label)| json!({
                "label": label, "total": district_id * 10 + i as i64, "dose1": i, "dose2": 0
            })).collect::<Vec<_>>(),
            "weeklyVacAgeWiseReport": weeks.iter().enumerate().map(|(i, label)| json!({
                "label": label, "vac_18_45": 1, "vac_45_60": 2, "vac_60_above": 3,
                "startdate": format!("2021-05-{:02}T00:00:00.000000Z", 10 + 7 * i),
                "enddate": format!("2021-05-{:02}T00:00:00.000000Z", 16 + 7 * i)
            })).collect::<Vec<_>>(),
            "regWeekReportData": [
                {
                    "label": "Week 1", "startdate": "2021-01-11T00:00:00.000000Z", "enddate": "2021-01-17T00:00:00.000000Z",
                    "total": 900, "age18": 100, "age45": 300, "age60": 500, "male": 450, "female": 440, "others": 10
                }
            ]
        })
    }

    /// A well behaved upstream.
    pub fn healthy(request: &Request) -> (u16, Value) {
        if param(request, "date").map_or(false, |d| d != DATE) {
            return (400, json!({"message": "bad date"}));
        }

        let district_id = param(request, "district_id").and_then(|d| d.parse::<i64>().ok());

        match (path(request), district_id) {
            ("/districts", _) => { (200, districts()) },
            ("/public", Some(id)) => { (200, public_report(id)) },
            ("/vac", Some(id)) => { (200, vac_report(id)) },
            ("/vac", None) => {
                // the national aggregate is requested with empty ids
                if param(request, "state_id") == Some("") && param(request, "district_id") == Some("") {
                    (200, vac_report(0))
                } else {
                    (400, json!({"message": "bad scope"}))
                }
            },
            _ => { (404, json!({"message": "not found"})) }
        }
    }
}

#[cfg(test)]
fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(|s| s.to_owned()).collect();
    let rows = reader.records().map(|r| r.unwrap().iter().map(|s| s.to_owned()).collect()).collect();
    (header, rows)
}

#[test]
fn test_job_names_round_trip() {
    for name in Job::NAMES.iter() {
        let job: Job = name.parse().unwrap();
        assert_eq!(job.name(), *name);
    }
    assert!(matches!("weekly".parse::<Job>(), Err(Error::UnknownJob(_))));
}

#[test]
fn test_all_runs_in_fixed_order() {
    assert_eq!(Job::All.steps(), vec![
        Job::WeeklyVacReportDistrict,
        Job::TopLevelDistrictReport,
        Job::NationalRegistrationTrends,
        Job::DailySessionReportDistrict,
    ]);
    assert_eq!(Job::TopLevelDistrictReport.steps(), vec![Job::TopLevelDistrictReport]);
}

#[test]
fn test_top_level_job() {
    let client = stub::spawn(stub::healthy);
    let dir = tempfile::tempdir().unwrap();
    let output = stub::output(&dir);

    let written = run(Job::TopLevelDistrictReport, &client, &output, stub::DATE).unwrap();
    assert_eq!(written, vec![Written {
        job: Job::TopLevelDistrictReport,
        path: dir.path().join("district_vaccination.csv"),
        rows: 2,
    }]);

    let (header, rows) = read_csv(&written[0].path);
    assert_eq!(header, csv_export::TOP_LEVEL_HEADER);
    assert_eq!(rows.len(), 2);

    let mut expected = vec!["571".to_owned(), "31".to_owned(), "Chennai".to_owned()];
    expected.extend((1..=19).map(|i| (571 + i).to_string()));
    assert_eq!(rows[0], expected);

    assert_eq!(rows[1][..3], ["392", "21", "Pune"]);
    assert_eq!(rows[1][3], "393");
    assert_eq!(rows[1][21], "411");
}

#[test]
fn test_weekly_vaccination_job() {
    let client = stub::spawn(stub::healthy);
    let dir = tempfile::tempdir().unwrap();
    let output = stub::output(&dir);

    let written = run(Job::WeeklyVacReportDistrict, &client, &output, stub::DATE).unwrap();
    assert_eq!(written[0].rows, 6);

    let (header, rows) = read_csv(&written[0].path);
    assert_eq!(header, csv_export::WEEKLY_VACCINATION_HEADER);

    let chennai: Vec<&Vec<String>> = rows.iter().filter(|r| r[3] == "571").collect();
    let pune: Vec<&Vec<String>> = rows.iter().filter(|r| r[3] == "392").collect();
    assert_eq!(chennai.len(), 3);
    assert_eq!(pune.len(), 3);

    assert_eq!(chennai[0][..7], ["Week 1", "10-05-2021", "16-05-2021", "571", "31", "Chennai", "5710"]);
    assert_eq!(chennai[2][..3], ["Week 3", "24-05-2021", "30-05-2021"]);
    assert_eq!(pune[1][..7], ["Week 2", "17-05-2021", "23-05-2021", "392", "21", "Pune", "3921"]);
}

#[test]
fn test_national_registration_job_skips_district_list() {
    let client = stub::spawn(|request| {
        if stub::path(request) == "/districts" {
            (500, serde_json::json!({"message": "district list should not be needed"}))
        } else {
            stub::healthy(request)
        }
    });
    let dir = tempfile::tempdir().unwrap();
    let output = stub::output(&dir);

    let written = run(Job::NationalRegistrationTrends, &client, &output, stub::DATE).unwrap();
    assert_eq!(written[0].path, dir.path().join("national_registration_trends.csv"));

    let (header, rows) = read_csv(&written[0].path);
    assert_eq!(header, csv_export::NATIONAL_REGISTRATION_HEADER);
    assert_eq!(rows, vec![vec!["Week 1", "11-01-2021", "17-01-2021", "900", "100", "300", "500", "450", "440", "10"]]);
}

#[test]
fn test_daily_session_job() {
    let client = stub::spawn(stub::healthy);
    let dir = tempfile::tempdir().unwrap();
    let output = stub::output(&dir);

    let written = run(Job::DailySessionReportDistrict, &client, &output, stub::DATE).unwrap();
    assert_eq!(written[0].rows, 6);

    let (header, rows) = read_csv(&written[0].path);
    assert_eq!(header, csv_export::DAILY_SESSION_HEADER);

    let dates: Vec<&str> = rows.iter().map(|r| r[3].as_str()).collect();
    assert_eq!(dates, vec!["2021-05-29", "2021-05-30", "2021-05-31", "2021-05-29", "2021-05-30", "2021-05-31"]);
    assert_eq!(rows[2], vec!["571", "31", "Chennai", "2021-05-31", "571", "0", "0", "571"]);
    assert_eq!(rows[3][..3], ["392", "21", "Pune"]);
}

#[test]
fn test_all_job_writes_every_file() {
    let client = stub::spawn(stub::healthy);
    let dir = tempfile::tempdir().unwrap();
    let output = stub::output(&dir);

    let written = run(Job::All, &client, &output, stub::DATE).unwrap();
    let jobs: Vec<Job> = written.iter().map(|w| w.job).collect();
    assert_eq!(jobs, Job::All.steps());

    for w in written.iter() {
        assert!(w.path.exists(), "{} was not written", w.path.display());
    }
}

#[test]
fn test_district_list_failure_writes_nothing() {
    let client = stub::spawn(|request| {
        if stub::path(request) == "/districts" {
            (500, serde_json::json!({"message": "internal error"}))
        } else {
            stub::healthy(request)
        }
    });
    let dir = tempfile::tempdir().unwrap();
    let output = stub::output(&dir);

    match run(Job::All, &client, &output, stub::DATE) {
        Err(Error::Fetch(e)) => {
            assert_eq!(e.status, 500);
            assert!(e.url.ends_with("/districts"));
        },
        other => panic!("expected a fetch error, got {:?}", other)
    }

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_one_bad_district_aborts_job() {
    let client = stub::spawn(|request| {
        if stub::path(request) == "/public" && stub::param(request, "district_id") == Some("392") {
            (200, serde_json::json!({"vaccinationByAge": {}}))
        } else {
            stub::healthy(request)
        }
    });
    let dir = tempfile::tempdir().unwrap();
    let output = stub::output(&dir);

    let result = run(Job::TopLevelDistrictReport, &client, &output, stub::DATE);
    assert!(matches!(result, Err(Error::Decode { .. })));
    assert!(!dir.path().join("district_vaccination.csv").exists());
}

#[test]
fn test_weekly_label_mismatch_aborts_job() {
    let client = stub::spawn(|request| {
        if stub::path(request) == "/vac" && stub::param(request, "district_id") == Some("392") {
            let mut report = stub::vac_report(392);
            report["weeklyVacAgeWiseReport"][1]["label"] = serde_json::json!("Week 9");
            (200, report)
        } else {
            stub::healthy(request)
        }
    });
    let dir = tempfile::tempdir().unwrap();
    let output = stub::output(&dir);

    match run(Job::WeeklyVacReportDistrict, &client, &output, stub::DATE) {
        Err(Error::ReportMismatch(e)) => {
            assert_eq!(e.district.district_name, "Pune");
            assert_eq!(e.district.district_id, 392);
            assert_eq!(e.district.state_id, 21);
        },
        other => panic!("expected a report mismatch, got {:?}", other)
    }
    assert!(!dir.path().join("weekly_report.csv").exists());
}

#[test]
fn test_configured_user_agent_is_sent() {
    use crate::config::ApiConfig;

    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let allowed = request.headers().iter()
                .any(|h| h.field.equiv("User-Agent") && h.value.as_str() == "custom-agent/1.0");
            let status: u16 = if allowed { 200 } else { 403 };
            let _ = request.respond(tiny_http::Response::from_string("[]").with_status_code(status));
        }
    });

    let client = Client::new(&ApiConfig {
        district_list_url: format!("http://{}/districts", addr),
        user_agent: "custom-agent/1.0".to_owned(),
        ..ApiConfig::default()
    });
    assert!(client.fetch_district_list().unwrap().is_empty());

    let client = Client::new(&ApiConfig {
        district_list_url: format!("http://{}/districts", addr),
        ..ApiConfig::default()
    });
    match client.fetch_district_list() {
        Err(Error::Fetch(e)) => { assert_eq!(e.status, 403) },
        other => panic!("expected a fetch error, got {:?}", other)
    }
}
