pub mod public_reports;
pub mod vac_reports;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{Error, FetchError};

pub const DISTRICT_LIST_URL: &str = "https://dashboard.cowin.gov.in/assets/json/csvjson.json";
pub const PUBLIC_REPORTS_URL: &str = "https://api.cowin.gov.in/api/v1/reports/v2/getPublicReports";
pub const VAC_PUBLIC_REPORTS_URL: &str = "https://api.cowin.gov.in/api/v1/reports/v2/getVacPublicReports";

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:88.0) Gecko/20100101 Firefox/88.0";

/// One entry of the canonical district list. Every per-district report is keyed on it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct District {
    pub district_id: i64,
    pub district_name: String,
    pub state_id: i64,
}

/// Thin wrapper over ureq that knows the dashboard endpoints and always
/// presents the configured user agent.
#[derive(Debug)]
pub struct Client {
    user_agent: String,
    district_list_url: String,
    public_reports_url: String,
    vac_public_reports_url: String,
    connect_timeout_ms: Option<u64>,
    read_timeout_ms: Option<u64>,
}

impl Client {
    pub fn new(config: &ApiConfig) -> Client {
        Client {
            user_agent: config.user_agent.to_owned(),
            district_list_url: config.district_list_url.to_owned(),
            public_reports_url: config.public_reports_url.to_owned(),
            vac_public_reports_url: config.vac_public_reports_url.to_owned(),
            connect_timeout_ms: config.connect_timeout_ms,
            read_timeout_ms: config.read_timeout_ms,
        }
    }

    /// GET `url` with the given query parameters and decode the body as `T`.
    /// Anything outside 2xx is a `FetchError`.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, Error> {
        let mut request = ureq::get(url);
        request.set("User-Agent", &self.user_agent);

        for (param, value) in query {
            request.query(param, value);
        }

        if let Some(ms) = self.connect_timeout_ms {
            request.timeout_connect(ms);
        }
        if let Some(ms) = self.read_timeout_ms {
            request.timeout_read(ms);
        }

        debug!(url, ?query, "GET");
        let response = request.call();

        if let Some(error) = response.synthetic_error() {
            return Err(Error::Transport { url: url.to_owned(), message: error.to_string() });
        }

        if !response.ok() {
            return Err(FetchError { url: url.to_owned(), status: response.status() }.into());
        }

        response.into_json_deserialize::<T>().map_err(|source| Error::Decode { url: url.to_owned(), source })
    }

    pub fn fetch_district_list(&self) -> Result<Vec<District>, Error> {
        self.get_json(&self.district_list_url, &[])
    }

    pub fn fetch_public_report<T: DeserializeOwned>(&self, district: &District, date: &str) -> Result<T, Error> {
        self.get_json(&self.public_reports_url, &district_query(Some(district), date))
    }

    /// `None` asks for the national aggregate: state and district go out empty.
    pub fn fetch_vac_public_report<T: DeserializeOwned>(&self, district: Option<&District>, date: &str) -> Result<T, Error> {
        self.get_json(&self.vac_public_reports_url, &district_query(district, date))
    }
}

fn district_query(district: Option<&District>, date: &str) -> Vec<(&'static str, String)> {
    let (state_id, district_id) = match district {
        Some(d) => { (d.state_id.to_string(), d.district_id.to_string()) },
        None => { (String::new(), String::new()) }
    };

    vec![
        ("state_id", state_id),
        ("district_id", district_id),
        ("date", date.to_owned()),
    ]
}

#[test]
fn test_district_query() {
    let district = District { district_id: 571, district_name: "Chennai".to_owned(), state_id: 31 };

    let query = district_query(Some(&district), "2021-06-01");
    assert_eq!(query, vec![
        ("state_id", "31".to_owned()),
        ("district_id", "571".to_owned()),
        ("date", "2021-06-01".to_owned()),
    ]);

    let query = district_query(None, "2021-06-01");
    assert_eq!(query[0], ("state_id", String::new()));
    assert_eq!(query[1], ("district_id", String::new()));
}

#[test]
fn test_district_list_ignores_extra_fields() {
    let districts: Vec<District> = serde_json::from_value(serde_json::json!([
        {"district_id": 571, "district_name": "Chennai", "state_id": 31, "state_name": "Tamil Nadu"},
        {"district_id": 392, "district_name": "Pune", "state_id": 21, "state_name": "Maharashtra"}
    ])).unwrap();

    assert_eq!(districts.len(), 2);
    assert_eq!(districts[1], District { district_id: 392, district_name: "Pune".to_owned(), state_id: 21 });
}
