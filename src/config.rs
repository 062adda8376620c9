use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cowin::{BROWSER_USER_AGENT, DISTRICT_LIST_URL, PUBLIC_REPORTS_URL, VAC_PUBLIC_REPORTS_URL};
use crate::error::Error;

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub output: OutputConfig,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct ApiConfig {
    pub district_list_url: String,
    pub public_reports_url: String,
    pub vac_public_reports_url: String,
    pub user_agent: String,           // the API turns away requests that do not look like a browser
    pub connect_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            district_list_url: DISTRICT_LIST_URL.to_owned(),
            public_reports_url: PUBLIC_REPORTS_URL.to_owned(),
            vac_public_reports_url: VAC_PUBLIC_REPORTS_URL.to_owned(),
            user_agent: BROWSER_USER_AGENT.to_owned(),
            connect_timeout_ms: None,
            read_timeout_ms: None,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub top_level: String,
    pub weekly_vaccination: String,
    pub national_registration: String,
    pub daily_sessions: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: PathBuf::from("."),
            top_level: "district_vaccination.csv".to_owned(),
            weekly_vaccination: "weekly_report.csv".to_owned(),
            national_registration: "national_registration_trends.csv".to_owned(),
            daily_sessions: "daily_session_report.csv".to_owned(),
        }
    }
}

impl OutputConfig {
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.directory.join(file_name)
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config, Error> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ConfigRead { path: path.to_owned(), source })?;
        Config::from_toml(path, &contents)
    }

    fn from_toml(path: &Path, contents: &str) -> Result<Config, Error> {
        toml::from_str(contents).map_err(|source| Error::ConfigParse { path: path.to_owned(), source })
    }

    /// Without an explicit path the built-in endpoints and file names are used.
    pub fn load(path: Option<&Path>) -> Result<Config, Error> {
        match path {
            Some(p) => { Config::from_file(p) },
            None => { Ok(Config::default()) }
        }
    }
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = Config::from_toml(Path::new("inline.toml"), r#"
        [api]
        public_reports_url = "http://127.0.0.1:8080/reports"
        read_timeout_ms = 30000

        [output]
        directory = "out"
        weekly_vaccination = "weekly.csv"
    "#).unwrap();

    assert_eq!(config.api.public_reports_url, "http://127.0.0.1:8080/reports");
    assert_eq!(config.api.district_list_url, DISTRICT_LIST_URL);
    assert_eq!(config.api.user_agent, BROWSER_USER_AGENT);
    assert_eq!(config.api.read_timeout_ms, Some(30000));
    assert_eq!(config.api.connect_timeout_ms, None);
    assert_eq!(config.output.path_for(&config.output.weekly_vaccination), Path::new("out").join("weekly.csv"));
    assert_eq!(config.output.top_level, "district_vaccination.csv");
}

#[test]
fn test_empty_config_is_default() {
    let config = Config::from_toml(Path::new("empty.toml"), "").unwrap();
    assert_eq!(config.api.vac_public_reports_url, VAC_PUBLIC_REPORTS_URL);
    assert_eq!(config.output.directory, PathBuf::from("."));
}

#[test]
fn test_bad_config_is_reported() {
    let result = Config::from_toml(Path::new("bad.toml"), "[api]\nuser_agent = 5\n");
    assert!(matches!(result, Err(Error::ConfigParse { .. })));

    let result = Config::load(Some(Path::new("does/not/exist.toml")));
    assert!(matches!(result, Err(Error::ConfigRead { .. })));
}

#[test]
fn test_shipped_config_matches_defaults() {
    let config = Config::from_file(Path::new("config/cowin.toml")).unwrap();
    let defaults = Config::default();

    assert_eq!(config.api.district_list_url, defaults.api.district_list_url);
    assert_eq!(config.api.public_reports_url, defaults.api.public_reports_url);
    assert_eq!(config.api.vac_public_reports_url, defaults.api.vac_public_reports_url);
    assert_eq!(config.api.user_agent, defaults.api.user_agent);
    assert_eq!(config.output.daily_sessions, defaults.output.daily_sessions);
}
