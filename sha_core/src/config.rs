//! The JSON run configuration.

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    weekday::{HallId, Weekday},
};

pub static DEFAULT_BASE_URL: &str = "https://asp5.lvp.nl/amisweb/utrecht/amis1/amis.php";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hall_ids: Vec<HallId>,
    #[serde(default)]
    pub days_of_week: Vec<Weekday>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_img_dir")]
    pub img_dir: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// TrueType font for chart text; a system font is searched when absent.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    String::from(DEFAULT_BASE_URL)
}

fn default_img_dir() -> PathBuf {
    PathBuf::from("img")
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = read_to_string(path)
            .map_err(|err| Error::Config(format!("cannot read `{}`: {err}", path.display())))?;
        Self::parse(&json)
    }

    pub fn parse(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|err| Error::Config(err.to_string()))?;
        if config.start_date > config.end_date {
            return Err(Error::Config(format!(
                "start_date {} is after end_date {}",
                config.start_date, config.end_date
            )));
        }
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use chrono::NaiveDate;

    use crate::{
        config::{Config, DEFAULT_BASE_URL},
        error::Error,
        weekday::Weekday,
    };

    #[test]
    fn test_parse_minimal() {
        let config = Config::parse(
            r#"{"hall_ids":[42], "days_of_week":["mon", "Sat"], "start_date":"2025-01-01","end_date":"2025-01-31"}"#,
        )
        .unwrap();
        assert_eq!(config.hall_ids, vec![42]);
        assert_eq!(config.days_of_week, vec![Weekday::Monday, Weekday::Saturday]);
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.img_dir, PathBuf::from("img"));
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.font_path.is_none());
    }

    #[test]
    fn test_parse_errors() {
        let unknown_day = Config::parse(
            r#"{"days_of_week":["xyz"], "start_date":"2025-01-01","end_date":"2025-01-31"}"#,
        );
        assert!(matches!(unknown_day, Err(Error::Config(_))));
        let missing_date = Config::parse(r#"{"hall_ids":[1], "start_date":"2025-01-01"}"#);
        assert!(matches!(missing_date, Err(Error::Config(_))));
        let reversed = Config::parse(r#"{"start_date":"2025-02-01","end_date":"2025-01-31"}"#);
        assert!(matches!(reversed, Err(Error::Config(_))));
        let not_json = Config::parse("hall_ids: 1");
        assert!(matches!(not_json, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("does/not/exist.json"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_template() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/template.json");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.days_of_week, vec![Weekday::Thursday]);
        assert_eq!(config.hall_ids.len(), 4);
    }
}
