use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Where a CSV sheet comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Url(value.to_owned())
        } else {
            Self::File(PathBuf::from(value))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

pub(super) fn read_source(source: &DataSource) -> Result<String> {
    match source {
        DataSource::File(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        DataSource::Url(url) => {
            let client = reqwest::blocking::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .context("failed to build HTTP client")?;
            let response = client
                .get(url)
                .send()
                .with_context(|| format!("request to {url} failed"))?;

            let status = response.status();
            if !status.is_success() {
                return Err(anyhow!("{url} answered with HTTP {status}"));
            }
            response
                .text()
                .with_context(|| format!("response body from {url} was not valid text"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_urls_and_paths() {
        assert_eq!(
            DataSource::parse("https://example.org/sheet.csv"),
            DataSource::Url("https://example.org/sheet.csv".to_owned())
        );
        assert_eq!(
            DataSource::parse(" data/producers.csv "),
            DataSource::File(PathBuf::from("data/producers.csv"))
        );
    }

    #[test]
    fn missing_file_reports_path() {
        let error = read_source(&DataSource::File(PathBuf::from("/nonexistent/producers.csv")))
            .unwrap_err();
        assert!(format!("{error:#}").contains("/nonexistent/producers.csv"));
    }
}
