use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Check intervals, in minutes, accepted by the Synthetics API.
pub const FREQUENCIES: [u32; 9] = [1, 5, 10, 15, 30, 60, 360, 720, 1440];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitorType {
    #[serde(rename = "SIMPLE")]
    Ping,
    #[serde(rename = "BROWSER")]
    Browser,
    #[serde(rename = "SCRIPT_BROWSER")]
    ScriptedBrowser,
    #[serde(rename = "SCRIPT_API")]
    ApiTest,
}

impl MonitorType {
    pub const ALL: [MonitorType; 4] = [
        MonitorType::Ping,
        MonitorType::Browser,
        MonitorType::ScriptedBrowser,
        MonitorType::ApiTest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorType::Ping => "SIMPLE",
            MonitorType::Browser => "BROWSER",
            MonitorType::ScriptedBrowser => "SCRIPT_BROWSER",
            MonitorType::ApiTest => "SCRIPT_API",
        }
    }
}

impl Display for MonitorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown monitor type {0:?}, expected one of SIMPLE, BROWSER, SCRIPT_BROWSER, SCRIPT_API")]
pub struct ParseMonitorTypeError(String);

impl FromStr for MonitorType {
    type Err = ParseMonitorTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MonitorType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseMonitorTypeError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorStatus {
    Enabled,
    Muted,
    Disabled,
}

impl Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MonitorStatus::Enabled => "ENABLED",
            MonitorStatus::Muted => "MUTED",
            MonitorStatus::Disabled => "DISABLED",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_string: Option<String>,
    #[serde(default, rename = "verifySSL")]
    pub verify_ssl: bool,
    #[serde(default, rename = "bypassHEADRequest")]
    pub bypass_head_request: bool,
    #[serde(default)]
    pub treat_redirect_as_failure: bool,
}

/// A Synthetics monitor as exchanged with the v4 REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MonitorType,
    pub frequency: u32,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub locations: Vec<String>,
    pub status: MonitorStatus,
    #[serde(default)]
    pub sla_threshold: f64,
    #[serde(default)]
    pub options: MonitorOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMonitorsResponse {
    #[serde(default)]
    pub monitors: Vec<Monitor>,
    #[serde(default)]
    pub count: usize,
}

/// Parses a `--monitor-frequency` value, rejecting intervals the API refuses.
pub fn parse_frequency(value: &str) -> Result<u32, String> {
    let minutes: u32 = value
        .trim()
        .parse()
        .map_err(|_| format!("{value:?} is not a number of minutes"))?;

    if FREQUENCIES.contains(&minutes) {
        Ok(minutes)
    } else {
        Err(format!("{minutes} must be one of {FREQUENCIES:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_type_parsing() {
        assert_eq!("SIMPLE".parse::<MonitorType>(), Ok(MonitorType::Ping));
        assert_eq!("script_api".parse::<MonitorType>(), Ok(MonitorType::ApiTest));
        assert_eq!(" BROWSER ".parse::<MonitorType>(), Ok(MonitorType::Browser));
        assert!("PING".parse::<MonitorType>().is_err());
        assert!("".parse::<MonitorType>().is_err());
    }

    #[test]
    fn frequency_parsing() {
        assert_eq!(parse_frequency("60"), Ok(60));
        assert_eq!(parse_frequency("1440"), Ok(1440));
        assert!(parse_frequency("7").is_err());
        assert!(parse_frequency("hourly").is_err());
    }

    #[test]
    fn monitor_wire_format() {
        let monitor: Monitor = serde_json::from_str(
            r#"{
                "id": "2a1bf7a2-1ba4-4d5e-8b84-6a1b0d2c3f10",
                "name": "https://shop.example.org/",
                "type": "SCRIPT_BROWSER",
                "frequency": 15,
                "uri": "https://shop.example.org/",
                "locations": ["AWS_AP_SOUTHEAST_2"],
                "status": "MUTED",
                "slaThreshold": 7.0,
                "options": { "verifySSL": true },
                "modifiedAt": "2020-04-01T00:00:00.000+0000"
            }"#,
        )
        .unwrap();

        assert_eq!(monitor.kind, MonitorType::ScriptedBrowser);
        assert_eq!(monitor.status, MonitorStatus::Muted);
        assert!(monitor.options.verify_ssl);

        let body = serde_json::to_value(Monitor {
            id: None,
            ..monitor
        })
        .unwrap();

        assert_eq!(body["type"], "SCRIPT_BROWSER");
        assert_eq!(body["slaThreshold"], 7.0);
        assert!(body.get("id").is_none());
    }
}
