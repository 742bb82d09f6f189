//! Runtime configuration, environment-overridable.

use crate::records::NormalizeRules;
use anyhow::Context;
use chrono::Duration;
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Report page the whole interaction runs against.
    pub portal_url: String,
    /// WebDriver endpoint (a running chromedriver).
    pub webdriver_url: String,
    /// Download directory handed to the browser; exclusively owned by the
    /// in-flight session and cleared before each segment.
    pub download_dir: PathBuf,
    /// Visible text of the tab selecting the target port.
    pub port_label: String,
    /// The portal's maximum query window, in days.
    pub max_window_days: i64,
    /// Gap inserted between consecutive segments so the portal does not
    /// return boundary records twice.
    pub guard_offset_minutes: i64,
    /// How many times to poll the download directory for the export.
    pub export_poll_attempts: u32,
    /// Seconds between export polls.
    pub export_poll_interval_secs: u64,
    /// Filtering and labelling rules applied to every raw record.
    pub rules: NormalizeRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_url:
                "https://tpnet.twport.com.tw/IFAWeb/Function?_RedirUrl=/IFAWeb/Reports/HistoryPortShipList"
                    .to_owned(),
            webdriver_url: "http://localhost:9515".to_owned(),
            download_dir: PathBuf::from("temp_downloads"),
            port_label: "花蓮港".to_owned(),
            max_window_days: 7,
            guard_offset_minutes: 1,
            export_poll_attempts: 15,
            export_poll_interval_secs: 1,
            rules: NormalizeRules::default(),
        }
    }
}

impl Config {
    /// Loads defaults merged with `PORTCALL_`-prefixed environment variables.
    pub fn load() -> anyhow::Result<Self> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("PORTCALL_"))
            .extract()
            .context("failed to load configuration")
    }

    pub fn max_window(&self) -> Duration {
        Duration::days(self.max_window_days)
    }

    pub fn guard_offset(&self) -> Duration {
        Duration::minutes(self.guard_offset_minutes)
    }
}
