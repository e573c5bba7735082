// holidays.rs — gov.uk bank holiday calendar.
//
// The feed is a map of division name ("england-and-wales", "scotland",
// "northern-ireland") to a list of dated events. Real merges are skipped
// on bank holidays in the configured division.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::{RemoteError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct BankHoliday {
    pub title: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
struct Division {
    events: Vec<BankHoliday>,
}

/// Bank holidays per division.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct BankHolidays {
    divisions: HashMap<String, Division>,
}

impl BankHolidays {
    pub fn from_json(body: &str) -> Result<Self> {
        Self::decode("bank holidays", body)
    }

    fn decode(source: &str, body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| RemoteError::Decode {
            url: source.to_string(),
            detail: e.to_string(),
        })
    }

    /// Download the calendar from `url`.
    pub fn fetch(url: &str) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        tracing::debug!(url, "GET bank holidays");
        let response = http.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }
        Self::decode(url, &response.text()?)
    }

    /// The holiday on `date` in `region`, if there is one.
    pub fn holiday_on(&self, region: &str, date: NaiveDate) -> Result<Option<&BankHoliday>> {
        let division = self.divisions.get(region).ok_or_else(|| RemoteError::UnknownRegion {
            region: region.to_string(),
        })?;
        Ok(division.events.iter().find(|event| event.date == date))
    }

    pub fn contains(&self, region: &str, date: NaiveDate) -> Result<bool> {
        Ok(self.holiday_on(region, date)?.is_some())
    }
}
