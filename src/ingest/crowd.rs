//! Crowd-sourced incident feed.
//!
//! The upstream endpoint carries every incident subtype; only flood
//! hazards are relevant here, so the rest are dropped at parse time.
use crate::ingest::{check_status, parse_records};
use crate::logging::SourceKind;
use crate::model::{CrowdReport, FetchError};

pub const FLOOD_SUBTYPE: &str = "HAZARD_WEATHER_FLOOD";

pub fn fetch_flood_reports(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<Vec<CrowdReport>, FetchError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()?;
    let response = check_status(response)?;
    let body = response.text()?;
    parse_flood_reports(&body)
}

pub fn parse_flood_reports(body: &str) -> Result<Vec<CrowdReport>, FetchError> {
    let reports: Vec<CrowdReport> = parse_records(body, SourceKind::Crowd)?;
    Ok(reports
        .into_iter()
        .filter(|r| r.subtype.as_deref() == Some(FLOOD_SUBTYPE))
        .collect())
}
