//! Monitored region polygon feed.
//!
//! Returns the latest status snapshot for every monitored cluster. This
//! is the backbone feed: a refresh cycle cannot proceed without it.
use crate::ingest::{check_status, parse_records};
use crate::logging::SourceKind;
use crate::model::{FetchError, RegionRecord};

pub fn fetch_regions(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<Vec<RegionRecord>, FetchError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()?;
    let response = check_status(response)?;
    let body = response.text()?;
    parse_regions(&body)
}

pub fn parse_regions(body: &str) -> Result<Vec<RegionRecord>, FetchError> {
    parse_records(body, SourceKind::Regions)
}
