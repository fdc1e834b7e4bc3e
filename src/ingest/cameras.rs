//! AI camera classification feed.
//!
//! Each record is one street camera with the latest classifier verdict:
//! label 1 means flooding detected in the frame, 0 means clear, absent
//! means the classifier has not scored that camera yet.
use crate::ingest::{check_status, parse_records};
use crate::logging::SourceKind;
use crate::model::{CameraRecord, FetchError};

pub fn fetch_cameras(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<Vec<CameraRecord>, FetchError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()?;
    let response = check_status(response)?;
    let body = response.text()?;
    parse_cameras(&body)
}

pub fn parse_cameras(body: &str) -> Result<Vec<CameraRecord>, FetchError> {
    parse_records(body, SourceKind::Cameras)
}

/// Cameras assigned to one region, for the detail panel.
pub fn cameras_for_cluster<'a>(
    cameras: &'a [CameraRecord],
    cluster_id: &str,
) -> Vec<&'a CameraRecord> {
    cameras
        .iter()
        .filter(|c| c.cluster_id.as_deref() == Some(cluster_id))
        .collect()
}
