//! Rain gauge telemetry feed.
//!
//! Stations report accumulated rainfall over several windows. Gauges go
//! offline routinely, so every accumulation field is optional.
use crate::ingest::{check_status, parse_records};
use crate::logging::SourceKind;
use crate::model::{FetchError, WeatherStation};

pub fn fetch_stations(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<Vec<WeatherStation>, FetchError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()?;
    let response = check_status(response)?;
    let body = response.text()?;
    parse_stations(&body)
}

pub fn parse_stations(body: &str) -> Result<Vec<WeatherStation>, FetchError> {
    parse_records(body, SourceKind::Weather)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"[
        {
            "estacao": "Tijuca",
            "longitude": -43.2316,
            "latitude": -22.9319,
            "acumulado_chuva_15_min": 4.2,
            "acumulado_chuva_1_h": 12.6,
            "acumulado_chuva_24_h": 48.0,
            "cluster_id": "c-17"
        },
        {
            "estacao": "Iraja",
            "longitude": -43.3267,
            "latitude": -22.8268,
            "acumulado_chuva_15_min": null,
            "acumulado_chuva_1_h": null,
            "acumulado_chuva_24_h": null
        }
    ]"#;

    #[test]
    fn test_parse_stations_fixture() {
        let stations = parse_stations(FIXTURE).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].station, "Tijuca");
        assert_eq!(stations[0].rain_15_min, Some(4.2));
        assert_eq!(stations[0].cluster_id.as_deref(), Some("c-17"));

        // An offline gauge still parses; accumulations stay None.
        assert_eq!(stations[1].rain_15_min, None);
        assert_eq!(stations[1].rain_1_h, None);
    }

    #[test]
    fn test_parse_stations_skips_malformed_record() {
        let body = r#"[
            {"estacao": "Tijuca", "longitude": -43.23, "latitude": -22.93},
            {"estacao": "Iraja", "longitude": -43.33, "latitude": "south"}
        ]"#;
        let stations = parse_stations(body).unwrap();
        assert_eq!(stations.len(), 1, "bad coordinate drops one record only");
        assert_eq!(stations[0].station, "Tijuca");
    }
}
