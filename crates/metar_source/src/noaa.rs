//! NOAA METAR transport.
//!
//! Fetches station observations from `tgftp.nws.noaa.gov`. The TXT endpoint
//! returns an observation-time line (`YYYY/MM/DD HH:MM`, UTC) followed by
//! the METAR text itself.

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use common::{Error, FetchRequest, ProxyConfig};
use tracing::debug;

use crate::{FetchedMetar, MetarSource};

const NOAA_BASE_URL: &str = "https://tgftp.nws.noaa.gov/data/observations/metar/stations";
const OBSERVATION_TIME_FORMAT: &str = "%Y/%m/%d %H:%M";

/// NOAA station-observation client with connection pooling.
#[derive(Debug, Clone)]
pub struct NoaaMetarSource {
    client: reqwest::Client,
}

impl NoaaMetarSource {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("metar-watch/0.1")
            .pool_max_idle_per_host(2)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build NOAA HTTP client");

        Self { client }
    }

    /// Client honoring the request's snapshotted proxy parameters.
    ///
    /// The pooled client is reused for the common no-proxy case; a proxied
    /// request gets its own client because the proxy is part of the request,
    /// not of this source.
    fn client_for(&self, proxy: &ProxyConfig) -> Result<reqwest::Client, Error> {
        if !proxy.is_configured() {
            return Ok(self.client.clone());
        }

        let url = if proxy.port.is_empty() {
            format!("http://{}", proxy.host)
        } else {
            format!("http://{}:{}", proxy.host, proxy.port)
        };
        let mut p = reqwest::Proxy::http(&url)
            .map_err(|e| Error::Config(format!("invalid proxy {}: {}", url, e)))?;
        if let Some((user, pass)) = proxy.auth.split_once(':') {
            p = p.basic_auth(user, pass);
        }

        reqwest::Client::builder()
            .user_agent("metar-watch/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .proxy(p)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build proxied client: {}", e)))
    }
}

impl Default for NoaaMetarSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetarSource for NoaaMetarSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedMetar, Error> {
        let station = request.station_id.to_ascii_uppercase();
        let url = format!("{}/{}.TXT", NOAA_BASE_URL, station);

        debug!("Fetching NOAA METAR: {}", url);

        let resp = self
            .client_for(&request.proxy)?
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("HTTP error for {}: {}", station, e)))?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(Error::Transport(format!(
                "NOAA returned {} for {}",
                status, station
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("body read error for {}: {}", station, e)))?;

        parse_noaa_body(&station, &body)
    }
}

/// Split a NOAA TXT body into observation time and record text.
pub fn parse_noaa_body(station_id: &str, body: &str) -> Result<FetchedMetar, Error> {
    let mut lines = body.lines().filter(|l| !l.trim().is_empty());

    let time_line = lines
        .next()
        .ok_or_else(|| Error::Transport(format!("empty NOAA response for {}", station_id)))?;

    let naive = NaiveDateTime::parse_from_str(time_line.trim(), OBSERVATION_TIME_FORMAT)
        .map_err(|e| {
            Error::Transport(format!(
                "bad observation time {:?} for {}: {}",
                time_line, station_id, e
            ))
        })?;
    let observed_at = Utc.from_utc_datetime(&naive);

    let raw = lines.collect::<Vec<_>>().join("\n");

    Ok(FetchedMetar {
        station_id: station_id.to_string(),
        raw,
        observed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_body_splits_time_and_record() {
        let body = "2026/08/29 12:51\nKJFK 291251Z 18010KT 10SM FEW250 28/18 A3012\n";
        let metar = parse_noaa_body("KJFK", body).unwrap();

        assert_eq!(metar.station_id, "KJFK");
        assert_eq!(metar.raw, "KJFK 291251Z 18010KT 10SM FEW250 28/18 A3012");
        assert_eq!(metar.observed_at.year(), 2026);
        assert_eq!(metar.observed_at.month(), 8);
        assert_eq!(metar.observed_at.day(), 29);
        assert_eq!(metar.observed_at.hour(), 12);
        assert_eq!(metar.observed_at.minute(), 51);
    }

    #[test]
    fn test_parse_body_keeps_multiline_record() {
        let body = "2026/08/29 12:51\nKJFK 291251Z 18010KT 10SM\n FEW250 28/18 A3012\n";
        let metar = parse_noaa_body("KJFK", body).unwrap();
        assert_eq!(metar.raw, "KJFK 291251Z 18010KT 10SM\n FEW250 28/18 A3012");
    }

    #[test]
    fn test_parse_body_rejects_garbled_time() {
        let body = "not a timestamp\nKJFK 291251Z 18010KT\n";
        let err = parse_noaa_body("KJFK", body).unwrap_err();
        assert!(matches!(err, Error::Transport(_)), "unexpected error: {err}");
    }

    #[test]
    fn test_parse_body_rejects_empty_response() {
        let err = parse_noaa_body("KJFK", "\n\n").unwrap_err();
        assert!(matches!(err, Error::Transport(_)), "unexpected error: {err}");
    }
}
