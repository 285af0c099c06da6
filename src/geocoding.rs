//! Reverse geocoding: coordinates to a postal-style address.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::RemoteError;

/// Structured address; any part may be missing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeocodingResult {
    pub location_name: Option<String>,
    pub street: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub formatted_address: Option<String>,
}

#[async_trait]
pub trait GeocodingGateway: Send + Sync {
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<GeocodingResult, RemoteError>;
}

/// Nominatim-compatible reverse geocoder.
pub struct NominatimGeocoder {
    http: Client,
    base_url: String,
    user_agent: String,
    language: String,
}

impl NominatimGeocoder {
    pub fn new(http: Client, base_url: &str, user_agent: &str, language: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            language: language.to_string(),
        }
    }
}

/// `/reverse` response (only the fields we map).
#[derive(Debug, Deserialize)]
struct ReverseResp {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    road: Option<String>,
    house_number: Option<String>,
    suburb: Option<String>,
    city_district: Option<String>,
    village: Option<String>,
    city: Option<String>,
    town: Option<String>,
    county: Option<String>,
    state: Option<String>,
}

#[async_trait]
impl GeocodingGateway for NominatimGeocoder {
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<GeocodingResult, RemoteError> {
        let url = format!("{}/reverse", self.base_url);
        let resp = self
            .http
            .get(url)
            .header("User-Agent", &self.user_agent)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("addressdetails", "1".to_string()),
                ("accept-language", self.language.clone()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::new(format!("HTTP status {status} error")));
        }
        let body = resp.json::<ReverseResp>().await?;
        map_response(body)
            .ok_or_else(|| RemoteError::new("No address found for the given coordinates"))
    }
}

/// Map a geocoder answer into address fields; `None` when there is no address.
fn map_response(resp: ReverseResp) -> Option<GeocodingResult> {
    if resp.error.is_some() {
        return None;
    }
    let addr = resp.address?;

    let street = [addr.road.as_deref(), addr.house_number.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let street = non_empty(Some(street));

    let location_name = non_empty(resp.name).or_else(|| street.clone());
    let district = non_empty(addr.suburb)
        .or(non_empty(addr.city_district))
        .or(non_empty(addr.village))
        .or(non_empty(addr.city.clone()));
    let city = non_empty(addr.city)
        .or(non_empty(addr.town))
        .or(non_empty(addr.county));

    Some(GeocodingResult {
        location_name,
        street,
        district,
        city,
        region: non_empty(addr.state),
        formatted_address: non_empty(resp.display_name),
    })
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn street_joins_road_and_number_and_names_fall_back() {
        let resp: ReverseResp = serde_json::from_value(json!({
            "name": "",
            "display_name": "Jl. Sudirman 5, Jakarta",
            "address": {
                "road": "Jl. Sudirman", "house_number": "5",
                "city_district": "Tanah Abang", "city": "Jakarta Pusat",
                "state": "DKI Jakarta"
            }
        }))
        .unwrap();
        let r = map_response(resp).unwrap();
        assert_eq!(r.street.as_deref(), Some("Jl. Sudirman 5"));
        assert_eq!(r.location_name.as_deref(), Some("Jl. Sudirman 5"));
        assert_eq!(r.district.as_deref(), Some("Tanah Abang"));
        assert_eq!(r.city.as_deref(), Some("Jakarta Pusat"));
        assert_eq!(r.region.as_deref(), Some("DKI Jakarta"));
    }

    #[test]
    fn rural_address_uses_village_and_county() {
        let resp: ReverseResp = serde_json::from_value(json!({
            "address": {"village": "Cibodas", "county": "Bogor", "state": "Jawa Barat"}
        }))
        .unwrap();
        let r = map_response(resp).unwrap();
        assert_eq!(r.street, None);
        assert_eq!(r.location_name, None);
        assert_eq!(r.district.as_deref(), Some("Cibodas"));
        assert_eq!(r.city.as_deref(), Some("Bogor"));
    }

    #[test]
    fn error_payload_means_no_address() {
        let resp: ReverseResp =
            serde_json::from_value(json!({"error": "Unable to geocode"})).unwrap();
        assert!(map_response(resp).is_none());
    }

    #[tokio::test]
    async fn queries_reverse_endpoint_with_coordinates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("lat", "1"))
            .and(query_param("lon", "2"))
            .and(header("user-agent", "swiftflow-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Gudang A",
                "address": {"road": "Jl. Raya", "suburb": "Cempaka", "town": "Depok", "state": "Jabar"}
            })))
            .mount(&server)
            .await;

        let geo = NominatimGeocoder::new(Client::new(), &server.uri(), "swiftflow-test", "id");
        let r = geo.reverse_geocode(1.0, 2.0).await.unwrap();
        assert_eq!(r.location_name.as_deref(), Some("Gudang A"));
        assert_eq!(r.city.as_deref(), Some("Depok"));
    }

    #[tokio::test]
    async fn missing_address_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Unable to geocode"})))
            .mount(&server)
            .await;

        let geo = NominatimGeocoder::new(Client::new(), &server.uri(), "ua", "id");
        let err = geo.reverse_geocode(0.0, 0.0).await.unwrap_err();
        assert_eq!(err.message, "No address found for the given coordinates");
    }
}
