//! Tolerant serde mirror of the upstream search payload. Shapes here stay
//! inside this crate; the normalizer is the only consumer.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub best_flights: Vec<FlightGroup>,
    #[serde(default)]
    pub other_flights: Vec<FlightGroup>,
}

impl ProviderResponse {
    /// The provider splits results into a ranked "best" list and a spill
    /// list; take the best list when non-empty, else fall back.
    pub fn ranked_groups(self) -> Vec<FlightGroup> {
        if self.best_flights.is_empty() {
            self.other_flights
        } else {
            self.best_flights
        }
    }
}

/// One ranked result group: the ordered physical flights of a leg plus
/// pricing, layovers and, for round-trip outbound results, a token that
/// links to the matching return search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlightGroup {
    #[serde(default)]
    pub flights: Vec<RawFlight>,
    #[serde(default)]
    pub layovers: Vec<RawLayover>,
    #[serde(default, deserialize_with = "minutes_field")]
    pub total_duration: Option<i64>,
    pub price: Option<f64>,
    pub departure_token: Option<String>,
    pub booking_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFlight {
    #[serde(default)]
    pub departure_airport: RawAirport,
    #[serde(default)]
    pub arrival_airport: RawAirport,
    #[serde(default, deserialize_with = "minutes_field")]
    pub duration: Option<i64>,
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub travel_class: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAirport {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Local wall-clock time, "YYYY-MM-DD HH:MM".
    pub time: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLayover {
    #[serde(default, deserialize_with = "minutes_field")]
    pub duration: Option<i64>,
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Durations arrive as integer minutes from some provider revisions and
/// as "135 min" strings from others.
fn minutes_field<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Minutes {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Minutes>::deserialize(deserializer)? {
        Some(Minutes::Number(n)) => Some(n),
        Some(Minutes::Text(s)) => s.trim().trim_end_matches("min").trim().parse().ok(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranked_groups_fall_back_to_other_flights() {
        let response: ProviderResponse = serde_json::from_value(serde_json::json!({
            "other_flights": [{ "price": 420.0 }]
        }))
        .unwrap();
        let groups = response.ranked_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].price, Some(420.0));
    }

    #[test]
    fn duration_accepts_integer_and_min_suffixed_string() {
        let group: FlightGroup = serde_json::from_value(serde_json::json!({
            "total_duration": 135,
            "flights": [{ "duration": "95 min" }]
        }))
        .unwrap();
        assert_eq!(group.total_duration, Some(135));
        assert_eq!(group.flights[0].duration, Some(95));
    }

    #[test]
    fn unparseable_duration_string_becomes_none() {
        let group: FlightGroup = serde_json::from_value(serde_json::json!({
            "total_duration": "soon"
        }))
        .unwrap();
        assert_eq!(group.total_duration, None);
    }
}
