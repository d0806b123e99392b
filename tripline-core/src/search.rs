use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    OneWay,
    RoundTrip,
    MultiCity,
}

impl TripType {
    /// Provider wire code: 1 round-trip, 2 one-way, 3 multi-city.
    pub fn provider_code(self) -> u8 {
        match self {
            TripType::RoundTrip => 1,
            TripType::OneWay => 2,
            TripType::MultiCity => 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    /// When present, the point-to-point fields above are ignored.
    pub multi_city_legs: Option<Vec<MultiCityLeg>>,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub infants: u32,
    pub cabin_class: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_adults() -> u32 {
    1
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiCityLeg {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    /// Optional provider time-window filter, passed through opaquely.
    pub times: Option<String>,
}

impl SearchRequest {
    /// Classify the request. A supplied multi-city list wins over the
    /// point-to-point fields; otherwise a return date means round-trip.
    pub fn trip_type(&self) -> EngineResult<TripType> {
        if let Some(legs) = &self.multi_city_legs {
            if legs.len() < 2 {
                return Err(EngineError::Validation(
                    "multi-city search requires at least 2 legs".to_string(),
                ));
            }
            return Ok(TripType::MultiCity);
        }

        if self.origin.is_none() || self.destination.is_none() || self.departure_date.is_none() {
            return Err(EngineError::Validation(
                "origin, destination and departure_date are required".to_string(),
            ));
        }

        if self.return_date.is_some() {
            Ok(TripType::RoundTrip)
        } else {
            Ok(TripType::OneWay)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> SearchRequest {
        serde_json::from_str(
            r#"
            {
                "origin": "JFK",
                "destination": "LHR",
                "departure_date": "2025-12-25",
                "adults": 2
            }
        "#,
        )
        .expect("Failed to deserialize")
    }

    #[test]
    fn one_way_when_no_return_date() {
        let req = base_request();
        assert_eq!(req.trip_type().unwrap(), TripType::OneWay);
        assert_eq!(req.departure_date, NaiveDate::from_ymd_opt(2025, 12, 25));
    }

    #[test]
    fn round_trip_when_return_date_present() {
        let mut req = base_request();
        req.return_date = NaiveDate::from_ymd_opt(2026, 1, 5);
        assert_eq!(req.trip_type().unwrap(), TripType::RoundTrip);
    }

    #[test]
    fn multi_city_list_wins_over_point_to_point_fields() {
        let mut req = base_request();
        req.return_date = NaiveDate::from_ymd_opt(2026, 1, 5);
        req.multi_city_legs = Some(vec![
            MultiCityLeg {
                origin: "JFK".into(),
                destination: "CDG".into(),
                departure_date: NaiveDate::from_ymd_opt(2025, 12, 25).unwrap(),
                times: None,
            },
            MultiCityLeg {
                origin: "CDG".into(),
                destination: "FCO".into(),
                departure_date: NaiveDate::from_ymd_opt(2025, 12, 30).unwrap(),
                times: None,
            },
        ]);
        assert_eq!(req.trip_type().unwrap(), TripType::MultiCity);
    }

    #[test]
    fn multi_city_with_single_leg_is_rejected() {
        let mut req = base_request();
        req.multi_city_legs = Some(vec![MultiCityLeg {
            origin: "JFK".into(),
            destination: "CDG".into(),
            departure_date: NaiveDate::from_ymd_opt(2025, 12, 25).unwrap(),
            times: None,
        }]);
        assert!(matches!(req.trip_type(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn missing_point_to_point_fields_are_rejected() {
        let req: SearchRequest = serde_json::from_str(r#"{"adults": 1}"#).unwrap();
        assert!(matches!(req.trip_type(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn provider_codes_match_wire_contract() {
        assert_eq!(TripType::RoundTrip.provider_code(), 1);
        assert_eq!(TripType::OneWay.provider_code(), 2);
        assert_eq!(TripType::MultiCity.provider_code(), 3);
    }
}
