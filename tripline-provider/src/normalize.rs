//! The single producer of the canonical itinerary model. Raw provider
//! groups come in, `NormalizedCandidate`s come out; nothing downstream
//! ever branches on the upstream representation again.

use chrono::NaiveDateTime;
use tracing::warn;

use tripline_core::model::{Itinerary, Layover, Leg, PriceBreakdown, Segment};
use tripline_core::search::{MultiCityLeg, TripType};

use crate::payload::{FlightGroup, RawFlight, RawLayover};

/// A normalized itinerary that has not been priced yet. The orchestrator
/// attaches the breakdown and mints the id.
#[derive(Debug, Clone)]
pub struct NormalizedCandidate {
    pub trip_type: TripType,
    pub origin: String,
    pub destination: String,
    pub origin_city: String,
    pub destination_city: String,
    pub airlines: Vec<String>,
    pub legs: Vec<Leg>,
    pub base_fare_per_person: f64,
    pub booking_token: Option<String>,
}

impl NormalizedCandidate {
    pub fn into_itinerary(
        self,
        id: String,
        currency: String,
        price_breakdown: PriceBreakdown,
    ) -> Itinerary {
        Itinerary {
            id,
            trip_type: self.trip_type,
            origin: self.origin,
            destination: self.destination,
            origin_city: self.origin_city,
            destination_city: self.destination_city,
            airlines: self.airlines,
            legs: self.legs,
            total_price: price_breakdown.total_price,
            currency,
            price_breakdown,
            booking_token: self.booking_token,
        }
    }
}

/// Render minutes as "{h}h {m}m", dropping whichever unit is zero.
pub fn format_duration(minutes: i64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 && mins > 0 {
        format!("{hours}h {mins}m")
    } else if hours > 0 {
        format!("{hours}h")
    } else {
        format!("{mins}m")
    }
}

/// Provider timestamps are local wall-clock strings; normalize the few
/// observed shapes into one `NaiveDateTime`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
}

/// One-way result group -> single-leg candidate. Returns None when the
/// group is too malformed to materialize (no flights, unparseable times).
pub fn one_way(group: &FlightGroup, origin: &str, destination: &str) -> Option<NormalizedCandidate> {
    let leg = leg_from_group(group, origin, destination)?;
    let first = group.flights.first()?;
    let last = group.flights.last()?;

    Some(NormalizedCandidate {
        trip_type: TripType::OneWay,
        origin: origin.to_string(),
        destination: destination.to_string(),
        origin_city: airport_city(first, true),
        destination_city: airport_city(last, false),
        airlines: union_airlines(&[&leg]),
        legs: vec![leg],
        base_fare_per_person: group.price.unwrap_or(0.0),
        booking_token: group.booking_token.clone(),
    })
}

/// Outbound + dependent return group -> two-leg candidate, outbound first.
/// Base fare is the sum of both quoted prices. The caller guarantees the
/// return group actually came back with options; a candidate with no
/// return is discarded before reaching here.
pub fn round_trip(
    outbound: &FlightGroup,
    return_group: &FlightGroup,
    origin: &str,
    destination: &str,
) -> Option<NormalizedCandidate> {
    let outbound_leg = leg_from_group(outbound, origin, destination)?;
    let return_leg = leg_from_group(return_group, destination, origin)?;
    let first = outbound.flights.first()?;
    let last = outbound.flights.last()?;

    Some(NormalizedCandidate {
        trip_type: TripType::RoundTrip,
        origin: origin.to_string(),
        destination: destination.to_string(),
        origin_city: airport_city(first, true),
        destination_city: airport_city(last, false),
        airlines: union_airlines(&[&outbound_leg, &return_leg]),
        legs: vec![outbound_leg, return_leg],
        base_fare_per_person: outbound.price.unwrap_or(0.0) + return_group.price.unwrap_or(0.0),
        booking_token: outbound.booking_token.clone(),
    })
}

/// Independently fetched per-leg groups, already in requested-leg order,
/// combined into one K-leg candidate. Leg origin/destination come from the
/// request, not the payload.
pub fn multi_city(leg_groups: &[(&MultiCityLeg, &FlightGroup)]) -> Option<NormalizedCandidate> {
    let mut legs = Vec::with_capacity(leg_groups.len());
    let mut base_fare = 0.0;
    for (requested, group) in leg_groups {
        legs.push(leg_from_group(group, &requested.origin, &requested.destination)?);
        base_fare += group.price.unwrap_or(0.0);
    }

    let (first_leg, first_group) = leg_groups.first()?;
    let (last_leg, last_group) = leg_groups.last()?;
    let leg_refs: Vec<&Leg> = legs.iter().collect();

    Some(NormalizedCandidate {
        trip_type: TripType::MultiCity,
        origin: first_leg.origin.clone(),
        destination: last_leg.destination.clone(),
        origin_city: first_group
            .flights
            .first()
            .map(|f| airport_city(f, true))
            .unwrap_or_default(),
        destination_city: last_group
            .flights
            .last()
            .map(|f| airport_city(f, false))
            .unwrap_or_default(),
        airlines: union_airlines(&leg_refs),
        legs,
        base_fare_per_person: base_fare,
        booking_token: first_group.booking_token.clone(),
    })
}

fn leg_from_group(group: &FlightGroup, origin: &str, destination: &str) -> Option<Leg> {
    if group.flights.is_empty() {
        return None;
    }

    let mut segments = Vec::with_capacity(group.flights.len());
    for (index, flight) in group.flights.iter().enumerate() {
        segments.push(Segment {
            segment_number: index as u32 + 1,
            departure_airport: flight.departure_airport.id.clone()?,
            departure_at: parse_timestamp(flight.departure_airport.time.as_deref()?)?,
            arrival_airport: flight.arrival_airport.id.clone()?,
            arrival_at: parse_timestamp(flight.arrival_airport.time.as_deref()?)?,
            duration: format_duration(flight.duration?),
            cabin_class: flight
                .travel_class
                .clone()
                .unwrap_or_else(|| "Economy".to_string()),
            airlines: flight.airline.clone().into_iter().collect(),
            flight_number: flight.flight_number.clone(),
            extension_info: flight.extensions.clone(),
        });
    }

    let departure_at = segments.first()?.departure_at;
    let arrival_at = segments.last()?.arrival_at;

    let total_minutes = group
        .total_duration
        .unwrap_or_else(|| (arrival_at - departure_at).num_minutes());

    let layovers = reconciled_layovers(&group.layovers, &segments)?;

    Some(Leg {
        departure_at,
        arrival_at,
        origin: origin.to_string(),
        destination: destination.to_string(),
        total_duration: format_duration(total_minutes),
        stops: segments.len() as u32 - 1,
        segments,
        layovers,
    })
}

/// Layover durations must agree with the gap between adjacent segments.
/// A quoted list that does not reconcile (missing, wrong length, or more
/// than a minute off any gap) is replaced by the derived one. A negative
/// gap means the segment timestamps are out of order and the whole group
/// is unusable.
fn reconciled_layovers(quoted: &[RawLayover], segments: &[Segment]) -> Option<Vec<Layover>> {
    let mut gaps = Vec::with_capacity(segments.len().saturating_sub(1));
    for pair in segments.windows(2) {
        let gap = (pair[1].departure_at - pair[0].arrival_at).num_minutes();
        if gap < 0 {
            warn!("Segment timestamps out of order, discarding group");
            return None;
        }
        gaps.push((pair[0].arrival_airport.clone(), gap));
    }

    let quoted_matches = !quoted.is_empty()
        && quoted.len() == gaps.len()
        && quoted
            .iter()
            .zip(gaps.iter())
            .all(|(lay, (_, gap))| lay.duration.is_some_and(|d| (d - gap).abs() <= 1));

    if quoted_matches {
        return Some(
            quoted
                .iter()
                .zip(gaps)
                .map(|(lay, (airport, _))| Layover {
                    layover_airport: lay.id.clone().or_else(|| lay.name.clone()).unwrap_or(airport),
                    layover_duration: format_duration(lay.duration.unwrap_or(0)),
                })
                .collect(),
        );
    }

    if !quoted.is_empty() {
        warn!("Quoted layovers disagree with the segment timetable, deriving from gaps");
    }
    Some(
        gaps.into_iter()
            .map(|(airport, gap)| Layover {
                layover_airport: airport,
                layover_duration: format_duration(gap),
            })
            .collect(),
    )
}

/// Airline set unioned over every segment of every leg, so interline and
/// codeshare itineraries list every carrier.
fn union_airlines(legs: &[&Leg]) -> Vec<String> {
    let mut airlines: Vec<String> = Vec::new();
    for leg in legs {
        for segment in &leg.segments {
            for airline in &segment.airlines {
                if !airlines.contains(airline) {
                    airlines.push(airline.clone());
                }
            }
        }
    }
    airlines
}

fn airport_city(flight: &RawFlight, departure: bool) -> String {
    let airport = if departure {
        &flight.departure_airport
    } else {
        &flight.arrival_airport
    };
    airport
        .city
        .clone()
        .or_else(|| airport.name.clone())
        .or_else(|| airport.id.clone())
        .unwrap_or_default()
}
