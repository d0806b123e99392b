use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use tripline_core::context::ContextStore;
use tripline_core::model::Itinerary;
use tripline_core::pricing::{compute_breakdown, FareMultipliers, PassengerCounts};
use tripline_core::search::{SearchRequest, TripType};
use tripline_core::{EngineError, EngineResult};

use crate::client::{ProviderError, ProviderQuery, SearchProvider};
use crate::normalize::{self, NormalizedCandidate};
use crate::payload::FlightGroup;

/// Classifies a search request, drives the provider with the right fetch
/// strategy, normalizes and prices the results, and caches every
/// itinerary in the session context for later selection turns.
pub struct SearchOrchestrator {
    provider: Arc<dyn SearchProvider>,
    context: Arc<dyn ContextStore>,
    fares: FareMultipliers,
    /// Ranked result groups kept per provider call.
    max_results: usize,
    /// Concurrent multi-city leg fetches in flight.
    max_in_flight: usize,
}

impl SearchOrchestrator {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        context: Arc<dyn ContextStore>,
        fares: FareMultipliers,
    ) -> Self {
        Self { provider, context, fares, max_results: 3, max_in_flight: 4 }
    }

    pub async fn search(
        &self,
        user_id: &str,
        conversation_id: &str,
        request: &SearchRequest,
    ) -> EngineResult<Vec<Itinerary>> {
        let trip_type = request.trip_type()?;
        info!(?trip_type, user_id, conversation_id, "Dispatching flight search");

        let candidates = match trip_type {
            TripType::OneWay => self.search_one_way(request).await?,
            TripType::RoundTrip => self.search_round_trip(request).await?,
            TripType::MultiCity => self.search_multi_city(request).await?,
        };

        if candidates.is_empty() {
            return Err(EngineError::NoResults);
        }

        let counts = PassengerCounts {
            adults: request.adults,
            children: request.children,
            infants: request.infants,
        };

        let mut itineraries = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let breakdown = compute_breakdown(candidate.base_fare_per_person, counts, &self.fares);
            let itinerary = candidate.into_itinerary(
                Uuid::new_v4().to_string(),
                request.currency.clone(),
                breakdown,
            );

            let value = serde_json::to_value(&itinerary)
                .map_err(|e| EngineError::Internal(format!("itinerary serialization: {e}")))?;
            self.context
                .set(user_id, conversation_id, &Itinerary::context_key(&itinerary.id), value)
                .await?;

            itineraries.push(itinerary);
        }

        info!(count = itineraries.len(), "Search produced itineraries");
        Ok(itineraries)
    }

    async fn search_one_way(&self, request: &SearchRequest) -> EngineResult<Vec<NormalizedCandidate>> {
        let query = self.point_to_point_query(request, TripType::OneWay)?;
        let groups = self.fetch_groups(&query).await?;

        Ok(groups
            .iter()
            .filter_map(|group| normalize::one_way(group, &query.origin, &query.destination))
            .collect())
    }

    /// The return fetch depends on the outbound candidate's continuation
    /// token, so outbound-then-return is sequential by necessity; the
    /// per-candidate return fetches are independent and run together.
    async fn search_round_trip(
        &self,
        request: &SearchRequest,
    ) -> EngineResult<Vec<NormalizedCandidate>> {
        let outbound_query = self.point_to_point_query(request, TripType::RoundTrip)?;
        let outbound_groups = self.fetch_groups(&outbound_query).await?;

        let return_fetches = outbound_groups.iter().map(|group| {
            let mut return_query = outbound_query.clone();
            async move {
                let token = match &group.departure_token {
                    Some(token) => token.clone(),
                    None => {
                        warn!("Outbound candidate without continuation token, discarding");
                        return None;
                    }
                };
                return_query.departure_token = Some(token);

                match self.provider.search(&return_query).await {
                    Ok(response) => {
                        let returns = response.ranked_groups();
                        let best_return = returns.first()?;
                        normalize::round_trip(
                            group,
                            best_return,
                            &return_query.origin,
                            &return_query.destination,
                        )
                    }
                    Err(e) => {
                        // Abandon this candidate only; siblings still count.
                        warn!("Return fetch failed, discarding candidate: {e}");
                        None
                    }
                }
            }
        });

        Ok(join_all(return_fetches).await.into_iter().flatten().collect())
    }

    /// Multi-city legs have no data dependency on each other: fetch them
    /// concurrently under a bounded pool and reassemble in requested-leg
    /// order regardless of completion order.
    async fn search_multi_city(
        &self,
        request: &SearchRequest,
    ) -> EngineResult<Vec<NormalizedCandidate>> {
        let legs = request
            .multi_city_legs
            .as_ref()
            .ok_or_else(|| EngineError::Validation("multi-city legs missing".to_string()))?;

        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let fetches = legs.iter().map(|leg| {
            let semaphore = Arc::clone(&semaphore);
            let query = ProviderQuery {
                origin: leg.origin.clone(),
                destination: leg.destination.clone(),
                outbound_date: leg.departure_date,
                return_date: None,
                trip_type: TripType::OneWay,
                adults: request.adults,
                cabin_class: request.cabin_class.clone(),
                currency: request.currency.clone(),
                departure_token: None,
            };
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| ProviderError::Transient("search pool closed".to_string()))?;
                self.provider
                    .search(&query)
                    .await
                    .map(|response| response.ranked_groups())
            }
        });

        let mut per_leg: Vec<Vec<FlightGroup>> = Vec::with_capacity(legs.len());
        for (index, outcome) in join_all(fetches).await.into_iter().enumerate() {
            let groups = outcome.map_err(|e| {
                warn!(leg_index = index, "Multi-city leg fetch failed: {e}");
                to_engine(e)
            })?;
            per_leg.push(groups.into_iter().take(self.max_results).collect());
        }

        // A requested leg with zero usable options fails the whole search;
        // never emit an itinerary short of the requested leg count.
        if per_leg.iter().any(|groups| groups.is_empty()) {
            return Err(EngineError::NoResults);
        }

        let combinations = per_leg
            .iter()
            .map(|groups| groups.len())
            .min()
            .unwrap_or(0)
            .min(self.max_results);

        Ok((0..combinations)
            .filter_map(|rank| {
                let paired: Vec<_> = legs
                    .iter()
                    .zip(per_leg.iter())
                    .map(|(leg, groups)| (leg, &groups[rank]))
                    .collect();
                normalize::multi_city(&paired)
            })
            .collect())
    }

    async fn fetch_groups(&self, query: &ProviderQuery) -> EngineResult<Vec<FlightGroup>> {
        let response = self.provider.search(query).await.map_err(to_engine)?;
        Ok(response
            .ranked_groups()
            .into_iter()
            .take(self.max_results)
            .collect())
    }

    fn point_to_point_query(
        &self,
        request: &SearchRequest,
        trip_type: TripType,
    ) -> EngineResult<ProviderQuery> {
        let missing = || EngineError::Validation("origin, destination and departure_date are required".to_string());
        Ok(ProviderQuery {
            origin: request.origin.clone().ok_or_else(missing)?,
            destination: request.destination.clone().ok_or_else(missing)?,
            outbound_date: request.departure_date.ok_or_else(missing)?,
            return_date: request.return_date,
            trip_type,
            adults: request.adults,
            cabin_class: request.cabin_class.clone(),
            currency: request.currency.clone(),
            departure_token: None,
        })
    }
}

/// Keep upstream detail out of surfaced messages; raw payloads never leak.
fn to_engine(e: ProviderError) -> EngineError {
    match e {
        ProviderError::Transient(_) => {
            EngineError::ProviderUnavailable("search provider did not respond".to_string())
        }
        ProviderError::Terminal(_) => {
            EngineError::ProviderUnavailable("search provider rejected the request".to_string())
        }
    }
}
