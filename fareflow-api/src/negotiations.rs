use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use fareflow_negotiation::{SessionRole, SessionView};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub trip_id: String,
    pub original_price: f64,
    pub role: SessionRole,
}

#[derive(Debug, Deserialize)]
pub struct OfferRequest {
    pub price: f64,
    pub party: SessionRole,
}

/// POST /v1/negotiations
/// Open a bargaining session anchored on the quoted trip price. The
/// settled price is reported to the booking side through the
/// completion hook when the session leaves `ACTIVE`.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let trip_id = req.trip_id.clone();
    let id = state
        .negotiations
        .create_session(
            &req.trip_id,
            req.original_price,
            req.role,
            Box::new(move |price, accepted| {
                // Boundary to the booking subsystem: it locks in the
                // trip at this price
                tracing::info!(%trip_id, price, accepted, "negotiation settled");
            }),
        )
        .await?;

    let view = state.negotiations.view(id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /v1/negotiations/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.negotiations.view(id)?))
}

/// POST /v1/negotiations/{id}/offers
pub async fn make_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OfferRequest>,
) -> Result<Json<SessionView>, AppError> {
    state.negotiations.make_offer(id, req.price, req.party)?;
    Ok(Json(state.negotiations.view(id)?))
}

/// POST /v1/negotiations/{id}/accept
pub async fn accept(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    state.negotiations.accept_current_offer(id)?;
    Ok(Json(state.negotiations.view(id)?))
}

/// POST /v1/negotiations/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    state.negotiations.reject(id)?;
    Ok(Json(state.negotiations.view(id)?))
}

/// DELETE /v1/negotiations/{id}
/// Early shutdown when the trip itself is cancelled
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    state.negotiations.close_session(id)?;
    Ok(Json(state.negotiations.view(id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use fareflow_shared::NegotiationStatus;

    async fn open_session(state: &AppState) -> Uuid {
        let (_, Json(view)) = create_session(
            State(state.clone()),
            Json(CreateSessionRequest {
                trip_id: "trip-1".to_string(),
                original_price: 50.0,
                role: SessionRole::Counterparty,
            }),
        )
        .await
        .unwrap();
        view.id
    }

    #[tokio::test]
    async fn test_create_and_fetch_session() {
        let state = test_state();
        let id = open_session(&state).await;

        let Json(view) = get_session(State(state), Path(id)).await.unwrap();
        assert_eq!(view.status, NegotiationStatus::Active);
        assert_eq!(view.current_offer, 50.0);
        assert_eq!(view.min_acceptable, 40.0);
        assert_eq!(view.max_acceptable, 60.0);
    }

    #[tokio::test]
    async fn test_offer_then_accept_flow() {
        let state = test_state();
        let id = open_session(&state).await;

        let Json(view) = make_offer(
            State(state.clone()),
            Path(id),
            Json(OfferRequest {
                price: 70.0, // outside the window, always countered
                party: SessionRole::Counterparty,
            }),
        )
        .await
        .unwrap();
        assert_eq!(view.status, NegotiationStatus::Active);
        assert!(view.current_offer <= view.max_acceptable);

        let Json(view) = accept(State(state), Path(id)).await.unwrap();
        assert_eq!(view.status, NegotiationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let state = test_state();
        let result = get_session(State(state), Path(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_offer_after_reject_conflicts() {
        let state = test_state();
        let id = open_session(&state).await;

        let Json(view) = reject(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(view.status, NegotiationStatus::Rejected);

        let result = make_offer(
            State(state),
            Path(id),
            Json(OfferRequest {
                price: 45.0,
                party: SessionRole::Counterparty,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
