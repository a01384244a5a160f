//! Challenge widget support for the presentation layer.

use axum::{Json, extract::State};
use tower_cookies::Cookies;

use gatehouse_common::ChallengeStatus;

use crate::state::AppState;

/// Tell the UI whether to render the challenge widget.
///
/// Only checks that a verification cookie exists; the gate still validates it
/// on the next protected request.
pub async fn challenge_status(State(state): State<AppState>, cookies: Cookies) -> Json<ChallengeStatus> {
    Json(ChallengeStatus {
        display_challenge: !state.gate.has_verification_cookie(&cookies),
        site_key: state.config.recaptcha.public_key.clone(),
    })
}
