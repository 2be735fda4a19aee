//! Session handlers
//!
//! Each step takes the session lock only to check and apply a transition.
//! Analysis and ledger submission run between those two critical sections,
//! inside a spawned task that owns the completion, so a dropped request
//! cannot leave the session mid-step.

use std::future::Future;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::logic::assessor::assess;
use crate::logic::ledger::{self, LedgerError};
use crate::logic::proof::{self, ProofWitness};
use crate::logic::session::{Session, SessionError, VerificationOutcome};
use crate::middleware::wallet::WalletContext;
use crate::models::{AnalyzeRequest, SessionView, SubmitVoteRequest, Vote, VoteRequest};
use crate::store::SessionStore;
use crate::{AppError, AppResult, AppState};

fn with_session<R>(
    state: &AppState,
    id: Uuid,
    f: impl FnOnce(&mut Session) -> Result<R, SessionError>,
) -> AppResult<R> {
    apply(&state.sessions, id, f)
}

fn apply<R>(
    sessions: &SessionStore,
    id: Uuid,
    f: impl FnOnce(&mut Session) -> Result<R, SessionError>,
) -> AppResult<R> {
    sessions
        .update(id, f)
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?
        .map_err(AppError::from)
}

fn view(state: &AppState, id: Uuid) -> AppResult<Json<SessionView>> {
    state
        .sessions
        .snapshot(id)
        .map(|s| Json(SessionView::from(&s)))
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
}

/// Fails the session if a step ends without reaching `complete` or `fail`,
/// for instance when it panics.
struct StepGuard {
    sessions: SessionStore,
    id: Uuid,
    settled: bool,
}

impl StepGuard {
    fn new(sessions: SessionStore, id: Uuid) -> Self {
        Self { sessions, id, settled: false }
    }

    fn complete<R>(
        mut self,
        f: impl FnOnce(&mut Session) -> Result<R, SessionError>,
    ) -> AppResult<R> {
        self.settled = true;
        apply(&self.sessions, self.id, f)
    }

    fn fail(mut self, error: LedgerError, step: &str) -> AppError {
        self.settled = true;
        tracing::warn!("{} for session {} failed: {}", step, self.id, error);
        let message = error.to_string();
        self.sessions.update(self.id, |s| s.fail(message));
        error.into()
    }
}

impl Drop for StepGuard {
    fn drop(&mut self) {
        if !self.settled {
            tracing::error!("Step for session {} ended without completing", self.id);
            self.sessions.update(self.id, |s| s.fail("Step interrupted before completion"));
        }
    }
}

/// Run a step to completion even if the request that started it goes away
async fn run_step<T>(step: impl Future<Output = AppResult<T>> + Send + 'static) -> AppResult<T>
where
    T: Send + 'static,
{
    tokio::spawn(step)
        .await
        .map_err(|e| AppError::InternalError(format!("Step aborted: {}", e)))?
}

/// Start a new idle session
pub async fn create(State(state): State<AppState>) -> AppResult<(StatusCode, Json<SessionView>)> {
    let session = state.sessions.create()?;
    Ok((StatusCode::CREATED, Json(SessionView::from(&session))))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    view(&state, id)
}

/// Analyze a domain: idle → generating → pending_vote
pub async fn analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    wallet: Option<WalletContext>,
    Json(req): Json<AnalyzeRequest>,
) -> AppResult<Json<SessionView>> {
    req.validate()?;

    let domain = with_session(&state, id, |s| s.begin_generation(&req.domain, wallet.is_some()))?;
    tracing::info!("Session {} analyzing {}", id, domain);

    let guard = StepGuard::new(state.sessions.clone(), id);
    let analyzer = state.analyzer.clone();
    run_step(async move {
        let analysis = analyzer.analyze(&domain).await;
        let assessment = assess(&analysis);
        let witness = ProofWitness::generate(&analysis);
        tracing::debug!(
            "Session {} scored {} (risk {}), recommendation {:?}",
            id,
            analysis.transparency_score,
            analysis.risk_level,
            assessment.recommendation
        );

        guard.complete(|s| s.complete_generation(analysis, assessment, witness))
    })
    .await?;

    view(&state, id)
}

/// Prepare the session's single vote for the wallet to sign. The session
/// stays in pending_vote with the unsigned transaction attached.
pub async fn vote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    wallet: WalletContext,
    Json(req): Json<VoteRequest>,
) -> AppResult<Json<SessionView>> {
    req.validate()?;
    let vote = Vote::from(&req);

    let inputs = with_session(&state, id, |s| s.begin_vote(&vote))?;
    tracing::info!(
        "Wallet {} voting {} on {}",
        wallet.pubkey,
        if vote.is_legitimate { "legitimate" } else { "not legitimate" },
        inputs.analysis.domain
    );

    let guard = StepGuard::new(state.sessions.clone(), id);
    let attestation = state.attestation.clone();
    run_step(async move {
        match attestation
            .prepare_vote(&inputs.analysis, &inputs.witness, &inputs.vote, &wallet.pubkey)
            .await
        {
            Ok(prepared) => guard.complete(|s| s.stage_vote(inputs.vote, prepared)),
            Err(e) => Err(guard.fail(e, "Vote preparation")),
        }
    })
    .await?;

    view(&state, id)
}

/// Submit the wallet-signed vote: pending_vote → success
pub async fn submit_vote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    wallet: WalletContext,
    Json(req): Json<SubmitVoteRequest>,
) -> AppResult<Json<SessionView>> {
    req.validate()?;
    let signed = ledger::decode_signed(&req.signed_transaction)?;

    let staged = with_session(&state, id, |s| s.begin_vote_submission(&wallet.pubkey, &signed))?;

    let guard = StepGuard::new(state.sessions.clone(), id);
    let attestation = state.attestation.clone();
    run_step(async move {
        match attestation.submit_signed_vote(&staged.prepared, signed).await {
            Ok(transaction) => guard.complete(|s| s.record_vote(staged.vote, transaction)),
            Err(e) => Err(guard.fail(e, "Vote submission")),
        }
    })
    .await?;

    view(&state, id)
}

/// Verify the proof and attest the result: success → verification_complete
pub async fn verify(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    wallet: WalletContext,
) -> AppResult<Json<SessionView>> {
    let inputs = with_session(&state, id, |s| s.begin_verification())?;
    let check = proof::verify(&inputs.witness, &inputs.analysis, &inputs.assessment, &inputs.vote);
    tracing::info!(
        "Wallet {} verifying {}: valid={}",
        wallet.pubkey,
        inputs.analysis.domain,
        check.is_valid
    );

    let guard = StepGuard::new(state.sessions.clone(), id);
    let attestation = state.attestation.clone();
    run_step(async move {
        match attestation.submit_verification(&inputs.witness, &check).await {
            Ok(transaction) => {
                if transaction.is_none() {
                    tracing::info!(
                        "{} already attested, keeping the existing proof record",
                        inputs.analysis.domain
                    );
                }
                let outcome = VerificationOutcome {
                    check,
                    transaction,
                    verified_at: Utc::now(),
                };
                guard.complete(|s| s.complete_verification(outcome))
            }
            Err(e) => Err(guard.fail(e, "Verification submission")),
        }
    })
    .await?;

    view(&state, id)
}

/// Back to idle, keeping the analyzed-domain set
pub async fn reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    with_session(&state, id, |s| s.reset())?;
    view(&state, id)
}

/// Leave the error state for the last stable one
pub async fn recover(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let status = with_session(&state, id, |s| s.recover())?;
    tracing::info!("Session {} recovered to {}", id, status);
    view(&state, id)
}
