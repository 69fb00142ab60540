// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fill and save session controller.
//
// A fill request moves Received → Parsed → Classified and then ends in one
// of NoOp, NeedsAuthentication or DirectFill before the response goes back
// to the OS.  NeedsAuthentication suspends: the context is parked in the
// hand-off slot and the resume path picks it up once the user has unlocked
// the vault and chosen a credential.
//
// Nothing here may fail towards the OS.  Every fault collapses into a NoOp,
// which the user sees as "no suggestion".

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use locker_core::config::AutofillConfig;
use locker_core::error::{LockerError, Result};
use locker_core::types::{
    AuthenticationHandle, CredentialRecord, FieldModel, RequestId, SaveCandidate, SiteIdentity,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::classifier::{Classification, FieldClassifier};
use crate::handoff::{HandoffContext, HandoffSlot};
use crate::host::AutofillHost;
use crate::response::{Dataset, FillResponse, InlineCapability, ResponseBuilder};
use crate::snapshot::{ViewSnapshot, split_snapshot};
use crate::walker::{StructureWalker, WalkResult};

/// Protocol states of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Received,
    Parsed,
    Classified,
    NoOp,
    NeedsAuthentication,
    DirectFill,
    Responded,
}

/// Why a request ended without a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoOpReason {
    ParseFailure,
    NoFillableFields,
    Denylisted,
    VaultUnavailable,
    NoLoginPair,
    Fault,
}

/// A fill request as delivered by the platform service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FillRequest {
    pub request_id: RequestId,
    pub snapshot: ViewSnapshot,
    pub inline: Option<InlineCapability>,
}

impl FillRequest {
    pub fn new(snapshot: ViewSnapshot) -> Self {
        Self {
            request_id: RequestId::new(),
            snapshot,
            inline: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let (snapshot, envelope) = split_snapshot(json)?;
        let mut request: Self = serde_json::from_value(Value::Object(envelope))
            .map_err(|e| LockerError::Parse(e.to_string()))?;
        request.snapshot = snapshot;
        Ok(request)
    }
}

/// A save request: the snapshot taken when the user submitted the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SaveRequest {
    pub request_id: RequestId,
    pub snapshot: ViewSnapshot,
}

impl SaveRequest {
    pub fn new(snapshot: ViewSnapshot) -> Self {
        Self {
            request_id: RequestId::new(),
            snapshot,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let (snapshot, envelope) = split_snapshot(json)?;
        let mut request: Self = serde_json::from_value(Value::Object(envelope))
            .map_err(|e| LockerError::Parse(e.to_string()))?;
        request.snapshot = snapshot;
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    NoOp(NoOpReason),
    NeedsAuthentication {
        response: FillResponse,
        handle: AuthenticationHandle,
    },
    DirectFill {
        response: FillResponse,
    },
}

impl FillOutcome {
    pub fn state(&self) -> SessionState {
        match self {
            Self::NoOp(_) => SessionState::NoOp,
            Self::NeedsAuthentication { .. } => SessionState::NeedsAuthentication,
            Self::DirectFill { .. } => SessionState::DirectFill,
        }
    }

    /// What the OS callback receives. `None` means "nothing to fill".
    pub fn into_response(self) -> Option<FillResponse> {
        match self {
            Self::NoOp(_) => None,
            Self::NeedsAuthentication { response, .. } | Self::DirectFill { response } => {
                Some(response)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    NoOp(NoOpReason),
    /// Handed to the save confirmation screen.
    Delegated(SaveCandidate),
}

/// Result of the interactive unlock and pick step.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveResult {
    Chosen(CredentialRecord),
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// The token no longer matches the parked context.
    StaleHandoff,
    Dismissed,
    NoCredential,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    /// Unlocked dataset to return as the authentication result.
    Filled(Dataset),
    Cancelled(CancelReason),
}

/// Per-process controller; each request is an independent activation.
pub struct FillSessionController<H> {
    config: AutofillConfig,
    builder: ResponseBuilder,
    host: H,
    handoff: Arc<HandoffSlot>,
}

impl<H: AutofillHost> FillSessionController<H> {
    pub fn new(config: AutofillConfig, host: H, handoff: Arc<HandoffSlot>) -> Self {
        let builder = ResponseBuilder::new(&config);
        Self {
            config,
            builder,
            host,
            handoff,
        }
    }

    pub fn config(&self) -> &AutofillConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn handoff(&self) -> &HandoffSlot {
        &self.handoff
    }

    // -- Fill path --

    /// Run a fill request to its outcome.
    #[instrument(skip_all, fields(request_id = %request.request_id))]
    pub fn handle_fill(&self, request: &FillRequest) -> FillOutcome {
        enter(SessionState::Received);
        let (site, classification) = match self.parse_and_classify(&request.snapshot) {
            Ok(parsed) => parsed,
            Err(reason) => return no_op(reason),
        };
        let Some(fillable) = classification.into_fillable() else {
            return no_op(NoOpReason::NoFillableFields);
        };

        if !self.host.vault_available() {
            return no_op(NoOpReason::VaultUnavailable);
        }

        if let Some(record) = self.last_used(&site) {
            match self
                .builder
                .populated_dataset(&fillable, &record, request.inline.as_ref())
            {
                Ok(dataset) => {
                    enter(SessionState::DirectFill);
                    return FillOutcome::DirectFill {
                        response: self.builder.fill_response(dataset, &fillable),
                    };
                }
                Err(e) => warn!(error = %e, "direct fill failed, falling back to unlock"),
            }
        }

        let handle = self.handoff.publish(HandoffContext {
            request_id: request.request_id,
            site,
            fields: fillable.clone(),
        });
        match self
            .builder
            .locked_dataset(&fillable, handle, request.inline.as_ref())
        {
            Ok(dataset) => {
                enter(SessionState::NeedsAuthentication);
                FillOutcome::NeedsAuthentication {
                    response: self.builder.fill_response(dataset, &fillable),
                    handle,
                }
            }
            Err(e) => {
                warn!(error = %e, "could not build locked dataset");
                self.handoff.claim(handle);
                no_op(NoOpReason::Fault)
            }
        }
    }

    /// Decode a JSON fill request and run it. Undecodable input is a NoOp.
    pub fn handle_fill_json(&self, json: &str) -> FillOutcome {
        match FillRequest::from_json(json) {
            Ok(request) => self.handle_fill(&request),
            Err(e) => {
                warn!(error = %e, "fill request could not be decoded");
                no_op(NoOpReason::ParseFailure)
            }
        }
    }

    /// OS entry point. `callback` runs exactly once, even if processing
    /// panics.
    pub fn on_fill_request<F>(&self, request: FillRequest, callback: F)
    where
        F: FnOnce(Option<FillResponse>),
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.handle_fill(&request)))
            .unwrap_or_else(|_| {
                warn!(request_id = %request.request_id, "fill request panicked");
                FillOutcome::NoOp(NoOpReason::Fault)
            });
        let response = outcome.into_response();
        enter(SessionState::Responded);
        callback(response);
    }

    // -- Save path --

    #[instrument(skip_all, fields(request_id = %request.request_id))]
    pub fn handle_save(&self, request: &SaveRequest) -> SaveOutcome {
        let (site, classification) = match self.parse_and_classify(&request.snapshot) {
            Ok(parsed) => parsed,
            Err(reason) => return SaveOutcome::NoOp(reason),
        };

        let Some((identifier, password)) = classification.login_pair() else {
            debug!("no identifier followed by a password");
            return SaveOutcome::NoOp(NoOpReason::NoLoginPair);
        };
        let Some(secret) = submitted_text(password) else {
            debug!("password field is empty");
            return SaveOutcome::NoOp(NoOpReason::NoLoginPair);
        };

        let candidate = SaveCandidate {
            site,
            username: submitted_text(identifier),
            password: Some(secret),
        };
        match self.host.start_save_confirmation(&candidate) {
            Ok(()) => {
                info!(site = candidate.site.label().unwrap_or("<unknown>"), "save delegated");
                SaveOutcome::Delegated(candidate)
            }
            Err(e) => {
                warn!(error = %e, "save confirmation could not be started");
                SaveOutcome::NoOp(NoOpReason::Fault)
            }
        }
    }

    pub fn on_save_request<F>(&self, request: SaveRequest, callback: F)
    where
        F: FnOnce(SaveOutcome),
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.handle_save(&request)))
            .unwrap_or_else(|_| {
                warn!(request_id = %request.request_id, "save request panicked");
                SaveOutcome::NoOp(NoOpReason::Fault)
            });
        callback(outcome);
    }

    // -- Resume path --

    /// Finish a suspended fill with the result of the interactive step.
    #[instrument(skip_all, fields(handle = %handle))]
    pub fn complete_authentication(
        &self,
        handle: AuthenticationHandle,
        result: InteractiveResult,
        inline: Option<&InlineCapability>,
    ) -> ResumeOutcome {
        let Some(context) = self.handoff.claim(handle) else {
            return cancelled(CancelReason::StaleHandoff);
        };
        let InteractiveResult::Chosen(mut record) = result else {
            return cancelled(CancelReason::Dismissed);
        };

        let dataset = match self.builder.populated_dataset(&context.fields, &record, inline) {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!(error = %e, "chosen credential could not be applied");
                return cancelled(CancelReason::NoCredential);
            }
        };

        if self.config.use_last_used_cache {
            record.last_used_at = Some(Utc::now());
            if let Err(e) = self.host.cache_last_used(&context.site, &record) {
                warn!(error = %e, "last-used credential not cached");
            }
        }

        info!(request_id = %context.request_id, "authentication completed");
        ResumeOutcome::Filled(dataset)
    }

    /// Drive the interactive step through the host, then complete it.
    ///
    /// Verification comes first. When the vault holds more than one login
    /// for the site, the selector follows and its pick wins.
    #[instrument(skip_all, fields(handle = %handle))]
    pub fn run_interactive(
        &self,
        handle: AuthenticationHandle,
        inline: Option<&InlineCapability>,
    ) -> ResumeOutcome {
        let Some(site) = self.handoff.site_for(handle) else {
            return cancelled(CancelReason::StaleHandoff);
        };

        let result = self.interact(&site);
        self.complete_authentication(handle, result, inline)
    }

    fn interact(&self, site: &SiteIdentity) -> InteractiveResult {
        let verified = match self.host.present_authentication(site) {
            Ok(Some(record)) => record,
            Ok(None) => return InteractiveResult::Dismissed,
            Err(e) => {
                warn!(error = %e, "authentication screen failed");
                return InteractiveResult::Dismissed;
            }
        };

        let candidates = self.host.candidates(site).unwrap_or_else(|e| {
            warn!(error = %e, "candidate lookup failed");
            Vec::new()
        });
        if candidates.len() <= 1 {
            return InteractiveResult::Chosen(verified);
        }

        match self.host.present_selector(&candidates) {
            Ok(Some(record)) => InteractiveResult::Chosen(record),
            Ok(None) => InteractiveResult::Dismissed,
            Err(e) => {
                warn!(error = %e, "selector failed");
                InteractiveResult::Dismissed
            }
        }
    }

    /// Drop the remembered credential for `site`.
    pub fn forget_last_used(&self, site: &SiteIdentity) -> Result<()> {
        self.host.forget_last_used(site)
    }

    // -- Shared steps --

    fn parse_and_classify(
        &self,
        snapshot: &ViewSnapshot,
    ) -> std::result::Result<(SiteIdentity, Classification), NoOpReason> {
        let WalkResult { fields, site } = StructureWalker::walk(snapshot);
        enter(SessionState::Parsed);

        if self.config.is_denied(&site) {
            debug!(site = site.label().unwrap_or("<unknown>"), "site is denylisted");
            return Err(NoOpReason::Denylisted);
        }
        if fields.is_empty() {
            return Err(NoOpReason::NoFillableFields);
        }

        let classification = FieldClassifier::classify(&fields);
        enter(SessionState::Classified);
        Ok((site, classification))
    }

    /// Store faults count as "nothing cached".
    fn last_used(&self, site: &SiteIdentity) -> Option<CredentialRecord> {
        if !self.config.use_last_used_cache {
            return None;
        }
        match self.host.lookup_credential(site) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "last-used lookup failed");
                None
            }
        }
    }
}

fn submitted_text(field: &FieldModel) -> Option<String> {
    field.visible_text.clone().filter(|text| !text.is_empty())
}

fn enter(state: SessionState) {
    debug!(?state, "session state");
}

fn no_op(reason: NoOpReason) -> FillOutcome {
    enter(SessionState::NoOp);
    debug!(?reason, "no response");
    FillOutcome::NoOp(reason)
}

fn cancelled(reason: CancelReason) -> ResumeOutcome {
    debug!(?reason, "interactive step cancelled");
    ResumeOutcome::Cancelled(reason)
}
