// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process-wide autofill service and its JSON surface.
//
// Requests arrive as JSON documents (see `FillRequest` / `SaveRequest`) and
// every reply is a JSON object tagged by `status`:
//
//   fill:    {"status":"noOp","reason":..}
//            {"status":"needsAuthentication","handle":..,"response":{..}}
//            {"status":"directFill","response":{..}}
//   save:    {"status":"noOp","reason":..} | {"status":"delegated","site":..}
//   resume:  {"status":"filled","dataset":{..}} | {"status":"cancelled","reason":..}
//
// No call here fails towards the caller: a fault becomes a `noOp` or
// `cancelled` reply.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use locker_autofill::{
    CancelReason, Dataset, FillOutcome, FillResponse, FillSessionController, HandoffSlot,
    InlineCapability, InteractiveResult, NoOpReason, ResumeOutcome, SaveOutcome, SaveRequest,
};
use locker_core::config::AutofillConfig;
use locker_core::error::{LockerError, Result};
use locker_core::types::{AuthenticationHandle, CredentialRecord, SiteIdentity};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::host::LockerHost;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FillReply {
    NoOp {
        reason: NoOpReason,
    },
    NeedsAuthentication {
        handle: AuthenticationHandle,
        response: FillResponse,
    },
    DirectFill {
        response: FillResponse,
    },
}

impl From<FillOutcome> for FillReply {
    fn from(outcome: FillOutcome) -> Self {
        match outcome {
            FillOutcome::NoOp(reason) => Self::NoOp { reason },
            FillOutcome::NeedsAuthentication { response, handle } => {
                Self::NeedsAuthentication { handle, response }
            }
            FillOutcome::DirectFill { response } => Self::DirectFill { response },
        }
    }
}

/// The submitted password never travels back across the boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SaveReply {
    NoOp { reason: NoOpReason },
    Delegated { site: Option<String> },
}

impl From<SaveOutcome> for SaveReply {
    fn from(outcome: SaveOutcome) -> Self {
        match outcome {
            SaveOutcome::NoOp(reason) => Self::NoOp { reason },
            SaveOutcome::Delegated(candidate) => Self::Delegated {
                site: candidate.site.canonical_uri(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ResumeReply {
    Filled { dataset: Dataset },
    Cancelled { reason: CancelReason },
}

impl From<ResumeOutcome> for ResumeReply {
    fn from(outcome: ResumeOutcome) -> Self {
        match outcome {
            ResumeOutcome::Filled(dataset) => Self::Filled { dataset },
            ResumeOutcome::Cancelled(reason) => Self::Cancelled { reason },
        }
    }
}

pub struct AutofillService {
    controller: FillSessionController<LockerHost>,
}

impl AutofillService {
    pub fn new(config: AutofillConfig, host: LockerHost) -> Self {
        Self {
            controller: FillSessionController::new(config, host, Arc::new(HandoffSlot::new())),
        }
    }

    pub fn controller(&self) -> &FillSessionController<LockerHost> {
        &self.controller
    }

    // -- Fill --

    pub fn fill(&self, request_json: &str) -> FillReply {
        panic::catch_unwind(AssertUnwindSafe(|| self.controller.handle_fill_json(request_json)))
            .unwrap_or_else(|_| {
                warn!("fill request panicked");
                FillOutcome::NoOp(NoOpReason::Fault)
            })
            .into()
    }

    pub fn fill_json(&self, request_json: &str) -> String {
        encode(&self.fill(request_json), FALLBACK_NO_OP)
    }

    // -- Save --

    pub fn save(&self, request_json: &str) -> SaveReply {
        let request = match SaveRequest::from_json(request_json) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "save request could not be decoded");
                return SaveReply::NoOp {
                    reason: NoOpReason::ParseFailure,
                };
            }
        };
        let mut reply = SaveReply::NoOp {
            reason: NoOpReason::Fault,
        };
        self.controller
            .on_save_request(request, |outcome| reply = outcome.into());
        reply
    }

    pub fn save_json(&self, request_json: &str) -> String {
        encode(&self.save(request_json), FALLBACK_NO_OP)
    }

    // -- Resume --

    /// Finish a suspended fill once the app's unlock screen has returned.
    ///
    /// `chosen_json` is the credential the user picked, or `None` when the
    /// screen was dismissed. An unreadable handle can never match the
    /// parked request and is reported as stale.
    #[instrument(skip_all)]
    pub fn complete_authentication(
        &self,
        handle: &str,
        chosen_json: Option<&str>,
        inline_json: Option<&str>,
    ) -> ResumeReply {
        let handle: AuthenticationHandle = match handle.parse() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "unreadable authentication handle");
                return ResumeReply::Cancelled {
                    reason: CancelReason::StaleHandoff,
                };
            }
        };

        let result = match chosen_json.map(serde_json::from_str::<CredentialRecord>) {
            Some(Ok(record)) => InteractiveResult::Chosen(record),
            Some(Err(e)) => {
                warn!(error = %e, "chosen credential could not be decoded");
                InteractiveResult::Dismissed
            }
            None => InteractiveResult::Dismissed,
        };
        let inline = decode_inline(inline_json);

        panic::catch_unwind(AssertUnwindSafe(|| {
            self.controller
                .complete_authentication(handle, result, inline.as_ref())
        }))
        .unwrap_or_else(|_| {
            warn!("authentication completion panicked");
            ResumeOutcome::Cancelled(CancelReason::NoCredential)
        })
        .into()
    }

    pub fn complete_authentication_json(
        &self,
        handle: &str,
        chosen_json: Option<&str>,
        inline_json: Option<&str>,
    ) -> String {
        encode(
            &self.complete_authentication(handle, chosen_json, inline_json),
            FALLBACK_CANCELLED,
        )
    }

    /// Drive the unlock and picker screens in-line. Only for bridges whose
    /// screens return synchronously; the Android screens report back through
    /// [`complete_authentication`](Self::complete_authentication) instead.
    pub fn run_interactive(&self, handle: &str, inline_json: Option<&str>) -> ResumeReply {
        let handle: AuthenticationHandle = match handle.parse() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "unreadable authentication handle");
                return ResumeReply::Cancelled {
                    reason: CancelReason::StaleHandoff,
                };
            }
        };
        let inline = decode_inline(inline_json);
        panic::catch_unwind(AssertUnwindSafe(|| {
            self.controller.run_interactive(handle, inline.as_ref())
        }))
        .unwrap_or_else(|_| {
            warn!("interactive resume panicked");
            ResumeOutcome::Cancelled(CancelReason::NoCredential)
        })
        .into()
    }

    // -- Account --

    /// Forget the remembered credential for the site described by
    /// `site_json` (a serialized `SiteIdentity`).
    pub fn forget_last_used(&self, site_json: &str) -> Result<()> {
        let site: SiteIdentity = serde_json::from_str(site_json)?;
        contained("forget last-used", || self.controller.forget_last_used(&site))
    }

    pub fn clear_last_used(&self) -> Result<()> {
        self.controller.handoff().clear();
        contained("clear last-used", || self.controller.host().clear_last_used())
    }

    pub fn verify_master_password(&self, master_password: &str) -> Result<bool> {
        contained("master password check", || {
            self.controller.host().verify_master_password(master_password)
        })
    }
}

// -- Process-wide instance --

static SERVICE: OnceLock<AutofillService> = OnceLock::new();

/// Create the process-wide service on first call. Later calls return the
/// existing instance and ignore `config`.
pub fn init_service(config: AutofillConfig) -> &'static AutofillService {
    SERVICE.get_or_init(|| {
        let host = LockerHost::for_platform();
        info!(
            platform = host.platform_name(),
            self_package = %config.self_package,
            "autofill service initialised"
        );
        AutofillService::new(config, host)
    })
}

pub fn service() -> Result<&'static AutofillService> {
    SERVICE
        .get()
        .ok_or_else(|| LockerError::Config("autofill service not initialised".into()))
}

// -- Encoding --

pub(crate) const FALLBACK_NO_OP: &str = r#"{"status":"noOp","reason":"Fault"}"#;
pub(crate) const FALLBACK_CANCELLED: &str = r#"{"status":"cancelled","reason":"NoCredential"}"#;

fn encode<T: Serialize>(reply: &T, fallback: &str) -> String {
    serde_json::to_string(reply).unwrap_or_else(|e| {
        warn!(error = %e, "reply could not be encoded");
        fallback.to_owned()
    })
}

/// Run an account operation, reporting a panic as an error.
fn contained<T>(operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        warn!(operation, "account operation panicked");
        Err(LockerError::Panicked(operation))
    })
}

/// Inline capability is decoration only; an unreadable one is ignored.
fn decode_inline(inline_json: Option<&str>) -> Option<InlineCapability> {
    inline_json.and_then(|json| match serde_json::from_str(json) {
        Ok(inline) => Some(inline),
        Err(e) => {
            warn!(error = %e, "inline capability ignored");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBridge, VAULT, record};
    use serde_json::Value;

    const LOGIN_PAGE: &str = r#"{
        "snapshot": {"windows": [{
            "title": "com.android.chrome/org.chromium.chrome.browser.ChromeTabbedActivity",
            "root": {
                "className": "android.webkit.WebView",
                "webDomain": "example.com",
                "webScheme": "https",
                "children": [
                    {"autofillId":"user","className":"android.widget.EditText","hint":"Username","autofillType":1,"text":"alice"},
                    {"autofillId":"pass","className":"android.widget.EditText","inputType":129,"autofillType":1,"text":"hunter2"}
                ]
            }
        }]}
    }"#;

    const SITE_JSON: &str = r#"{"domain":"example.com","scheme":"https","packageName":"com.android.chrome"}"#;

    fn service_with(bridge: &FakeBridge) -> AutofillService {
        AutofillService::new(
            AutofillConfig::default(),
            LockerHost::new(Box::new(bridge.clone()), None),
        )
    }

    fn locked_handle(reply: FillReply) -> AuthenticationHandle {
        match reply {
            FillReply::NeedsAuthentication { handle, response } => {
                assert_eq!(response.datasets.len(), 1);
                assert!(response.datasets[0].is_locked());
                handle
            }
            other => panic!("expected needsAuthentication, got {other:?}"),
        }
    }

    fn chosen(id: &str, password: &str) -> String {
        serde_json::to_string(&record(id, password)).expect("encode record")
    }

    #[test]
    fn signed_out_fill_is_no_op() {
        let service = service_with(&FakeBridge::signed_out());
        assert_eq!(
            service.fill(LOGIN_PAGE),
            FillReply::NoOp {
                reason: NoOpReason::VaultUnavailable
            }
        );
    }

    #[test]
    fn undecodable_fill_is_parse_failure() {
        let service = service_with(&FakeBridge::with_payload(VAULT));
        let json: Value = serde_json::from_str(&service.fill_json("{{")).expect("reply json");
        assert_eq!(json["status"], "noOp");
        assert_eq!(json["reason"], "ParseFailure");
    }

    #[test]
    fn unlock_then_direct_fill() {
        let bridge = FakeBridge::with_payload(VAULT);
        let service = service_with(&bridge);

        let handle = locked_handle(service.fill(LOGIN_PAGE));
        let reply = service.complete_authentication(&handle.to_string(), Some(&chosen("1", "p1")), None);
        let ResumeReply::Filled { dataset } = reply else {
            panic!("expected filled, got {reply:?}");
        };
        assert!(!dataset.is_locked());
        assert_eq!(dataset.entries.len(), 2);

        let reply = service.fill(LOGIN_PAGE);
        let FillReply::DirectFill { response } = reply else {
            panic!("expected directFill, got {reply:?}");
        };
        let values: Vec<Option<&str>> = response.datasets[0]
            .entries
            .iter()
            .map(|entry| entry.value.as_deref())
            .collect();
        assert_eq!(values, [Some("alice"), Some("p1")]);
    }

    #[test]
    fn reply_json_carries_handle() {
        let service = service_with(&FakeBridge::with_payload(VAULT));
        let json: Value =
            serde_json::from_str(&service.fill_json(LOGIN_PAGE)).expect("reply json");
        assert_eq!(json["status"], "needsAuthentication");
        let handle = json["handle"].as_str().expect("handle string");
        assert_eq!(
            json["response"]["datasets"][0]["authentication"].as_str(),
            Some(handle)
        );
        assert!(json["response"]["saveInfo"].is_object());
    }

    #[test]
    fn dismissed_and_stale_handles_cancel() {
        let service = service_with(&FakeBridge::with_payload(VAULT));

        let handle = locked_handle(service.fill(LOGIN_PAGE));
        assert_eq!(
            service.complete_authentication(&handle.to_string(), None, None),
            ResumeReply::Cancelled {
                reason: CancelReason::Dismissed
            }
        );
        // Claimed by the dismissal.
        assert_eq!(
            service.complete_authentication(&handle.to_string(), Some(&chosen("1", "p1")), None),
            ResumeReply::Cancelled {
                reason: CancelReason::StaleHandoff
            }
        );
        assert_eq!(
            service.complete_authentication("garbage", Some(&chosen("1", "p1")), None),
            ResumeReply::Cancelled {
                reason: CancelReason::StaleHandoff
            }
        );
    }

    #[test]
    fn newer_fill_supersedes_parked_request() {
        let service = service_with(&FakeBridge::with_payload(VAULT));
        let first = locked_handle(service.fill(LOGIN_PAGE));
        let second = locked_handle(service.fill(LOGIN_PAGE));
        assert_ne!(first, second);

        assert!(matches!(
            service.complete_authentication(&first.to_string(), Some(&chosen("1", "p1")), None),
            ResumeReply::Cancelled {
                reason: CancelReason::StaleHandoff
            }
        ));
        assert!(matches!(
            service.complete_authentication(&second.to_string(), Some(&chosen("1", "p1")), None),
            ResumeReply::Filled { .. }
        ));
    }

    #[test]
    fn run_interactive_uses_selector_for_several_candidates() {
        let bridge = FakeBridge::with_payload(VAULT);
        bridge.pick_on_unlock(Some(record("1", "p1")));
        bridge.pick_in_selector(Some(record("2", "p2")));
        let service = service_with(&bridge);

        let handle = locked_handle(service.fill(LOGIN_PAGE));
        let reply = service.run_interactive(&handle.to_string(), None);
        let ResumeReply::Filled { dataset } = reply else {
            panic!("expected filled, got {reply:?}");
        };
        assert!(dataset.entries.iter().any(|e| e.value.as_deref() == Some("p2")));
        assert_eq!(bridge.auth_requests(), ["https://example.com"]);
        assert_eq!(bridge.selector_offers(), [2]);
    }

    #[test]
    fn run_interactive_contains_bridge_panic() {
        let bridge = FakeBridge::with_payload(VAULT);
        bridge.panic_on_unlock();
        let service = service_with(&bridge);

        let handle = locked_handle(service.fill(LOGIN_PAGE));
        assert_eq!(
            service.run_interactive(&handle.to_string(), None),
            ResumeReply::Cancelled {
                reason: CancelReason::NoCredential
            }
        );
        assert_eq!(bridge.auth_requests(), ["https://example.com"]);
    }

    #[test]
    fn account_operations_contain_panics() {
        let bridge = FakeBridge::with_payload(VAULT);
        let service = service_with(&bridge);
        bridge.panic_on_vault_read();

        assert!(matches!(
            service.verify_master_password("correct horse battery staple"),
            Err(LockerError::Panicked(_))
        ));
        assert!(matches!(
            service.forget_last_used(SITE_JSON),
            Err(LockerError::Panicked(_))
        ));
        assert_eq!(
            service.fill(LOGIN_PAGE),
            FillReply::NoOp {
                reason: NoOpReason::Fault
            }
        );
    }

    #[test]
    fn forget_returns_to_unlock() {
        let service = service_with(&FakeBridge::with_payload(VAULT));
        let handle = locked_handle(service.fill(LOGIN_PAGE));
        service.complete_authentication(&handle.to_string(), Some(&chosen("1", "p1")), None);
        assert!(matches!(service.fill(LOGIN_PAGE), FillReply::DirectFill { .. }));

        service.forget_last_used(SITE_JSON).expect("forget");
        assert!(matches!(
            service.fill(LOGIN_PAGE),
            FillReply::NeedsAuthentication { .. }
        ));
        assert!(service.forget_last_used("not json").is_err());
    }

    #[test]
    fn clear_drops_cache_and_parked_request() {
        let service = service_with(&FakeBridge::with_payload(VAULT));
        let handle = locked_handle(service.fill(LOGIN_PAGE));
        service.clear_last_used().expect("clear");
        assert!(!service.controller().handoff().is_pending());
        assert!(matches!(
            service.complete_authentication(&handle.to_string(), Some(&chosen("1", "p1")), None),
            ResumeReply::Cancelled { .. }
        ));
    }

    #[test]
    fn save_delegates_without_echoing_password() {
        let bridge = FakeBridge::with_payload(VAULT);
        let service = service_with(&bridge);

        let reply = service.save_json(LOGIN_PAGE);
        let json: Value = serde_json::from_str(&reply).expect("reply json");
        assert_eq!(json["status"], "delegated");
        assert_eq!(json["site"], "https://example.com");
        assert!(!reply.contains("hunter2"));

        let saved = bridge.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].username.as_deref(), Some("alice"));
        assert_eq!(saved[0].password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn undecodable_save_is_parse_failure() {
        let service = service_with(&FakeBridge::with_payload(VAULT));
        assert_eq!(
            service.save("not json"),
            SaveReply::NoOp {
                reason: NoOpReason::ParseFailure
            }
        );
    }

    #[test]
    fn master_password_verification() {
        let service = service_with(&FakeBridge::with_payload(VAULT));
        assert!(service
            .verify_master_password("correct horse battery staple")
            .expect("verify"));
        assert!(!service.verify_master_password("nope").expect("verify"));
    }

    #[test]
    fn inline_capability_decorates_resumed_dataset() {
        let service = service_with(&FakeBridge::with_payload(VAULT));
        let handle = locked_handle(service.fill(LOGIN_PAGE));
        let inline = r#"{"maxSuggestionCount":3,"specs":[{"uiVersions":["androidx.autofill.inline.ui.version:v1"]}]}"#;

        let reply = service.complete_authentication(&handle.to_string(), Some(&chosen("1", "p1")), Some(inline));
        let ResumeReply::Filled { dataset } = reply else {
            panic!("expected filled, got {reply:?}");
        };
        assert!(dataset.inline_presentation.is_some());
    }

    #[test]
    fn process_wide_instance_on_stub_bridge() {
        let first = init_service(AutofillConfig::default()) as *const AutofillService;
        let second = init_service(AutofillConfig {
            service_title: "ignored".into(),
            ..AutofillConfig::default()
        }) as *const AutofillService;
        assert_eq!(first, second);

        let svc = service().expect("initialised");
        assert_eq!(svc.controller().host().platform_name(), "Desktop (stub)");
        assert_eq!(
            svc.fill(LOGIN_PAGE),
            FillReply::NoOp {
                reason: NoOpReason::VaultUnavailable
            }
        );
    }
}
