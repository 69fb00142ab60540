// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Locker Autofill: turns the view structure the OS hands us at fill time
// into classified login fields, and runs the fill/save protocol on top of
// them.  Platform specifics stay behind the `host` traits.

pub mod classifier;
pub mod handoff;
pub mod host;
pub mod response;
pub mod session;
pub mod snapshot;
pub mod walker;

pub use classifier::{Classification, FieldClassifier};
pub use handoff::{HandoffContext, HandoffSlot};
pub use host::AutofillHost;
pub use response::{Dataset, FillResponse, InlineCapability, ResponseBuilder};
pub use session::{
    CancelReason, FillOutcome, FillRequest, FillSessionController, InteractiveResult, NoOpReason,
    ResumeOutcome, SaveOutcome, SaveRequest, SessionState,
};
pub use snapshot::ViewSnapshot;
pub use walker::{StructureWalker, WalkResult};
