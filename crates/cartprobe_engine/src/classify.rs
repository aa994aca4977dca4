//! Failure classification for simulation runs.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use cartprobe_foundation::{EngineFault, FaultKind};
use serde::Serialize;

use crate::config::IncompatibilityRules;

/// Category of a run that did not apply its code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorClass {
    /// The run stopped before the code was tried.
    Fatal,
    /// The engine declined the code through its normal path.
    Rejected,
    /// A known-incompatible extension failed.
    KnownIncompatibility,
    /// The engine or an extension failed in some other way.
    Exception,
}

impl ErrorClass {
    /// Lowercase name, as serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Rejected => "rejected",
            Self::KnownIncompatibility => "known-incompatibility",
            Self::Exception => "exception",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a fault raised while applying a code.
#[must_use]
pub fn classify(fault: &EngineFault, rules: &IncompatibilityRules) -> ErrorClass {
    if rules.is_known(fault) {
        ErrorClass::KnownIncompatibility
    } else {
        ErrorClass::Exception
    }
}

/// Names the extension a known-incompatible fault belongs to.
///
/// Falls back to the first configured origin when only the message
/// signature matched.
#[must_use]
pub fn blamed_extension(fault: &EngineFault, rules: &IncompatibilityRules) -> Option<String> {
    fault
        .origin
        .as_deref()
        .and_then(|o| rules.matching_origin(o))
        .or_else(|| rules.origins.first().map(String::as_str))
        .map(str::to_string)
}

/// Turns a caught panic payload into a fault.
pub(crate) fn panic_fault(payload: &(dyn Any + Send)) -> EngineFault {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    EngineFault::new(FaultKind::Panic, message)
}

/// Runs `op`, turning a panic that unwinds out of it into a fault.
///
/// Every call that may reach engine or extension code goes through here.
pub(crate) fn contain<T>(op: impl FnOnce() -> T) -> Result<T, EngineFault> {
    catch_unwind(AssertUnwindSafe(op)).map_err(|payload| panic_fault(payload.as_ref()))
}
