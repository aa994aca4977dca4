//! Simulator configuration.
//!
//! Every struct here derives `Deserialize` with `#[serde(default)]`, so a
//! persisted settings document only needs the keys it overrides.

use cartprobe_debug::{LogConfig, SMART_COUPONS_ORIGIN, SanitizeConfig, TracerConfig};
use cartprobe_foundation::{EngineFault, FaultKind, PlaceholderSpec, Value};
use serde::Deserialize;

// =============================================================================
// Session Scratch Keys
// =============================================================================

/// Value a scratch key is reset to when the cart is isolated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScratchReset {
    /// Reset to null.
    Null,
    /// Reset to an empty list.
    EmptyList,
}

impl ScratchReset {
    /// The value written to the session.
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::EmptyList => Value::empty_list(),
        }
    }
}

/// A session key that holds per-application scratch state.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ScratchKey {
    /// Session key name.
    pub key: String,
    /// What the key is reset to.
    pub reset: ScratchReset,
}

impl ScratchKey {
    /// A key reset to null.
    #[must_use]
    pub fn null(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reset: ScratchReset::Null,
        }
    }

    /// A key reset to an empty list.
    #[must_use]
    pub fn empty_list(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reset: ScratchReset::EmptyList,
        }
    }
}

fn default_scratch_keys() -> Vec<ScratchKey> {
    vec![
        ScratchKey::empty_list("wc_notices"),
        ScratchKey::null("sc_coupon_valid"),
        ScratchKey::null("sc_coupon_error"),
        ScratchKey::empty_list("wc_sc_cart_smart_coupons"),
    ]
}

// =============================================================================
// Incompatibility Rules
// =============================================================================

/// Recognizes faults caused by extensions known not to work with the engine.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IncompatibilityRules {
    /// Extension names whose type errors and warnings are known issues.
    pub origins: Vec<String>,
    /// Message fragments that identify a known issue regardless of origin.
    pub signatures: Vec<String>,
}

impl Default for IncompatibilityRules {
    fn default() -> Self {
        Self {
            origins: vec![SMART_COUPONS_ORIGIN.to_string()],
            signatures: vec!["Cannot access offset of type string on string".to_string()],
        }
    }
}

impl IncompatibilityRules {
    /// Rules that recognize nothing.
    #[must_use]
    pub fn none() -> Self {
        Self {
            origins: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Builder method to add an extension origin.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origins.push(origin.into());
        self
    }

    /// Builder method to add a message signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signatures.push(signature.into());
        self
    }

    /// Returns the configured origin that `origin` belongs to, if any.
    ///
    /// Origins match as substrings, so a source path inside the extension's
    /// directory matches the extension name.
    #[must_use]
    pub fn matching_origin(&self, origin: &str) -> Option<&str> {
        self.origins
            .iter()
            .find(|known| origin.contains(known.as_str()))
            .map(String::as_str)
    }

    /// Returns true if the message carries a known signature.
    #[must_use]
    pub fn matches_signature(&self, message: &str) -> bool {
        self.signatures.iter().any(|s| message.contains(s.as_str()))
    }

    /// Returns true if the fault is a known incompatibility.
    ///
    /// A signature match always counts. An origin match counts only for type
    /// errors and escalated warnings; a runtime error or panic from the same
    /// extension is treated as an ordinary exception.
    #[must_use]
    pub fn is_known(&self, fault: &EngineFault) -> bool {
        if self.matches_signature(&fault.message) {
            return true;
        }
        let origin_matches = fault
            .origin
            .as_deref()
            .is_some_and(|o| self.matching_origin(o).is_some());
        origin_matches && matches!(fault.kind, FaultKind::Type | FaultKind::Warning)
    }
}

// =============================================================================
// Selection Policy
// =============================================================================

/// How a concrete unit is chosen from a composite product.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// The first eligible unit in catalog order.
    #[default]
    FirstEligible,
    /// A seeded pseudo-random choice among eligible units.
    Seeded(u64),
}

// =============================================================================
// Simulator Configuration
// =============================================================================

/// Configuration for a [`Simulator`](crate::Simulator).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Event log limits.
    pub log: LogConfig,
    /// Sanitizer limits.
    pub sanitize: SanitizeConfig,
    /// Hook tracer settings.
    pub tracer: TracerConfig,
    /// Session keys reset when the cart is isolated.
    pub scratch_keys: Vec<ScratchKey>,
    /// Known-incompatible extensions and fault signatures.
    pub incompatibility: IncompatibilityRules,
    /// Whether runs skip known-incompatible extensions unless the request says otherwise.
    pub skip_incompatible_default: bool,
    /// Composite product selection.
    pub selection: SelectionPolicy,
    /// Placeholder product used when the cart would otherwise be empty.
    pub placeholder: PlaceholderSpec,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            sanitize: SanitizeConfig::default(),
            tracer: TracerConfig::default(),
            scratch_keys: default_scratch_keys(),
            incompatibility: IncompatibilityRules::default(),
            skip_incompatible_default: false,
            selection: SelectionPolicy::default(),
            placeholder: PlaceholderSpec::default(),
        }
    }
}

impl SimulatorConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set log limits.
    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Builder method to set sanitizer limits.
    #[must_use]
    pub fn with_sanitize(mut self, sanitize: SanitizeConfig) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// Builder method to set tracer settings.
    #[must_use]
    pub fn with_tracer(mut self, tracer: TracerConfig) -> Self {
        self.tracer = tracer;
        self
    }

    /// Builder method to replace the scratch keys.
    #[must_use]
    pub fn with_scratch_keys(mut self, keys: Vec<ScratchKey>) -> Self {
        self.scratch_keys = keys;
        self
    }

    /// Builder method to replace the incompatibility rules.
    #[must_use]
    pub fn with_incompatibility(mut self, rules: IncompatibilityRules) -> Self {
        self.incompatibility = rules;
        self
    }

    /// Builder method to set the persisted skip default.
    #[must_use]
    pub const fn with_skip_incompatible_default(mut self, skip: bool) -> Self {
        self.skip_incompatible_default = skip;
        self
    }

    /// Builder method to set the selection policy.
    #[must_use]
    pub const fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    /// Builder method to set the placeholder product.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: PlaceholderSpec) -> Self {
        self.placeholder = placeholder;
        self
    }
}
