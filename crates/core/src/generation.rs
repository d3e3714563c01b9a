//! Model selection and remote status constants for Veo video generation.
//!
//! The aspect-ratio/model coupling is a domain rule of the remote
//! platform: portrait output is only supported by the dedicated portrait
//! model, so selecting portrait overrides whatever model the caller
//! asked for. See [`resolve_model_key`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Model keys
// ---------------------------------------------------------------------------

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL_KEY: &str = "veo_3_0_t2v_fast_ultra";

/// The only model capable of portrait output; forced whenever
/// [`AspectRatio::Portrait`] is selected.
pub const PORTRAIT_MODEL_KEY: &str = "veo_3_0_t2v_fast_portrait_ultra";

/// Tool identifier sent in the client context of every generation call.
pub const TOOL_NAME: &str = "PINHOLE";

/// Exclusive upper bound for the random seed carried by each
/// generation request.
pub const SEED_RANGE: u32 = 100_000;

// ---------------------------------------------------------------------------
// Remote status enum values
// ---------------------------------------------------------------------------

/// Prefix shared by all remote media-generation status values.
pub const STATUS_PREFIX: &str = "MEDIA_GENERATION_STATUS_";

/// Remote status: generation finished and an artifact is available.
pub const STATUS_SUCCESSFUL: &str = "MEDIA_GENERATION_STATUS_SUCCESSFUL";

/// Remote status: generation failed; a reason may be attached.
pub const STATUS_FAILED: &str = "MEDIA_GENERATION_STATUS_FAILED";

/// Turn a raw remote status value into a short human-readable word for
/// progress messages, e.g. `MEDIA_GENERATION_STATUS_PENDING` ->
/// `pending`.
pub fn humanize_status(raw: &str) -> String {
    raw.strip_prefix(STATUS_PREFIX).unwrap_or(raw).to_lowercase()
}

// ---------------------------------------------------------------------------
// AspectRatio
// ---------------------------------------------------------------------------

/// Output aspect ratio for a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AspectRatio {
    Landscape,
    Portrait,
}

impl AspectRatio {
    /// Wire-format token carried in the generation request.
    pub fn wire_token(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "VIDEO_ASPECT_RATIO_LANDSCAPE",
            AspectRatio::Portrait => "VIDEO_ASPECT_RATIO_PORTRAIT",
        }
    }

    /// Parse a caller-supplied value (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_ascii_uppercase().as_str() {
            "LANDSCAPE" => Ok(AspectRatio::Landscape),
            "PORTRAIT" => Ok(AspectRatio::Portrait),
            other => Err(CoreError::Validation(format!(
                "Unknown aspect ratio '{other}'. Must be LANDSCAPE or PORTRAIT"
            ))),
        }
    }
}

/// Resolve the model key actually sent on the wire.
///
/// Portrait output forces [`PORTRAIT_MODEL_KEY`] regardless of the
/// requested model; landscape keeps the caller's choice.
pub fn resolve_model_key(requested: &str, aspect_ratio: AspectRatio) -> String {
    match aspect_ratio {
        AspectRatio::Portrait => PORTRAIT_MODEL_KEY.to_string(),
        AspectRatio::Landscape => requested.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portrait_overrides_caller_model() {
        let key = resolve_model_key("veo_3_0_t2v_fast_ultra", AspectRatio::Portrait);
        assert_eq!(key, PORTRAIT_MODEL_KEY);
    }

    #[test]
    fn landscape_keeps_caller_model() {
        let key = resolve_model_key("veo_3_0_t2v_fast_ultra", AspectRatio::Landscape);
        assert_eq!(key, "veo_3_0_t2v_fast_ultra");
    }

    #[test]
    fn wire_tokens() {
        assert_eq!(
            AspectRatio::Landscape.wire_token(),
            "VIDEO_ASPECT_RATIO_LANDSCAPE"
        );
        assert_eq!(
            AspectRatio::Portrait.wire_token(),
            "VIDEO_ASPECT_RATIO_PORTRAIT"
        );
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(AspectRatio::parse("portrait").unwrap(), AspectRatio::Portrait);
        assert_eq!(AspectRatio::parse("LANDSCAPE").unwrap(), AspectRatio::Landscape);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(AspectRatio::parse("square").is_err());
    }

    #[test]
    fn humanize_strips_prefix_and_lowercases() {
        assert_eq!(humanize_status("MEDIA_GENERATION_STATUS_PENDING"), "pending");
        assert_eq!(humanize_status(STATUS_SUCCESSFUL), "successful");
    }

    #[test]
    fn humanize_leaves_unknown_values_intact() {
        assert_eq!(humanize_status("WEIRD_VALUE"), "weird_value");
    }
}
