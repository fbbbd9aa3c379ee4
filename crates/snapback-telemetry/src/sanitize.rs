//! Error Sanitizer (§4.11): `sanitize(error, context) → {publicMessage,
//! code, logId}`. Full internal detail always goes to the tracing error
//! channel prefixed with the `logId`; only the sanitized shape ever
//! reaches a caller.

use rand::Rng;
use snapback_domain::Error;

const GENERIC_PRODUCTION_MESSAGE: &str =
    "something went wrong processing your request; contact support with the log id above";

#[derive(Debug, Clone, serde::Serialize)]
pub struct SanitizedError {
    pub public_message: String,
    pub code: &'static str,
    pub log_id: String,
}

fn error_code(error: &Error) -> &'static str {
    match error {
        Error::Io(_) => "io_error",
        Error::Json(_) => "json_error",
        Error::Transport(_) => "transport_error",
        Error::Timeout(_) => "timeout",
        Error::Upstream { .. } => "upstream_error",
        Error::Config(_) => "config_error",
        Error::Auth(_) => "auth_error",
        Error::Validation(_) => "validation_error",
        Error::PathSecurity => "path_security",
        Error::Snapshot(_) => "snapshot_error",
        Error::Other(_) => "internal_error",
    }
}

/// Time-plus-random token: sortable by creation time, collision-resistant
/// enough for correlating a single incident in the error channel.
fn generate_log_id() -> String {
    let now = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f");
    let suffix: u32 = rand::thread_rng().gen_range(0..0xFFFF_FFFFu32);
    format!("{now}-{suffix:08x}")
}

/// Sanitizes `error` for the given `context` (the operation name, used only
/// in the internal log line). `production` selects between surfacing the
/// original message and a fixed generic one.
pub fn sanitize(error: &Error, context: &str, production: bool) -> SanitizedError {
    let log_id = generate_log_id();
    let code = error_code(error);

    tracing::error!(log_id = %log_id, context = %context, code = %code, "{error}");

    let public_message = if production {
        GENERIC_PRODUCTION_MESSAGE.to_string()
    } else {
        error.to_string()
    };

    SanitizedError { public_message, code, log_id }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_mode_surfaces_original_message() {
        let err = Error::Validation("bad field".into());
        let sanitized = sanitize(&err, "call_tool", false);
        assert_eq!(sanitized.public_message, "validation: bad field");
        assert_eq!(sanitized.code, "validation_error");
    }

    #[test]
    fn production_mode_surfaces_generic_message() {
        let err = Error::Validation("bad field".into());
        let sanitized = sanitize(&err, "call_tool", true);
        assert_eq!(sanitized.public_message, GENERIC_PRODUCTION_MESSAGE);
    }

    #[test]
    fn log_ids_are_unique_across_calls() {
        let err = Error::Other("x".into());
        let a = sanitize(&err, "ctx", true);
        let b = sanitize(&err, "ctx", true);
        assert_ne!(a.log_id, b.log_id);
    }

    #[test]
    fn maps_error_variants_to_distinct_codes() {
        assert_eq!(error_code(&Error::PathSecurity), "path_security");
        assert_eq!(error_code(&Error::Auth("x".into())), "auth_error");
        assert_eq!(error_code(&Error::Upstream { service: "a".into(), message: "b".into() }), "upstream_error");
    }
}
