//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` is the dotted config path used in error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains('$') {
        return Ok(value.to_owned());
    }

    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_passthrough() {
        assert_eq!(
            expand_env("plain value", "field").unwrap(),
            "plain value".to_owned()
        );
    }

    #[test]
    fn test_default_value_used_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("WJ_EXPAND_UNSET_TEST");
        }
        assert_eq!(
            expand_env("${WJ_EXPAND_UNSET_TEST:-fallback}", "field").unwrap(),
            "fallback"
        );
    }

    #[test]
    fn test_set_variable_expanded() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("WJ_EXPAND_SET_TEST", "/data/space");
        }
        assert_eq!(
            expand_env("${WJ_EXPAND_SET_TEST}/export", "field").unwrap(),
            "/data/space/export"
        );
        unsafe {
            std::env::remove_var("WJ_EXPAND_SET_TEST");
        }
    }

    #[test]
    fn test_missing_variable_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("WJ_EXPAND_MISSING_TEST");
        }
        let err = expand_env("${WJ_EXPAND_MISSING_TEST}", "workspace.dir").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("workspace.dir"));
        assert!(err.to_string().contains("WJ_EXPAND_MISSING_TEST"));
    }
}
