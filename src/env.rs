//! Environment mutation requested by `UWSGI_SETENV`.
//!
//! The request builder never touches the process environment directly; it
//! hands each assignment to an [`EnvironmentSink`]. Assignments are applied
//! immediately and are not rolled back if the request later fails.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use crate::error::{WireError, WireResult};

/// Receives `NAME=value` assignments decoded from a request.
pub trait EnvironmentSink {
    fn set_var(&mut self, name: &[u8], value: &[u8]) -> WireResult<()>;
}

/// Writes assignments into the real process environment.
///
/// Only sound while no other thread reads the environment concurrently.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl EnvironmentSink for ProcessEnvironment {
    fn set_var(&mut self, name: &[u8], value: &[u8]) -> WireResult<()> {
        // std::env::set_var panics on these, setenv(3) rejects them.
        if name.is_empty() || name.contains(&b'=') || name.contains(&0) || value.contains(&0) {
            return Err(WireError::InvalidSetenv);
        }
        std::env::set_var(OsStr::from_bytes(name), OsStr::from_bytes(value));
        Ok(())
    }
}

/// Collects assignments instead of applying them.
#[derive(Debug, Default, Clone)]
pub struct RecordingEnvironment {
    pub assignments: Vec<(Vec<u8>, Vec<u8>)>,
}

impl EnvironmentSink for RecordingEnvironment {
    fn set_var(&mut self, name: &[u8], value: &[u8]) -> WireResult<()> {
        self.assignments.push((name.to_vec(), value.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_environment_sets_variable() {
        let mut env = ProcessEnvironment;
        env.set_var(b"UWSGI_GATEWAY_ENV_TEST", b"on").unwrap();
        assert_eq!(std::env::var("UWSGI_GATEWAY_ENV_TEST").unwrap(), "on");
    }

    #[test]
    fn process_environment_rejects_bad_names() {
        let mut env = ProcessEnvironment;
        assert!(env.set_var(b"", b"x").is_err());
        assert!(env.set_var(b"A\0B", b"x").is_err());
    }
}
