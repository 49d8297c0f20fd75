//! Privilege dropping and daemonization.

use std::ffi::CString;

use nix::unistd::{Uid, User, initgroups, setgid, setuid};
use thiserror::Error;
use tracing::info;

use streamgate_config::connector::NO_PRIVILEGE_DROP;

#[derive(Debug, Error)]
pub enum PrivilegeError {
    #[error("no such user '{0}'")]
    UnknownUser(String),

    #[error("user lookup for '{user}' failed: {source}")]
    Lookup {
        user: String,
        #[source]
        source: nix::Error,
    },

    #[error("could not set supplementary groups for '{user}': {source}")]
    SetGroups {
        user: String,
        #[source]
        source: nix::Error,
    },

    #[error("could not switch to group of '{user}': {source}")]
    SetGroup {
        user: String,
        #[source]
        source: nix::Error,
    },

    #[error("could not switch to user '{user}': {source}")]
    SetUser {
        user: String,
        #[source]
        source: nix::Error,
    },

    #[error("failed to detach from terminal: {0}")]
    Daemonize(#[source] nix::Error),
}

/// Switch the process to `username`'s group and user ids.
///
/// When running as root the supplementary group list is replaced by
/// `username`'s groups first, so none of root's groups survive the drop.
/// An empty name or `root` is a no-op.
pub fn set_user(username: &str) -> Result<(), PrivilegeError> {
    if username.is_empty() || username == NO_PRIVILEGE_DROP {
        return Ok(());
    }

    let Ok(c_name) = CString::new(username) else {
        return Err(PrivilegeError::UnknownUser(username.to_string()));
    };
    let user = User::from_name(username)
        .map_err(|source| PrivilegeError::Lookup {
            user: username.to_string(),
            source,
        })?
        .ok_or_else(|| PrivilegeError::UnknownUser(username.to_string()))?;

    // Groups first: after setuid we no longer have the right to change them.
    if Uid::effective().is_root() {
        initgroups(&c_name, user.gid).map_err(|source| PrivilegeError::SetGroups {
            user: username.to_string(),
            source,
        })?;
    }
    setgid(user.gid).map_err(|source| PrivilegeError::SetGroup {
        user: username.to_string(),
        source,
    })?;
    setuid(user.uid).map_err(|source| PrivilegeError::SetUser {
        user: username.to_string(),
        source,
    })?;

    info!(user = username, uid = user.uid.as_raw(), "changed user");
    Ok(())
}

/// Detach into the background, keeping the working directory.
///
/// stdio is redirected to `/dev/null` unless `keep_stdio` is set.
pub fn daemonize(keep_stdio: bool) -> Result<(), PrivilegeError> {
    info!(keep_stdio, "going into background mode");
    nix::unistd::daemon(true, keep_stdio).map_err(PrivilegeError::Daemonize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_and_empty_are_noops() {
        assert!(set_user("root").is_ok());
        assert!(set_user("").is_ok());
    }

    #[test]
    fn test_unknown_user_is_reported() {
        let err = set_user("streamgate-no-such-user").unwrap_err();
        assert!(matches!(err, PrivilegeError::UnknownUser(ref u) if u == "streamgate-no-such-user"));
        assert_eq!(err.to_string(), "no such user 'streamgate-no-such-user'");
    }

    #[test]
    fn test_name_with_nul_is_unknown() {
        let err = set_user("no\0body").unwrap_err();
        assert!(matches!(err, PrivilegeError::UnknownUser(_)));
    }
}
