// Version gate
//
// `system_information` reports `{version, ready}`. The version string
// must look like `2.5.1` or `2.5.1+build.42` (optionally `-dev0+build...`)
// and its `major.minor.patch` core must satisfy the supported range.

use std::sync::LazyLock;

use regex::Regex;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Supported controller versions.
pub const VERSION_CONSTRAINT: &str = ">=2.4.0, <3.0.0";

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d\.\d\.\d)((-dev0)?\+build.*)?$").expect("version pattern is valid")
});

static VERSION_REQ: LazyLock<VersionReq> =
    LazyLock::new(|| VersionReq::parse(VERSION_CONSTRAINT).expect("version constraint is valid"));

/// `GET system_information` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInformation {
    pub version: String,
    #[serde(default)]
    pub ready: bool,
}

/// Outcome of a successful version check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionVerdict {
    pub version: String,
    /// The controller runs a `-dev0` build.
    pub dev_build: bool,
}

/// Validate a `system_information` payload.
///
/// `ready=false` yields [`Error::SystemNotReady`]; a version outside the
/// pattern or range yields [`Error::IncompatibleVersion`].
pub fn check(info: &SystemInformation) -> Result<VersionVerdict, Error> {
    if !info.ready {
        return Err(Error::SystemNotReady);
    }
    check_version(&info.version)
}

/// Validate a bare version string.
pub fn check_version(raw: &str) -> Result<VersionVerdict, Error> {
    let incompatible = |reason: String| Error::IncompatibleVersion {
        version: raw.to_owned(),
        reason,
    };

    let caps = VERSION_RE
        .captures(raw)
        .ok_or_else(|| incompatible("unrecognized version format".into()))?;
    let core = caps
        .get(1)
        .map(|m| m.as_str())
        .ok_or_else(|| incompatible("missing version core".into()))?;

    let parsed = Version::parse(core).map_err(|e| incompatible(e.to_string()))?;
    if !VERSION_REQ.matches(&parsed) {
        return Err(incompatible(format!(
            "{core} does not satisfy {VERSION_CONSTRAINT}"
        )));
    }

    Ok(VersionVerdict {
        version: raw.to_owned(),
        dev_build: caps.get(3).is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(version: &str, ready: bool) -> SystemInformation {
        SystemInformation {
            version: version.into(),
            ready,
        }
    }

    #[test]
    fn accepts_supported_releases() {
        for v in ["2.4.0", "2.4.1+build.3", "2.5.0", "2.9.9+build.1"] {
            let verdict = check(&info(v, true)).unwrap_or_else(|e| panic!("{v}: {e}"));
            assert!(!verdict.dev_build, "{v}");
        }
    }

    #[test]
    fn dev_builds_pass_with_flag() {
        let verdict = check(&info("2.5.0-dev0+build.7", true)).expect("dev build accepted");
        assert!(verdict.dev_build);
    }

    #[test]
    fn rejects_out_of_range() {
        for v in ["2.3.0+build.1", "3.0.0", "1.9.9"] {
            let err = check(&info(v, true)).expect_err(v);
            assert!(matches!(err, Error::IncompatibleVersion { .. }), "{v}: {err:?}");
        }
    }

    #[test]
    fn rejects_malformed() {
        for v in ["", "2.4", "2.4.0-rc1", "v2.4.0", "2.10.0", "2.4.0+"] {
            let err = check(&info(v, true)).expect_err(v);
            assert!(matches!(err, Error::IncompatibleVersion { .. }), "{v}: {err:?}");
        }
    }

    #[test]
    fn not_ready_is_reported_before_version() {
        let err = check(&info("2.5.0", false)).expect_err("not ready");
        assert!(matches!(err, Error::SystemNotReady));
    }
}
