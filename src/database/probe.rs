//! Firebird client library discovery.

use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

const LIBRARY_NAMES: [&str; 2] = ["libfbclient.so", "libfbclient.so.2"];

/// Install locations checked after the explicit path and `LD_LIBRARY_PATH`.
pub const STANDARD_LOCATIONS: [&str; 6] = [
    "/opt/firebird/lib/libfbclient.so",
    "/opt/firebird/lib/libfbclient.so.2",
    "/usr/lib/libfbclient.so",
    "/usr/lib/libfbclient.so.2",
    "/usr/lib/x86_64-linux-gnu/libfbclient.so",
    "/usr/lib/x86_64-linux-gnu/libfbclient.so.2",
];

/// Library state checked before a connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preconditions {
    pub driver_available: bool,
    pub client_library: Option<PathBuf>,
    /// `LD_LIBRARY_PATH` as seen by the probe.
    pub search_path: Option<String>,
}

impl Preconditions {
    pub fn satisfied(&self) -> bool {
        self.driver_available && self.client_library.is_some()
    }
}

/// Locates `libfbclient`.
#[derive(Debug, Clone, Default)]
pub struct LibraryProbe {
    explicit: Option<PathBuf>,
    search_path: Option<String>,
    standard: Vec<PathBuf>,
}

impl LibraryProbe {
    pub fn new() -> Self {
        Self {
            explicit: None,
            search_path: None,
            standard: STANDARD_LOCATIONS.iter().map(PathBuf::from).collect(),
        }
    }

    /// Probe configured from the process environment.
    pub fn from_env(explicit: Option<&Path>) -> Self {
        let mut probe = Self::new();
        probe.explicit = explicit.map(Path::to_path_buf);
        probe.search_path = env::var("LD_LIBRARY_PATH").ok().filter(|p| !p.is_empty());
        probe
    }

    pub fn explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    pub fn search_path(mut self, path: impl Into<String>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn standard_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.standard = locations;
        self
    }

    /// Candidate paths in the order they are tried.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = self.explicit.iter().cloned().collect();

        if let Some(search_path) = &self.search_path {
            for dir in env::split_paths(search_path).filter(|d| !d.as_os_str().is_empty()) {
                candidates.extend(LIBRARY_NAMES.iter().map(|name| dir.join(name)));
            }
        }

        candidates.extend(self.standard.iter().cloned());
        candidates
    }

    /// First existing candidate.
    pub fn locate(&self) -> Option<PathBuf> {
        let found = self.candidates().into_iter().find(|path| path.is_file());
        debug!(library = ?found, "Firebird client library probe");
        found
    }

    pub fn preconditions(&self, driver_available: bool) -> Preconditions {
        Preconditions {
            driver_available,
            client_library: self.locate(),
            search_path: self.search_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_order() {
        let probe = LibraryProbe::new()
            .explicit("/custom/libfbclient.so")
            .search_path("/a:/b");
        let candidates = probe.candidates();

        assert_eq!(candidates[0], PathBuf::from("/custom/libfbclient.so"));
        assert_eq!(candidates[1], PathBuf::from("/a/libfbclient.so"));
        assert_eq!(candidates[3], PathBuf::from("/b/libfbclient.so"));
        assert_eq!(
            candidates.last().unwrap(),
            &PathBuf::from("/usr/lib/x86_64-linux-gnu/libfbclient.so.2")
        );
    }

    #[test]
    fn test_locate_in_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("libfbclient.so.2");
        std::fs::write(&library, b"").unwrap();

        let probe = LibraryProbe::new()
            .search_path(dir.path().to_string_lossy())
            .standard_locations(vec![]);
        assert_eq!(probe.locate(), Some(library));
    }

    #[test]
    fn test_missing_library() {
        let probe = LibraryProbe::new()
            .explicit("/nonexistent/libfbclient.so")
            .standard_locations(vec![]);
        let preconditions = probe.preconditions(true);
        assert!(preconditions.client_library.is_none());
        assert!(!preconditions.satisfied());
    }
}
