//! License key stored next to the configuration

use mailwave_core::config::config_dir;
use mailwave_shell::LicenseCheck;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub const LICENSE_FILE_NAME: &str = "license.key";

/// License read from disk at every check, so activating a key takes effect
/// without a restart.
#[derive(Debug, Clone)]
pub struct LicenseFile {
    path: PathBuf,
}

impl LicenseFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `license.key` in the configuration directory
    pub fn in_config_dir() -> Self {
        Self::new(config_dir().join(LICENSE_FILE_NAME))
    }
}

/// Keys look like `ABCD-EFGH-IJKL-MNOP`: four or more groups of four
/// alphanumerics.
pub fn is_well_formed(key: &str) -> bool {
    let groups: Vec<&str> = key.split('-').collect();
    groups.len() >= 4
        && groups
            .iter()
            .all(|group| group.len() == 4 && group.chars().all(|c| c.is_ascii_alphanumeric()))
}

impl LicenseCheck for LicenseFile {
    fn is_valid(&self) -> bool {
        match fs::read_to_string(&self.path) {
            Ok(key) => is_well_formed(key.trim()),
            Err(e) => {
                debug!("No license at {:?}: {}", self.path, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_key_format() {
        assert!(is_well_formed("ABCD-EFGH-IJKL-MNOP"));
        assert!(is_well_formed("abcd-1234-efgh-5678-9xyz"));
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("ABCD-EFGH-IJKL"));
        assert!(!is_well_formed("ABCD-EFGH-IJKL-MN!P"));
        assert!(!is_well_formed("ABCDE-FGH-IJKL-MNOP"));
    }

    #[test]
    fn test_missing_license_is_invalid() {
        let dir = tempdir().unwrap();
        let license = LicenseFile::new(dir.path().join(LICENSE_FILE_NAME));
        assert!(!license.is_valid());
    }

    #[test]
    fn test_license_read_on_every_check() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LICENSE_FILE_NAME);
        let license = LicenseFile::new(&path);

        fs::write(&path, "ABCD-EFGH-IJKL-MNOP\n").unwrap();
        assert!(license.is_valid());

        fs::write(&path, "garbage").unwrap();
        assert!(!license.is_valid());

        fs::remove_file(&path).unwrap();
        assert!(!license.is_valid());
    }
}
