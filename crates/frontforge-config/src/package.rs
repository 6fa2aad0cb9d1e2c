//! Project metadata from `package.json`.

use crate::ConfigResult;
use serde::Deserialize;
use std::path::Path;

use crate::options::ProjectInfo;

#[derive(Debug, Deserialize)]
struct PackageJson {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
}

/// Read name and version from a `package.json`. A missing file is not an
/// error; a malformed one is.
pub fn read_package_info(path: &Path) -> ConfigResult<Option<ProjectInfo>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let package: PackageJson = serde_json::from_str(&content)?;
    Ok(Some(ProjectInfo {
        name: package.name,
        version: package.version,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;

    #[test]
    fn test_missing_package_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let info = read_package_info(&dir.path().join("package.json")).unwrap();
        assert!(info.is_none());
    }

    #[test]
    fn test_reads_name_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, r#"{"name":"shop","version":"0.4.0","private":true}"#).unwrap();
        let info = read_package_info(&path).unwrap().unwrap();
        assert_eq!(info.name, "shop");
        assert_eq!(info.version, "0.4.0");
    }

    #[test]
    fn test_malformed_package_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            read_package_info(&path),
            Err(ConfigError::Package(_))
        ));
    }
}
