//! Package map spec
//!
//! Cross-container association table telling the game which maps load
//! which asset files. Newly-added assets of map-relevant types must be
//! registered here or the game never streams them in. Multiple container
//! tasks read-modify-write the same spec concurrently, so the runner keeps
//! the single instance behind a mutex. (De)serialization of the on-disk
//! JSON form is left to the caller.

use serde::{Deserialize, Serialize};

/// One map known to the spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecMap {
    /// Map name, e.g. `game/sp/intro/intro`
    pub name: String,
}

/// One asset file known to the spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecFile {
    /// Asset file name
    pub name: String,
}

/// Association between a file and a map, by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecMapFileRef {
    /// Index into [`PackageMapSpec::files`]
    pub file: usize,
    /// Index into [`PackageMapSpec::maps`]
    pub map: usize,
}

/// The package map spec: maps, files, and their cross references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMapSpec {
    /// All known maps
    pub maps: Vec<SpecMap>,
    /// All known asset files
    pub files: Vec<SpecFile>,
    /// File-to-map associations
    pub map_file_refs: Vec<SpecMapFileRef>,
}

impl PackageMapSpec {
    /// Associate an asset file with a map, interning both as needed.
    /// Idempotent: an existing association is left alone.
    pub fn add_custom_asset(&mut self, map_name: &str, file_name: &str) {
        let map = match self.maps.iter().position(|m| m.name == map_name) {
            Some(index) => index,
            None => {
                self.maps.push(SpecMap {
                    name: map_name.to_string(),
                });
                self.maps.len() - 1
            }
        };
        let file = match self.files.iter().position(|f| f.name == file_name) {
            Some(index) => index,
            None => {
                self.files.push(SpecFile {
                    name: file_name.to_string(),
                });
                self.files.len() - 1
            }
        };

        let reference = SpecMapFileRef { file, map };
        if !self.map_file_refs.contains(&reference) {
            self.map_file_refs.push(reference);
            log::debug!("registered {file_name} for map {map_name}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_custom_asset_interns_and_links() {
        let mut spec = PackageMapSpec::default();
        spec.add_custom_asset("game/sp/intro/intro", "new_asset.decl");
        spec.add_custom_asset("game/sp/intro/intro", "other_asset.decl");

        assert_eq!(spec.maps.len(), 1);
        assert_eq!(spec.files.len(), 2);
        assert_eq!(spec.map_file_refs.len(), 2);
        assert_eq!(spec.map_file_refs[1], SpecMapFileRef { file: 1, map: 0 });
    }

    #[test]
    fn test_add_custom_asset_is_idempotent() {
        let mut spec = PackageMapSpec::default();
        spec.add_custom_asset("m", "f");
        spec.add_custom_asset("m", "f");
        assert_eq!(spec.map_file_refs.len(), 1);
    }

    #[test]
    fn test_json_field_names() {
        let mut spec = PackageMapSpec::default();
        spec.add_custom_asset("m", "f");
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"mapFileRefs\""));
        assert!(json.contains("\"maps\""));
    }
}
