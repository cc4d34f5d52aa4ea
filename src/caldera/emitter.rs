//! Artifact emission.
//!
//! Writes abilities, profiles and sources in the directory layout Caldera
//! loads from:
//!
//! ```text
//! data/abilities/<tactic>/<id>.yml
//! data/adversaries/<adversary_id>.yml
//! data/sources/<sources_id>.yml
//! playbooks/<playbook id>.json
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{Ability, ConversionManifest, Profile, Sources};
use crate::error::{ConvertError, ConvertResult};

/// Sink for converted artifacts.
pub trait ArtifactEmitter {
    /// Emit one ability.
    fn emit_ability(&mut self, ability: &Ability) -> ConvertResult<()>;

    /// Emit the adversary profile of a top-level playbook.
    fn emit_profile(&mut self, profile: &Profile) -> ConvertResult<()>;

    /// Emit the fact sources of a top-level playbook.
    fn emit_sources(&mut self, sources: &Sources) -> ConvertResult<()>;

    /// Emit the manifest of one traversed playbook.
    fn emit_manifest(&mut self, manifest: &ConversionManifest) -> ConvertResult<()>;
}

/// Writes artifacts below a root directory.
///
/// Existing files are overwritten. Each file is written to a temporary file
/// in the target directory and renamed into place.
#[derive(Debug, Clone)]
pub struct FsEmitter {
    root: PathBuf,
    write_manifest: bool,
}

impl FsEmitter {
    /// Create an emitter writing below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), write_manifest: true }
    }

    /// Enable or disable manifest output.
    pub fn write_manifest(mut self, enabled: bool) -> Self {
        self.write_manifest = enabled;
        self
    }

    /// Path an ability is written to.
    pub fn ability_path(&self, ability: &Ability) -> PathBuf {
        let filed = ability.with_placeholders();
        self.root
            .join("data")
            .join("abilities")
            .join(&filed.tactic)
            .join(format!("{}.yml", filed.id))
    }

    /// Path a profile is written to.
    pub fn profile_path(&self, profile: &Profile) -> PathBuf {
        self.root.join("data").join("adversaries").join(format!("{}.yml", profile.adversary_id))
    }

    /// Path a sources record is written to.
    pub fn sources_path(&self, sources: &Sources) -> PathBuf {
        self.root.join("data").join("sources").join(format!("{}.yml", sources.id))
    }

    /// Path a manifest is written to.
    pub fn manifest_path(&self, manifest: &ConversionManifest) -> PathBuf {
        self.root.join("playbooks").join(format!("{}.json", manifest.id))
    }
}

impl ArtifactEmitter for FsEmitter {
    fn emit_ability(&mut self, ability: &Ability) -> ConvertResult<()> {
        let path = self.ability_path(ability);
        // Caldera expects a list even for a single ability.
        let content = serde_yaml::to_string(&[ability.with_placeholders()])?;
        write_atomic(&path, content.as_bytes())?;
        tracing::debug!(path = ?path, "Wrote ability");
        Ok(())
    }

    fn emit_profile(&mut self, profile: &Profile) -> ConvertResult<()> {
        let path = self.profile_path(profile);
        write_atomic(&path, serde_yaml::to_string(profile)?.as_bytes())?;
        tracing::debug!(path = ?path, "Wrote profile");
        Ok(())
    }

    fn emit_sources(&mut self, sources: &Sources) -> ConvertResult<()> {
        let path = self.sources_path(sources);
        write_atomic(&path, serde_yaml::to_string(sources)?.as_bytes())?;
        tracing::debug!(path = ?path, "Wrote sources");
        Ok(())
    }

    fn emit_manifest(&mut self, manifest: &ConversionManifest) -> ConvertResult<()> {
        if !self.write_manifest {
            return Ok(());
        }
        let path = self.manifest_path(manifest);
        write_atomic(&path, serde_json::to_string_pretty(manifest)?.as_bytes())?;
        tracing::debug!(path = ?path, "Wrote manifest");
        Ok(())
    }
}

/// Collects artifacts in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryEmitter {
    pub abilities: Vec<Ability>,
    pub profiles: Vec<Profile>,
    pub sources: Vec<Sources>,
    pub manifests: Vec<ConversionManifest>,
}

impl MemoryEmitter {
    /// Create an empty emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an emitted ability by id.
    pub fn ability(&self, id: &str) -> Option<&Ability> {
        self.abilities.iter().find(|a| a.id == id)
    }
}

impl ArtifactEmitter for MemoryEmitter {
    fn emit_ability(&mut self, ability: &Ability) -> ConvertResult<()> {
        self.abilities.push(ability.clone());
        Ok(())
    }

    fn emit_profile(&mut self, profile: &Profile) -> ConvertResult<()> {
        self.profiles.push(profile.clone());
        Ok(())
    }

    fn emit_sources(&mut self, sources: &Sources) -> ConvertResult<()> {
        self.sources.push(sources.clone());
        Ok(())
    }

    fn emit_manifest(&mut self, manifest: &ConversionManifest) -> ConvertResult<()> {
        self.manifests.push(manifest.clone());
        Ok(())
    }
}

/// Write `contents` to `path` via a sibling temp file and rename.
fn write_atomic(path: &Path, contents: &[u8]) -> ConvertResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let emit_err = |source| ConvertError::Emit { path: path.to_path_buf(), source };

    std::fs::create_dir_all(dir).map_err(emit_err)?;
    let mut file = NamedTempFile::new_in(dir).map_err(emit_err)?;
    file.write_all(contents).map_err(emit_err)?;
    file.persist(path).map_err(|e| emit_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caldera::{Executor, Platform};
    use tempfile::TempDir;

    fn bash_ability() -> Ability {
        let mut ability = Ability::new("0000aaaa-bbbb-4ccc-dddd-eeeeffff0000", "Scan: 1", "scan");
        ability.executors.push(Executor {
            platform: Platform::Linux,
            name: "bash".to_string(),
            command: "nmap localhost".to_string(),
            timeout: 60,
            payloads: Vec::new(),
            uploads: Vec::new(),
            cleanup: Vec::new(),
            parsers: Vec::new(),
        });
        ability
    }

    #[test]
    fn test_ability_written_under_placeholder_tactic() {
        let temp = TempDir::new().unwrap();
        let mut emitter = FsEmitter::new(temp.path());
        let ability = bash_ability();

        emitter.emit_ability(&ability).unwrap();

        let path = temp
            .path()
            .join("data/abilities/Miscellaneous/0000aaaa-bbbb-4ccc-dddd-eeeeffff0000.yml");
        let written: Vec<Ability> =
            serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].tactic, "Miscellaneous");
        assert_eq!(written[0].technique_id, "x|x");
        assert_eq!(written[0].technique_name, "Miscellaneous");
        assert_eq!(written[0].executors[0].platform, Platform::Linux);
    }

    #[test]
    fn test_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let mut emitter = FsEmitter::new(temp.path());
        let mut ability = bash_ability();

        emitter.emit_ability(&ability).unwrap();
        ability.description = "rescan".to_string();
        emitter.emit_ability(&ability).unwrap();

        let written: Vec<Ability> = serde_yaml::from_str(
            &std::fs::read_to_string(emitter.ability_path(&ability)).unwrap(),
        )
        .unwrap();
        assert_eq!(written[0].description, "rescan");
    }

    #[test]
    fn test_manifest_can_be_disabled() {
        let temp = TempDir::new().unwrap();
        let mut emitter = FsEmitter::new(temp.path()).write_manifest(false);
        let manifest = ConversionManifest {
            id: "playbook--1".to_string(),
            name: "Demo".to_string(),
            adversary_id: "a".to_string(),
            sources_id: "s".to_string(),
            objective_id: "o".to_string(),
            workflow_start: "start".to_string(),
            steps: indexmap::IndexMap::new(),
            facts: Vec::new(),
            relationships: Vec::new(),
        };

        emitter.emit_manifest(&manifest).unwrap();
        assert!(!emitter.manifest_path(&manifest).exists());
    }
}
