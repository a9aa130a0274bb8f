//! Validation that runs before anything touches the remote host.
//!
//! Archives are opened locally to learn which binaries they will install,
//! so two artifacts that would activate the same binary name are rejected
//! up front instead of silently overwriting each other.

use crate::deploy::{DeployError, Result};
use crate::remote::script;
use crate::types::{ArchiveKind, ArtifactKind, ArtifactRef};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// What pre-flight learned about one artifact.
#[derive(Debug, Clone)]
pub struct ArtifactPlan {
    pub artifact: ArtifactRef,
    pub file_name: String,
    pub stem: String,
    pub kind: ArtifactKind,
    /// Binary names the install step will activate; `None` when the local
    /// file could not be inspected (the transfer step reports why).
    pub binaries: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct DeploymentPlan {
    pub artifacts: Vec<ArtifactPlan>,
}

impl DeploymentPlan {
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Validate the artifact list and build the plan, keeping input order.
pub fn plan(artifacts: &[ArtifactRef]) -> Result<DeploymentPlan> {
    let mut by_file_name: HashMap<String, &ArtifactRef> = HashMap::new();
    let mut by_binary: HashMap<String, String> = HashMap::new();
    let mut planned = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let file_name = artifact.file_name();
        script::validate_file_name(&file_name).map_err(DeployError::Validation)?;
        // Hidden names in the landing directory hold uploads and scratch space.
        if file_name.starts_with('.') {
            return Err(DeployError::Validation(format!(
                "artifact {artifact} has a hidden file name; rename it without the leading '.'"
            )));
        }

        if let Some(previous) = by_file_name.insert(file_name.clone(), artifact) {
            return Err(DeployError::Validation(format!(
                "artifacts {previous} and {artifact} share the file name {file_name}"
            )));
        }

        let kind = artifact.kind();
        let binaries = match binary_names(artifact.path(), kind) {
            Ok(names) => Some(names),
            Err(e) => {
                warn!("Could not inspect {}: {}", artifact, e);
                None
            }
        };

        if let Some(names) = &binaries {
            debug!("{} will install {:?}", file_name, names);
            for name in names {
                script::validate_file_name(name).map_err(DeployError::Validation)?;
                if let Some(owner) = by_binary.insert(name.clone(), file_name.clone()) {
                    let detail = if owner == file_name {
                        format!("{file_name} contains more than one binary named {name}")
                    } else {
                        format!("{owner} and {file_name} both install a binary named {name}")
                    };
                    return Err(DeployError::Validation(detail));
                }
            }
        }

        planned.push(ArtifactPlan {
            artifact: artifact.clone(),
            stem: artifact.stem(),
            file_name,
            kind,
            binaries,
        });
    }

    Ok(DeploymentPlan { artifacts: planned })
}

/// Names of the binaries an artifact will install: every owner-executable
/// regular file in an archive, or the file itself for a bare executable.
pub fn binary_names(path: &Path, kind: ArtifactKind) -> std::io::Result<Vec<String>> {
    match kind {
        ArtifactKind::Executable => {
            let metadata = std::fs::metadata(path)?;
            if !metadata.is_file() {
                return Err(std::io::Error::other("not a regular file"));
            }
            Ok(path
                .file_name()
                .map(|n| vec![n.to_string_lossy().into_owned()])
                .unwrap_or_default())
        }
        ArtifactKind::Archive(ArchiveKind::Zip) => zip_binaries(File::open(path)?),
        ArtifactKind::Archive(archive) => {
            let file = File::open(path)?;
            match archive {
                ArchiveKind::TarGz => tar_binaries(flate2::read::GzDecoder::new(file)),
                ArchiveKind::TarXz => tar_binaries(xz2::read::XzDecoder::new(file)),
                ArchiveKind::TarBz2 => tar_binaries(bzip2::read::BzDecoder::new(file)),
                _ => tar_binaries(file),
            }
        }
    }
}

fn tar_binaries<R: Read>(reader: R) -> std::io::Result<Vec<String>> {
    let mut archive = tar::Archive::new(reader);
    let mut names = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        let header = entry.header();
        if !header.entry_type().is_file() {
            continue;
        }
        if header.mode()? & 0o100 == 0 {
            continue;
        }
        if let Some(name) = entry.path()?.file_name() {
            names.push(name.to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

fn zip_binaries(file: File) -> std::io::Result<Vec<String>> {
    let mut archive = zip::ZipArchive::new(file).map_err(std::io::Error::other)?;
    let mut names = Vec::new();
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(std::io::Error::other)?;
        if !entry.is_file() {
            continue;
        }
        if entry.unix_mode().unwrap_or(0) & 0o100 == 0 {
            continue;
        }
        if let Some(name) = Path::new(entry.name()).file_name() {
            names.push(name.to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn write_tar_gz(dir: &Path, name: &str, entries: &[(&str, u32, &[u8])]) -> ArtifactRef {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (entry_path, mode, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, entry_path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        ArtifactRef::new(path)
    }

    #[test]
    fn test_tar_gz_binary_names_skip_non_executables() {
        let dir = TempDir::new().unwrap();
        let artifact = write_tar_gz(
            dir.path(),
            "tool-a-v1.tar.gz",
            &[
                ("tool-a-v1/tool-a", 0o755, &b"#!/bin/sh\n"[..]),
                ("tool-a-v1/README.md", 0o644, &b"docs"[..]),
            ],
        );

        let names = binary_names(artifact.path(), artifact.kind()).unwrap();
        assert_eq!(names, vec!["tool-a"]);
    }

    #[test]
    fn test_bare_executable_is_its_own_binary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool-linux-amd64");
        std::fs::write(&path, b"\x7fELF").unwrap();
        let artifact = ArtifactRef::new(path);

        let plan = plan(&[artifact]).unwrap();
        assert_eq!(
            plan.artifacts[0].binaries.as_deref(),
            Some(&["tool-linux-amd64".to_string()][..])
        );
        assert_eq!(plan.artifacts[0].kind, ArtifactKind::Executable);
    }

    #[test]
    fn test_duplicate_file_names_rejected() {
        let artifacts = vec![
            ArtifactRef::new("/a/tool.tar.gz"),
            ArtifactRef::new("/b/tool.tar.gz"),
        ];
        let err = plan(&artifacts).unwrap_err();
        assert!(matches!(err, DeployError::Validation(msg) if msg.contains("share the file name")));
    }

    #[test]
    fn test_shared_binary_name_across_artifacts_rejected() {
        let dir = TempDir::new().unwrap();
        let first = write_tar_gz(dir.path(), "tool-v1.tar.gz", &[("tool", 0o755, &b"1"[..])]);
        let second = write_tar_gz(dir.path(), "tool-v2.tar.gz", &[("bin/tool", 0o755, &b"2"[..])]);

        let err = plan(&[first, second]).unwrap_err();
        assert!(
            matches!(err, DeployError::Validation(msg) if msg.contains("both install a binary named tool"))
        );
    }

    #[test]
    fn test_hidden_artifact_names_rejected() {
        let artifacts = vec![
            ArtifactRef::new("/a/tool.tar.gz"),
            ArtifactRef::new("/a/.extract"),
        ];
        let err = plan(&artifacts).unwrap_err();
        assert!(matches!(err, DeployError::Validation(msg) if msg.contains("hidden file name")));

        let err = plan(&[ArtifactRef::new("/a/.tool.partial")]).unwrap_err();
        assert!(matches!(err, DeployError::Validation(_)));
    }

    #[test]
    fn test_missing_artifact_is_not_fatal() {
        let plan = plan(&[ArtifactRef::new("/nowhere/tool.tar.gz")]).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.artifacts[0].binaries.is_none());
        assert_eq!(plan.artifacts[0].stem, "tool");
    }

    #[test]
    fn test_plan_preserves_input_order() {
        let artifacts = vec![
            ArtifactRef::new("/x/c"),
            ArtifactRef::new("/x/a"),
            ArtifactRef::new("/x/b"),
        ];
        let plan = plan(&artifacts).unwrap();
        let names: Vec<_> = plan.artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
