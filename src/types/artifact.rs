use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Archive formats the install step knows how to unpack remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveKind {
    TarGz,
    TarXz,
    TarBz2,
    Tar,
    Zip,
}

impl ArchiveKind {
    const SUFFIXES: &'static [(&'static str, ArchiveKind)] = &[
        (".tar.gz", ArchiveKind::TarGz),
        (".tgz", ArchiveKind::TarGz),
        (".tar.xz", ArchiveKind::TarXz),
        (".txz", ArchiveKind::TarXz),
        (".tar.bz2", ArchiveKind::TarBz2),
        (".tbz2", ArchiveKind::TarBz2),
        (".tar", ArchiveKind::Tar),
        (".zip", ArchiveKind::Zip),
    ];

    /// Detect the archive kind from a file name, case-insensitively.
    pub fn detect(file_name: &str) -> Option<(Self, &'static str)> {
        let lower = file_name.to_ascii_lowercase();
        Self::SUFFIXES
            .iter()
            .find(|(suffix, _)| lower.ends_with(suffix) && lower.len() > suffix.len())
            .map(|(suffix, kind)| (*kind, *suffix))
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::TarXz => "tar.xz",
            ArchiveKind::TarBz2 => "tar.bz2",
            ArchiveKind::Tar => "tar",
            ArchiveKind::Zip => "zip",
        };
        f.write_str(name)
    }
}

/// What a landed artifact is once it reaches the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Archive(ArchiveKind),
    Executable,
}

/// A downloaded release asset on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub path: PathBuf,
}

impl ArtifactRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base file name; this is also the name it lands under remotely.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn kind(&self) -> ArtifactKind {
        match ArchiveKind::detect(&self.file_name()) {
            Some((kind, _)) => ArtifactKind::Archive(kind),
            None => ArtifactKind::Executable,
        }
    }

    /// File name with any archive suffix removed (`tool-v1.tar.gz` -> `tool-v1`).
    pub fn stem(&self) -> String {
        let name = self.file_name();
        match ArchiveKind::detect(&name) {
            Some((_, suffix)) => name[..name.len() - suffix.len()].to_string(),
            None => name,
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<PathBuf> for ArtifactRef {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_detection() {
        assert_eq!(
            ArtifactRef::new("/dl/tool-a-v1.tar.gz").kind(),
            ArtifactKind::Archive(ArchiveKind::TarGz)
        );
        assert_eq!(
            ArtifactRef::new("/dl/tool.TGZ").kind(),
            ArtifactKind::Archive(ArchiveKind::TarGz)
        );
        assert_eq!(
            ArtifactRef::new("tool_linux_amd64.zip").kind(),
            ArtifactKind::Archive(ArchiveKind::Zip)
        );
        assert_eq!(
            ArtifactRef::new("tool.tar.xz").kind(),
            ArtifactKind::Archive(ArchiveKind::TarXz)
        );
        assert_eq!(ArtifactRef::new("/dl/tool-linux-amd64").kind(), ArtifactKind::Executable);
    }

    #[test]
    fn test_bare_suffix_is_not_an_archive() {
        assert_eq!(ArtifactRef::new(".tar.gz").kind(), ArtifactKind::Executable);
    }

    #[test]
    fn test_stem_strips_archive_suffix() {
        assert_eq!(ArtifactRef::new("/dl/tool-a-v1.tar.gz").stem(), "tool-a-v1");
        assert_eq!(ArtifactRef::new("tool.tbz2").stem(), "tool");
        assert_eq!(ArtifactRef::new("tool-linux").stem(), "tool-linux");
    }
}
