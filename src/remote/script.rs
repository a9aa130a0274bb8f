//! Remote command templates.
//!
//! Every command sent to the remote host is built here. Templates are fixed
//! text; the only interpolated values are paths and names, which are checked
//! by [`validate_remote_path`] / [`validate_file_name`] and always passed
//! through [`quote`] into shell variables at the top of the script.

use crate::types::{ArchiveKind, ArtifactKind, RemoteWorkspace};
use std::borrow::Cow;

/// Printed by the install script for every binary moved into the backup store.
pub const BACKUP_MARKER: &str = "@@backup ";
/// Printed by the install script for every binary activated.
pub const INSTALL_MARKER: &str = "@@install ";

const PRESENT: &str = "present";
const SKIPPED: &str = "skipped";

pub fn quote(value: &str) -> Cow<'_, str> {
    shell_words::quote(value)
}

/// Wrap a script so it runs under `sh` whatever the remote login shell is.
pub fn wrap_sh(script: &str) -> String {
    format!("sh -c {}", quote(script))
}

/// Remote directories must be absolute single-line paths.
pub fn validate_remote_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err(format!("remote path must be absolute: {path:?}"));
    }
    if path.contains(['\n', '\r', '\0']) {
        return Err(format!("remote path contains a control character: {path:?}"));
    }
    Ok(())
}

/// Artifact and binary names become single path components remotely.
pub fn validate_file_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(format!("invalid file name: {name:?}"));
    }
    if name.contains(['/', '\n', '\r', '\0']) {
        return Err(format!("file name contains a forbidden character: {name:?}"));
    }
    Ok(())
}

/// Create the landing, backup and activation directories and lock down the
/// home, landing and backup directories. Safe to run repeatedly.
pub fn prepare_workspace(ws: &RemoteWorkspace) -> String {
    format!(
        "set -eu\n\
         HOME_DIR={home}\n\
         LANDING_DIR={landing}\n\
         BACKUP_DIR={backup}\n\
         DEST_DIR={dest}\n\
         mkdir -p \"$LANDING_DIR\" \"$BACKUP_DIR\" \"$DEST_DIR\"\n\
         chmod 0700 \"$HOME_DIR\" \"$LANDING_DIR\" \"$BACKUP_DIR\"\n",
        home = quote(&ws.home_dir),
        landing = quote(&ws.landing_dir()),
        backup = quote(&ws.backup_dir()),
        dest = quote(&ws.activation_dir),
    )
}

/// Prints `present` when the path exists, `absent` otherwise.
pub fn probe_exists(path: &str) -> String {
    format!(
        "if [ -e {p} ]; then echo {PRESENT}; else echo absent; fi",
        p = quote(path)
    )
}

pub fn is_present(output: &str) -> bool {
    output.lines().any(|line| line.trim() == PRESENT)
}

/// Move a completed upload into its final name. With `no_clobber` an
/// existing final file wins and the upload is discarded.
pub fn finalize_upload(partial: &str, final_path: &str, no_clobber: bool) -> String {
    if no_clobber {
        format!(
            "if [ -e {f} ]; then rm -f {p}; echo {SKIPPED}; else mv -f {p} {f}; fi",
            p = quote(partial),
            f = quote(final_path)
        )
    } else {
        format!("mv -f {} {}", quote(partial), quote(final_path))
    }
}

pub fn was_skipped(output: &str) -> bool {
    output.lines().any(|line| line.trim() == SKIPPED)
}

pub fn remove_file(path: &str) -> String {
    format!("rm -f {}", quote(path))
}

/// Print the SHA-256 of a remote file, falling back to `shasum` where
/// coreutils are missing.
pub fn sha256(path: &str) -> String {
    let p = quote(path);
    format!("{{ sha256sum {p} 2>/dev/null || shasum -a 256 {p}; }} | cut -d' ' -f1")
}

fn extract_command(kind: ArchiveKind) -> &'static str {
    match kind {
        ArchiveKind::TarGz => "tar -xzf \"$LANDED\" -C \"$EXTRACT_DIR\"",
        ArchiveKind::TarXz => "tar -xJf \"$LANDED\" -C \"$EXTRACT_DIR\"",
        ArchiveKind::TarBz2 => "tar -xjf \"$LANDED\" -C \"$EXTRACT_DIR\"",
        ArchiveKind::Tar => "tar -xf \"$LANDED\" -C \"$EXTRACT_DIR\"",
        ArchiveKind::Zip => "unzip -q -o \"$LANDED\" -d \"$EXTRACT_DIR\"",
    }
}

// Shared body: stage next to the destination, back up the old binary, then
// rename the staged copy into place.
const INSTALL_FUNCTION: &str = r#"install_binary() {
  src=$1
  name=$(basename "$src")
  case "$SEEN" in
    *"/$name/"*) echo "duplicate binary name in artifact: $name" >&2; exit 1 ;;
  esac
  SEEN="$SEEN$name/"
  dest="$DEST_DIR/$name"
  if [ -e "$dest" ] || [ -L "$dest" ]; then
    if [ ! -f "$dest" ]; then
      echo "refusing to replace non-regular file: $dest" >&2
      exit 1
    fi
  fi
  STAGED="$DEST_DIR/.$name.new"
  cp "$src" "$STAGED"
  if [ -n "$OWNER" ]; then
    chown "$OWNER" "$STAGED"
  fi
  chmod 0755 "$STAGED"
  if [ -f "$dest" ]; then
    mv -f "$dest" "$BACKUP_DIR/$name"
    chmod 0700 "$BACKUP_DIR/$name"
    echo "@@backup $name"
  fi
  mv -f "$STAGED" "$dest"
  STAGED=""
  echo "@@install $name"
}
"#;

/// Build the per-artifact install script. It runs under `set -eu`, so any
/// failing step aborts this artifact only; the scratch directory and any
/// staged copy are removed on exit either way.
pub fn install_artifact(
    ws: &RemoteWorkspace,
    file_name: &str,
    stem: &str,
    kind: ArtifactKind,
) -> String {
    let extract_dir = ws.extract_dir(stem);
    let mut script = format!(
        "set -eu\n\
         LANDED={landed}\n\
         BACKUP_DIR={backup}\n\
         DEST_DIR={dest}\n\
         EXTRACT_DIR={extract}\n\
         CANDIDATES={candidates}\n\
         OWNER={owner}\n\
         SEEN=/\n\
         STAGED=\"\"\n\
         cleanup() {{\n  rm -rf \"$EXTRACT_DIR\" \"$CANDIDATES\"\n  if [ -n \"$STAGED\" ]; then rm -f \"$STAGED\"; fi\n}}\n\
         trap cleanup EXIT\n",
        landed = quote(&ws.landed_path(file_name)),
        backup = quote(&ws.backup_dir()),
        dest = quote(&ws.activation_dir),
        extract = quote(&extract_dir),
        candidates = quote(&format!("{extract_dir}.candidates")),
        owner = quote(ws.activation_owner.as_deref().unwrap_or("")),
    );
    script.push_str(INSTALL_FUNCTION);

    match kind {
        ArtifactKind::Archive(archive) => {
            script.push_str("rm -rf \"$EXTRACT_DIR\"\nmkdir -p \"$EXTRACT_DIR\"\n");
            script.push_str(extract_command(archive));
            script.push('\n');
            script.push_str(
                "find \"$EXTRACT_DIR\" -type f -perm -u+x > \"$CANDIDATES\"\n\
                 while IFS= read -r file; do\n  install_binary \"$file\"\ndone < \"$CANDIDATES\"\n",
            );
        }
        ArtifactKind::Executable => {
            script.push_str("install_binary \"$LANDED\"\n");
        }
    }
    script
}
