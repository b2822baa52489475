//! Output directory preparation.
//!
//! [`prepare`] runs before anything is persisted: whatever a previous run left
//! in the assets directory is removed and the directory is recreated empty.

use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::EnvironmentError;

const PROBE_FILE: &str = "..__probe_write__";

/// Reset `base_path` to an empty, writable directory.
///
/// Calling it again right after a successful call is a no-op apart from the
/// write probe.
///
/// # Arguments
///
/// * `base_path` - Directory that will hold the run's article files
///
/// # Returns
///
/// `Ok(())` once the directory exists, is empty and accepts writes.
///
/// # Errors
///
/// [`EnvironmentError::NotADirectory`] when a file occupies the path, and
/// `Remove`, `Create` or `NotWritable` when the filesystem denies that step.
#[instrument(level = "info", skip_all, fields(path = %base_path.display()))]
pub async fn prepare(base_path: &Path) -> Result<(), EnvironmentError> {
    match fs::metadata(base_path).await {
        Ok(meta) if !meta.is_dir() => {
            return Err(EnvironmentError::NotADirectory(base_path.to_path_buf()));
        }
        Ok(_) => {
            if !is_empty(base_path).await? {
                info!("Removing previous run's output");
                fs::remove_dir_all(base_path)
                    .await
                    .map_err(|source| EnvironmentError::Remove {
                        path: base_path.to_path_buf(),
                        source,
                    })?;
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Output directory does not exist yet");
        }
        Err(source) => {
            return Err(EnvironmentError::Create {
                path: base_path.to_path_buf(),
                source,
            });
        }
    }

    fs::create_dir_all(base_path)
        .await
        .map_err(|source| EnvironmentError::Create {
            path: base_path.to_path_buf(),
            source,
        })?;

    ensure_writable(base_path).await?;
    info!("Output directory is empty and writable");
    Ok(())
}

async fn is_empty(path: &Path) -> Result<bool, EnvironmentError> {
    let remove_err = |source| EnvironmentError::Remove {
        path: path.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(path).await.map_err(remove_err)?;
    Ok(entries.next_entry().await.map_err(remove_err)?.is_none())
}

/// Create and immediately delete a probe file.
async fn ensure_writable(path: &Path) -> Result<(), EnvironmentError> {
    let probe = path.join(PROBE_FILE);
    let not_writable = |source| EnvironmentError::NotWritable {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&probe, b"").await.map_err(not_writable)?;
    fs::remove_file(&probe).await.map_err(not_writable)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn entries(path: &Path) -> usize {
        let mut count = 0;
        let mut dir = fs::read_dir(path).await.unwrap();
        while dir.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let assets = tmp.path().join("tmp").join("articles");
        prepare(&assets).await.unwrap();
        assert!(assets.is_dir());
        assert_eq!(entries(&assets).await, 0);
    }

    #[tokio::test]
    async fn test_clears_previous_output() {
        let tmp = tempfile::tempdir().unwrap();
        let assets = tmp.path().join("articles");
        std::fs::create_dir_all(assets.join("nested")).unwrap();
        std::fs::write(assets.join("1_raw.txt"), "old").unwrap();
        std::fs::write(assets.join("nested").join("x"), "old").unwrap();

        prepare(&assets).await.unwrap();
        assert!(assets.is_dir());
        assert_eq!(entries(&assets).await, 0);
    }

    #[tokio::test]
    async fn test_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let assets = tmp.path().join("articles");
        prepare(&assets).await.unwrap();
        prepare(&assets).await.unwrap();
        assert!(assets.is_dir());
        assert_eq!(entries(&assets).await, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_denied_filesystem_steps_are_classified() {
        use std::os::unix::fs::PermissionsExt;

        let mode = |path: &Path, bits: u32| {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(bits)).unwrap()
        };

        let tmp = tempfile::tempdir().unwrap();
        let locked = tmp.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        let stale = locked.join("stale");
        std::fs::create_dir(&stale).unwrap();
        std::fs::write(stale.join("1_raw.txt"), "old").unwrap();
        let readonly = tmp.path().join("readonly");
        std::fs::create_dir(&readonly).unwrap();

        mode(&locked, 0o555);
        mode(&readonly, 0o555);

        // permission bits do not bind root
        if std::fs::write(locked.join("root-check"), b"").is_ok() {
            mode(&locked, 0o755);
            mode(&readonly, 0o755);
            return;
        }

        let create = prepare(&locked.join("articles")).await.unwrap_err();
        let remove = prepare(&stale).await.unwrap_err();
        let not_writable = prepare(&readonly).await.unwrap_err();

        mode(&locked, 0o755);
        mode(&readonly, 0o755);

        assert!(matches!(create, EnvironmentError::Create { .. }), "{create:?}");
        assert!(matches!(remove, EnvironmentError::Remove { .. }), "{remove:?}");
        assert!(
            matches!(not_writable, EnvironmentError::NotWritable { .. }),
            "{not_writable:?}"
        );
    }

    #[tokio::test]
    async fn test_rejects_file_in_the_way() {
        let tmp = tempfile::tempdir().unwrap();
        let assets = tmp.path().join("articles");
        std::fs::write(&assets, "not a directory").unwrap();

        let err = prepare(&assets).await.unwrap_err();
        assert!(matches!(err, EnvironmentError::NotADirectory(_)));
        assert!(assets.is_file());
    }
}
