//! Path validation for generated artifacts.
//!
//! Paths recorded in spawner state come back from the host's database, so
//! before anything is deleted they are checked lexically against the layout
//! condaspawn generates. Only `<home_root>/<user>/.ipython/kernels/AUTO_*-conda`
//! and `<home_root>/<user>/.ipython/profile_*-conda` are accepted, so a user's
//! own kernels and `profile_default` can never be touched.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::layout::{UserLayout, ENV_NAME_SUFFIX, KERNEL_DIR_PREFIX, PROFILE_DIR_PREFIX};

/// Which generated artifact a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Kernel,
    Profile,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathValidationError {
    #[error("path '{path}' contains relative components")]
    NotNormalized { path: PathBuf },

    #[error("path '{path}' is outside '{root}'")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("path '{path}' belongs to user '{found}', expected '{expected}'")]
    WrongUser {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("path '{path}' is not a generated kernel or profile directory")]
    NotGenerated { path: PathBuf },
}

/// Resolve which user owns a generated artifact path, and what kind it is.
pub fn artifact_owner(
    home_root: &Path,
    path: &Path,
) -> Result<(String, ArtifactKind), PathValidationError> {
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
    {
        return Err(PathValidationError::NotNormalized {
            path: path.to_path_buf(),
        });
    }
    let rest = path
        .strip_prefix(home_root)
        .map_err(|_| PathValidationError::OutsideRoot {
            path: path.to_path_buf(),
            root: home_root.to_path_buf(),
        })?;
    let parts: Vec<&str> = rest
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    let not_generated = || PathValidationError::NotGenerated {
        path: path.to_path_buf(),
    };

    let kind = match parts.as_slice() {
        [_, ".ipython", "kernels", dir] if is_generated_name(dir, KERNEL_DIR_PREFIX) => {
            ArtifactKind::Kernel
        }
        [_, ".ipython", dir] if is_generated_name(dir, PROFILE_DIR_PREFIX) => {
            ArtifactKind::Profile
        }
        _ => return Err(not_generated()),
    };
    Ok((parts[0].to_string(), kind))
}

/// Validate that `path` is a generated artifact inside `layout`'s home.
pub fn validate_artifact_path(
    layout: &UserLayout,
    path: &Path,
) -> Result<ArtifactKind, PathValidationError> {
    let home_root = layout.home().parent().unwrap_or_else(|| Path::new("/"));
    let (owner, kind) = artifact_owner(home_root, path)?;
    if owner != layout.user() {
        return Err(PathValidationError::WrongUser {
            path: path.to_path_buf(),
            expected: layout.user().to_string(),
            found: owner,
        });
    }
    Ok(kind)
}

fn is_generated_name(dir: &str, prefix: &str) -> bool {
    dir.len() > prefix.len() + ENV_NAME_SUFFIX.len()
        && dir.starts_with(prefix)
        && dir.ends_with(ENV_NAME_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_generated_paths() {
        let layout = UserLayout::new(Path::new("/home"), "alice");
        assert_eq!(
            validate_artifact_path(&layout, &layout.kernel_dir("myenv-conda")),
            Ok(ArtifactKind::Kernel)
        );
        assert_eq!(
            validate_artifact_path(&layout, &layout.profile_dir("myenv-conda")),
            Ok(ArtifactKind::Profile)
        );
    }

    #[test]
    fn test_rejects_other_user() {
        let layout = UserLayout::new(Path::new("/home"), "alice");
        let bob = UserLayout::new(Path::new("/home"), "bob");
        let err = validate_artifact_path(&layout, &bob.kernel_dir("x-conda")).unwrap_err();
        assert!(matches!(err, PathValidationError::WrongUser { .. }));
    }

    #[test]
    fn test_rejects_non_generated_and_traversal() {
        let layout = UserLayout::new(Path::new("/home"), "alice");
        for p in [
            "/home/alice/.ipython",
            "/home/alice/.ipython/kernels",
            "/home/alice/.ipython/kernels/python3",
            "/home/alice/.ipython/kernels/AUTO_",
            "/home/alice/.ipython/kernels/AUTO_-conda",
            "/home/alice/.ipython/profile_default",
            "/home/alice/.ipython/profile_default/startup",
            "/home/alice/.conda/envs/myenv",
        ] {
            assert!(
                matches!(
                    validate_artifact_path(&layout, Path::new(p)),
                    Err(PathValidationError::NotGenerated { .. })
                ),
                "{p} should be rejected"
            );
        }
        assert!(matches!(
            validate_artifact_path(
                &layout,
                Path::new("/home/alice/.ipython/kernels/AUTO_x-conda/../../..")
            ),
            Err(PathValidationError::NotNormalized { .. })
        ));
        assert!(matches!(
            validate_artifact_path(&layout, Path::new("/etc/profile_x-conda")),
            Err(PathValidationError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn test_artifact_owner() {
        let (user, kind) = artifact_owner(
            Path::new("/srv/homes"),
            Path::new("/srv/homes/carol/.ipython/profile_ml-conda"),
        )
        .unwrap();
        assert_eq!(user, "carol");
        assert_eq!(kind, ArtifactKind::Profile);
    }
}
