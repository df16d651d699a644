//! Recursive ownership fix for the generated `~/.ipython` tree.
//!
//! The hub runs as root, so everything it generates starts out root-owned.
//! Symlinks are re-owned themselves and never followed.

use std::path::Path;

use nix::unistd::{Gid, Group, Uid, User};
use walkdir::WalkDir;

use crate::error::{IdentityKind, ProvisionError, Result};

/// Resolve `user` / `group` through the system identity databases.
pub fn resolve_ids(user: &str, group: &str) -> Result<(Uid, Gid)> {
    let lookup_err = |kind, name: &str| ProvisionError::Lookup {
        kind,
        name: name.to_string(),
    };
    let uid = match User::from_name(user) {
        Ok(Some(u)) => u.uid,
        Ok(None) => return Err(lookup_err(IdentityKind::User, user)),
        Err(errno) => {
            tracing::warn!("getpwnam({}) failed: {}", user, errno);
            return Err(lookup_err(IdentityKind::User, user));
        }
    };
    let gid = match Group::from_name(group) {
        Ok(Some(g)) => g.gid,
        Ok(None) => return Err(lookup_err(IdentityKind::Group, group)),
        Err(errno) => {
            tracing::warn!("getgrnam({}) failed: {}", group, errno);
            return Err(lookup_err(IdentityKind::Group, group));
        }
    };
    Ok((uid, gid))
}

/// Chown `root` and everything beneath it to `uid:gid`.
///
/// Not atomic: the first failure is returned and entries already visited keep
/// their new owner. Returns the number of entries changed.
pub fn chown_tree(root: &Path, uid: Uid, gid: Gid) -> Result<usize> {
    let mut changed = 0;
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            ProvisionError::io("walk", path, std::io::Error::from(e))
        })?;
        std::os::unix::fs::lchown(entry.path(), Some(uid.as_raw()), Some(gid.as_raw()))
            .map_err(|e| ProvisionError::io("chown", entry.path(), e))?;
        changed += 1;
    }
    Ok(changed)
}

/// Resolve names, then [`chown_tree`].
pub fn fix_ownership(path: &Path, user: &str, group: &str) -> Result<usize> {
    let (uid, gid) = resolve_ids(user, group)?;
    let changed = chown_tree(path, uid, gid)?;
    tracing::debug!(
        "Chowned {} entries under {} to {}:{}",
        changed,
        path.display(),
        user,
        group
    );
    Ok(changed)
}
