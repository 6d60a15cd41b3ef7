use std::fs::{ self, File };
use std::path::{ Path, PathBuf };

use crate::error::{ Result, SrError };

pub const EXTRACT_DIR: &str = "extr";

/// Unpacks `archive` into `root/extr/<label>` and returns that folder.
///
/// Anything already in that folder is removed first, so a set never mixes
/// images from two archives.
///
/// When the images sit inside a folder of the archive, `inner_folder` names
/// it (relative to the archive root) and its entries are moved up so the
/// returned folder holds the images directly.
pub fn prepare(
    root: &Path,
    archive: &Path,
    inner_folder: Option<&Path>,
    label: &str
) -> Result<PathBuf> {
    if !archive.is_file() {
        return Err(SrError::PathNotFound(archive.to_path_buf()));
    }

    let target = root.join(EXTRACT_DIR).join(label);
    if target.exists() {
        tracing::warn!("replacing previously extracted {}", target.display());
        fs::remove_dir_all(&target)?;
    }
    fs::create_dir_all(&target)?;

    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive
        ::new(file)
        .map_err(|source| SrError::Archive { path: archive.to_path_buf(), source })?;
    zip.extract(&target).map_err(|source| SrError::Archive { path: archive.to_path_buf(), source })?;
    tracing::info!("extracted {} entries of {} into {}", zip.len(), archive.display(), target.display());

    if let Some(inner) = inner_folder.filter(|inner| !inner.as_os_str().is_empty()) {
        flatten(&target, inner)?;
    }

    Ok(target)
}

fn flatten(target: &Path, inner: &Path) -> Result<()> {
    let source = target.join(inner);
    if !source.is_dir() {
        return Err(SrError::PathNotFound(source));
    }

    for entry in fs::read_dir(&source)? {
        let entry = entry?;
        fs::rename(entry.path(), target.join(entry.file_name()))?;
    }

    // remove a pasta interna e os pais que ficaram vazios
    let mut dir = source.as_path();
    while dir != target {
        if fs::read_dir(dir)?.next().is_some() {
            break;
        }
        fs::remove_dir(dir)?;
        match dir.parent() {
            Some(parent) => {
                dir = parent;
            }
            None => {
                break;
            }
        }
    }

    Ok(())
}
