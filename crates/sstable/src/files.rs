use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::format::TablePaths;

/// The data, index and bloom handles of one table, acquired as a unit.
///
/// [`TableFiles::create`] either hands back all three handles or none: if a
/// later file cannot be created, the earlier ones are closed and removed
/// before the error is returned. [`TableFiles::discard`] does the same for a
/// fully created triple whose build failed afterwards.
#[derive(Debug)]
pub struct TableFiles {
    paths: TablePaths,
    pub(crate) data: File,
    pub(crate) index: File,
    pub(crate) bloom: File,
}

impl TableFiles {
    /// Creates the three files of table `id` inside `dir`.
    ///
    /// Existing files are never overwritten: a leftover file with the same
    /// name fails creation with [`io::ErrorKind::AlreadyExists`].
    pub(crate) fn create(dir: &Path, id: u32) -> io::Result<Self> {
        let paths = TablePaths::new(dir, id);
        let mut created: Vec<PathBuf> = Vec::with_capacity(3);

        let data = create_tracked(&paths.data, &mut created)?;
        let index = match create_tracked(&paths.index, &mut created) {
            Ok(f) => f,
            Err(e) => {
                drop(data);
                remove_all(&created);
                return Err(e);
            }
        };
        let bloom = match create_tracked(&paths.bloom, &mut created) {
            Ok(f) => f,
            Err(e) => {
                drop(data);
                drop(index);
                remove_all(&created);
                return Err(e);
            }
        };

        Ok(Self {
            paths,
            data,
            index,
            bloom,
        })
    }

    /// Opens the three files of an existing table read-only.
    pub(crate) fn open(dir: &Path, id: u32) -> io::Result<Self> {
        let paths = TablePaths::new(dir, id);
        let data = File::open(&paths.data)?;
        let index = File::open(&paths.index)?;
        let bloom = File::open(&paths.bloom)?;
        Ok(Self {
            paths,
            data,
            index,
            bloom,
        })
    }

    #[must_use]
    pub fn paths(&self) -> &TablePaths {
        &self.paths
    }

    /// Flushes all three files and their directory entry to stable storage.
    pub(crate) fn sync_all(&self) -> io::Result<()> {
        self.data.sync_all()?;
        self.index.sync_all()?;
        self.bloom.sync_all()?;

        if let Some(parent) = self.paths.data.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }

    /// Closes all handles and deletes the files.
    pub(crate) fn discard(self) {
        let Self {
            paths,
            data,
            index,
            bloom,
        } = self;
        drop((data, index, bloom));
        let all: Vec<PathBuf> = paths.iter().map(Path::to_path_buf).collect();
        remove_all(&all);
    }
}

fn create_tracked(path: &Path, created: &mut Vec<PathBuf>) -> io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(path)?;
    created.push(path.to_path_buf());
    Ok(file)
}

fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to remove partial table file");
        }
    }
}
