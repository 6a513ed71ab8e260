use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs::{create_dir_all, remove_file, rename, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex, MutexGuard};

use crate::Error;

/// A named persisted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Courses,
    Enrollments,
    Feedback,
}

impl Resource {
    pub fn name(&self) -> &'static str {
        match self {
            Resource::Courses => "courses",
            Resource::Enrollments => "enrollments",
            Resource::Feedback => "feedback",
        }
    }
}

/// Flat-file JSON storage, one file per [`Resource`] under `root`.
///
/// Collections are always read and written whole. Writers that do a
/// load-mutate-save cycle should hold [`RecordStore::lock`] for the whole cycle.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
    writer: Arc<Mutex<()>>,
}

impl RecordStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub async fn prepare_io(&self) -> anyhow::Result<()> {
        create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn path_of(&self, resource: Resource) -> PathBuf {
        self.root.join(format!("{}.json", resource.name()))
    }

    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Loads every record of `resource`. A resource that was never written is empty.
    pub async fn load<T: DeserializeOwned>(&self, resource: Resource) -> Result<Vec<T>, Error> {
        let path = self.path_of(resource);
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut bytes = Vec::new();
        BufReader::new(file).read_to_end(&mut bytes).await?;
        serde_json::from_slice(&bytes).map_err(|err| Error::InternalError {
            kind: "CorruptResource",
            message: format!("{} is malformed: {}", path.display(), err),
        })
    }

    /// Replaces the whole of `resource` with `records`.
    pub async fn save<T: Serialize>(&self, resource: Resource, records: &[T]) -> Result<(), Error> {
        let path = self.path_of(resource);
        let bytes = serde_json::to_vec_pretty(records)?;

        create_dir_all(&self.root).await?;
        // readers never observe a half-written file
        let staging = path.with_extension("json.tmp");
        if let Err(err) = write_staged(&staging, &path, &bytes).await {
            if let Err(cleanup) = remove_file(&staging).await {
                log::warn!("Could not remove {}: {}", staging.display(), cleanup);
            }
            return Err(err.into());
        }

        log::debug!("Saved {} records to {}", records.len(), path.display());
        Ok(())
    }
}

async fn write_staged(staging: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(staging).await?);
    writer.write_all(bytes).await?;
    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    rename(staging, path).await
}
