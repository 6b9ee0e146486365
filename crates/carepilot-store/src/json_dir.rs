use carepilot_core::{CarePilotError, CarePilotResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

/// A directory of `<id>.json` records, one file per record.
pub(crate) struct JsonDir {
    dir: PathBuf,
}

impl JsonDir {
    pub(crate) async fn open(dir: PathBuf) -> CarePilotResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Path of the record `id`, or `None` if `id` is not a safe file stem.
    fn path(&self, id: &str) -> Option<PathBuf> {
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        safe.then(|| self.dir.join(format!("{id}.json")))
    }

    pub(crate) async fn exists(&self, id: &str) -> bool {
        match self.path(id) {
            Some(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            None => false,
        }
    }

    /// Writes through a temp file and rename so readers never see a torn record.
    pub(crate) async fn write<T: Serialize>(&self, id: &str, record: &T) -> CarePilotResult<()> {
        let path = self
            .path(id)
            .ok_or_else(|| CarePilotError::Store(format!("invalid record id '{id}'")))?;
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    pub(crate) async fn read<T: DeserializeOwned>(&self, id: &str) -> CarePilotResult<Option<T>> {
        let Some(path) = self.path(id) else {
            return Ok(None);
        };
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(&path).await?;
        let record = serde_json::from_str(&data)
            .map_err(|e| CarePilotError::Store(format!("Failed to parse record {id}: {e}")))?;
        Ok(Some(record))
    }

    pub(crate) async fn read_all<T: DeserializeOwned>(&self) -> CarePilotResult<Vec<T>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            match self.read(stem).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!(record = %stem, error = %e, "Skipping unreadable record"),
            }
        }
        Ok(records)
    }
}
