//! NZB serialization of aggregated releases

use crate::error::{Error, Result};
use crate::store::{FileEntry, Header};
use crate::utils::{MAX_RENAME_ATTEMPTS, numbered_path, nzb_filename};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Writes one NZB 1.1 document per release
#[derive(Clone, Debug)]
pub struct NzbWriter {
    output_dir: PathBuf,
    sort_segments: bool,
}

impl NzbWriter {
    /// Writer saving into `output_dir`
    ///
    /// With `sort_segments` each file's segments are ordered by segment number; otherwise
    /// they keep the order they were recorded in.
    pub fn new(output_dir: impl Into<PathBuf>, sort_segments: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            sort_segments,
        }
    }

    /// Build the NZB model for a release found in `group`
    ///
    /// Files are ordered by file number, then filename.
    pub fn to_nzb(&self, header: &Header, group: &str) -> nntp_rs::Nzb {
        let mut files: Vec<&FileEntry> = header.files.values().collect();
        files.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.name.cmp(&b.name)));

        nntp_rs::Nzb {
            meta: HashMap::from([("title".to_string(), header.name.clone())]),
            files: files
                .into_iter()
                .map(|file| self.nzb_file(file, group))
                .collect(),
        }
    }

    fn nzb_file(&self, file: &FileEntry, group: &str) -> nntp_rs::NzbFile {
        let mut segments: Vec<nntp_rs::NzbSegment> = file
            .messages
            .iter()
            .map(|m| nntp_rs::NzbSegment {
                bytes: m.bytes,
                number: m.segment_no,
                message_id: m.message_id.clone(),
            })
            .collect();
        if self.sort_segments {
            segments.sort_by_key(|s| s.number);
        }

        nntp_rs::NzbFile {
            poster: file.poster.clone(),
            date: file.date,
            subject: file.subject.clone(),
            groups: vec![group.to_string()],
            segments,
        }
    }

    /// Render the NZB document for a release found in `group`
    pub fn render(&self, header: &Header, group: &str) -> String {
        self.to_nzb(header, group).to_xml()
    }

    /// Render and write the NZB, returning the path written
    ///
    /// An existing file is never replaced: if the name is taken the release is saved as
    /// `{name} (N).nzb` with the lowest free `N`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Save`] if the file cannot be created or written.
    pub async fn save(&self, header: &Header, group: &str) -> Result<PathBuf> {
        let preferred = self.output_dir.join(nzb_filename(&header.name, group));
        let document = self.render(header, group);

        let (path, mut file) = create_unique(&preferred).await?;
        let written = async {
            file.write_all(document.as_bytes()).await?;
            file.flush().await
        }
        .await;
        written.map_err(|source| Error::Save {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), files = header.files.len(), "NZB file saved to disk");
        Ok(path)
    }
}

/// Create `preferred`, or the first free `name (N).nzb` next to it
///
/// Files are opened with `create_new`, so releases sharing a display name never overwrite
/// each other, neither within a run nor across runs.
async fn create_unique(preferred: &Path) -> Result<(PathBuf, tokio::fs::File)> {
    for attempt in 0..=MAX_RENAME_ATTEMPTS {
        let path = numbered_path(preferred, attempt);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => {
                if attempt > 0 {
                    tracing::debug!(path = %path.display(), "NZB name taken, saving under a numbered name");
                }
                return Ok((path, file));
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(Error::Save { path, source }),
        }
    }
    Err(Error::Save {
        path: preferred.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free name after {} attempts", MAX_RENAME_ATTEMPTS),
        ),
    })
}
