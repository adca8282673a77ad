use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::CodecError;

/// Where document bytes come from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Path(PathBuf),
    Url(String),
    Bytes(Vec<u8>),
}

impl DocumentSource {
    /// Short display name used for the document title.
    pub fn display_name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Url(url) => url
                .rsplit('/')
                .find(|segment| !segment.is_empty())
                .unwrap_or(url.as_str())
                .to_owned(),
            Self::Bytes(_) => "Untitled.pdf".to_owned(),
        }
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for DocumentSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Resolves a source to raw bytes. URLs are fetched with a blocking GET.
pub fn read_source(source: DocumentSource) -> Result<Vec<u8>, CodecError> {
    match source {
        DocumentSource::Path(path) => {
            log::debug!("reading document from {}", path.display());
            Ok(fs::read(path)?)
        }
        DocumentSource::Url(url) => fetch(&url),
        DocumentSource::Bytes(bytes) => Ok(bytes),
    }
}

fn fetch(url: &str) -> Result<Vec<u8>, CodecError> {
    log::info!("fetching document from {url}");
    let response = ureq::agent()
        .get(url)
        .set("User-Agent", "pdf-editor")
        .call()
        .map_err(|err| CodecError::Fetch { url: url.to_owned(), reason: err.to_string() })?;

    let mut bytes = Vec::new();
    response.into_reader().read_to_end(&mut bytes)?;
    Ok(bytes)
}
