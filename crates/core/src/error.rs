use doc_model::ModelError;
use pdf_engine::CodecError;
use uuid::Uuid;

/// Failures of editor operations. A failed operation leaves the document
/// exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("failed to load {name}: {source}")]
    Load {
        name: String,
        #[source]
        source: CodecError,
    },

    #[error("no document is loaded")]
    NotLoaded,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("cannot delete the only remaining page")]
    LastPage,

    #[error("invalid page order: {0}")]
    InvalidOrder(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("could not embed {what}: {source}")]
    Embed {
        what: &'static str,
        #[source]
        source: CodecError,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not supported: {0}")]
    Unsupported(&'static str),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl EditError {
    pub(crate) fn page_not_found(id: Uuid) -> Self {
        Self::NotFound { kind: "page", id }
    }

    pub(crate) fn element_not_found(id: Uuid) -> Self {
        Self::NotFound { kind: "element", id }
    }

    /// Maps codec failures of an embedding step to [`EditError::Embed`].
    pub(crate) fn embed(what: &'static str) -> impl FnOnce(CodecError) -> Self {
        move |source| match source {
            CodecError::ImageEmbed(_) | CodecError::Raster(_) => Self::Embed { what, source },
            other => Self::Codec(other),
        }
    }
}

impl From<ModelError> for EditError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnknownPage(id) => Self::page_not_found(id),
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

pub type EditResult<T> = Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_pages_become_not_found() {
        let id = Uuid::new_v4();
        let err = EditError::from(ModelError::UnknownPage(id));
        assert!(matches!(err, EditError::NotFound { kind: "page", id: found } if found == id));
    }

    #[test]
    fn image_failures_map_to_embed() {
        let err = EditError::embed("image")(CodecError::ImageEmbed("bad bytes".to_owned()));
        assert!(matches!(err, EditError::Embed { what: "image", .. }));
        assert_eq!(err.to_string(), "could not embed image: image could not be embedded: bad bytes");

        let err = EditError::embed("image")(CodecError::NoPages);
        assert!(matches!(err, EditError::Codec(CodecError::NoPages)));
    }
}
