use thiserror::Error;

/// Main error type for the Rusty Rules crate.
/// Aggregates errors from the container codec, the table extractors, request validation and the
/// remote repository collaborator.
#[derive(Error, Debug)]
pub enum RustyRulesError {
    #[error("{0}")]
    WithContextError(String),

    #[error("{0}")]
    AnyhowError(#[from] anyhow::Error),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Codec errors
    #[error("{0}")]
    CodecError(#[from] crate::grid::CodecError),

    #[error("{0}")]
    FormatError(#[from] crate::table::FormatError),

    // Programmatic construction and editing errors
    #[error("{0}")]
    ValidationError(#[from] crate::request::ValidationError),

    // Collaborator errors
    #[error("{0}")]
    RemoteError(#[from] crate::remote::RemoteError),
}

impl RustyRulesError {
    /// Re-classifies low-level container failures (zip, XML, IO) as [`CodecError`]s so callers
    /// only have to distinguish "corrupt container" from "not a decision table".
    ///
    /// [`CodecError`]: crate::grid::CodecError
    pub(crate) fn into_codec(self) -> Self {
        match self {
            Self::IoError(error) => Self::CodecError(crate::grid::CodecError::Container(error.to_string())),
            Self::ZipError(error) => Self::CodecError(crate::grid::CodecError::Container(error.to_string())),
            Self::XmlError(error) => Self::CodecError(crate::grid::CodecError::Xml(error.to_string())),
            Self::XmlEncodingError(error) => Self::CodecError(crate::grid::CodecError::Xml(error.to_string())),
            Self::XmlAttributeError(error) => Self::CodecError(crate::grid::CodecError::Xml(error.to_string())),
            Self::XmlHelperError(error) => Self::CodecError(crate::grid::CodecError::Xml(error.to_string())),
            Self::ParseIntError(error) => Self::CodecError(crate::grid::CodecError::Xml(error.to_string())),
            other => other,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, RustyRulesError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| RustyRulesError::WithContextError(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_failures_become_codec_errors() {
        let error = RustyRulesError::from(zip::result::ZipError::FileNotFound);
        assert!(matches!(error.into_codec(), RustyRulesError::CodecError(_)));

        let error = RustyRulesError::from(crate::table::FormatError::TableDeclarationNotFound);
        assert!(matches!(error.into_codec(), RustyRulesError::FormatError(_)));
    }

    #[test]
    fn prefix_is_prepended() {
        let result: Result<(), RustyRulesError> = Err(RustyRulesError::WithContextError("boom".to_owned()));
        let message = result.with_prefix("Parse failed").unwrap_err().to_string();
        assert_eq!(message, "Parse failed: boom");
    }
}
