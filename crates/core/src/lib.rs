//! Core engine for filling, annotating and finalizing PDF forms.

pub mod complete;
pub mod document;
pub mod fill;
pub mod locate;
pub mod map_input;
pub mod sign;
pub mod types;
pub mod visit;

#[cfg(test)]
pub(crate) mod testing;

pub use complete::{complete, CompletionReport, CompletionState, FillSource};
pub use document::{FormDocument, OverlayLabel, SignRequest, Widget, WidgetHandle, WidgetKind};
pub use fill::{FillOutcome, FillReport, SkippedEntry};
pub use sign::{Credential, SignError, Signer, SignerProvider};
pub use types::{
    Color, FillDefaults, FillRequest, FillType, FontSpec, ImageData, PosData, SignatureData,
    TextData,
};
pub use visit::{traverse, visitor_for, Visitor};

use std::collections::BTreeSet;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, FillError>;

#[derive(Debug, thiserror::Error)]
pub enum FillError {
    #[error("invalid fill request: {0}")]
    InvalidRequest(String),
    #[error("field not found: {0}")]
    FieldNotFound(String),
    #[error("value rejected by field: {0}")]
    SetRejected(String),
    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
    #[error("document error: {0}")]
    Document(String),
    #[error("signing failed: {0}")]
    Signing(#[from] SignError),
    #[error("output path must differ from input: {0}")]
    SameOutputPath(PathBuf),
    #[error("no output path given")]
    MissingOutput,
    #[error("fill data is not valid JSON: {0}")]
    DataParse(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FillError {
    /// Errors a bulk fill records and skips instead of aborting on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FillError::InvalidRequest(_)
                | FillError::FieldNotFound(_)
                | FillError::SetRejected(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AnnotateFields,
    JsonList,
    JsonMap,
    FontList,
    Complete,
    CompleteStdin,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::AnnotateFields,
        Command::JsonList,
        Command::JsonMap,
        Command::FontList,
        Command::Complete,
        Command::CompleteStdin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Command::AnnotateFields => "annotate-fields",
            Command::JsonList => "json-list",
            Command::JsonMap => "json-map",
            Command::FontList => "font-list",
            Command::Complete => "complete",
            Command::CompleteStdin => "complete-stdin",
        }
    }

    pub fn from_name(name: &str) -> Option<Command> {
        Command::ALL.into_iter().find(|cmd| cmd.name() == name)
    }
}

/// File paths a command works with.
#[derive(Debug, Clone, Default)]
pub struct FilesEnv {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub data: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub cert_password: Option<String>,
}

/// Per-run fill state.
#[derive(Debug, Clone, Default)]
pub struct FillEnv {
    /// Key of the entry currently being filled.
    pub input_key: Option<String>,
    pub input_data: Option<String>,
    /// Reason the last request was rejected as invalid.
    pub err_msg: Option<String>,
    /// Fields whose values were set during this run; flattened at the end.
    pub touched: BTreeSet<WidgetHandle>,
    /// Signature field added during this run, with its request.
    pub signature: Option<(WidgetHandle, SignatureData)>,
    /// Where the last completion ended.
    pub state: CompletionState,
}

/// Traversal context: the open document plus everything a command mutates.
pub struct PdfEnv<D> {
    pub doc: D,
    pub cmd: Command,
    /// Current page cursor.
    pub page_num: usize,
    pub page_count: usize,
    /// Restricts traversal and name lookups to one page.
    pub requested_page: Option<usize>,
    pub files: FilesEnv,
    pub fill: FillEnv,
    pub defaults: FillDefaults,
}

impl<D: FormDocument> PdfEnv<D> {
    pub fn new(doc: D, cmd: Command, files: FilesEnv) -> Self {
        let page_count = doc.page_count();
        Self {
            doc,
            cmd,
            page_num: 0,
            page_count,
            requested_page: None,
            files,
            fill: FillEnv::default(),
            defaults: FillDefaults::default(),
        }
    }

    pub fn with_page(mut self, page: Option<usize>) -> Self {
        self.requested_page = page;
        self
    }

    pub fn with_defaults(mut self, defaults: FillDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn check_page(&self, page: usize) -> Result<()> {
        let count = self.doc.page_count();
        if page >= count {
            return Err(FillError::PageOutOfRange { page, count });
        }
        Ok(())
    }

    pub fn into_document(self) -> D {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names_round_trip() {
        for cmd in Command::ALL {
            assert_eq!(Command::from_name(cmd.name()), Some(cmd));
        }
        assert_eq!(Command::from_name("fill"), None);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(FillError::FieldNotFound("x".into()).is_recoverable());
        assert!(FillError::InvalidRequest("x".into()).is_recoverable());
        assert!(!FillError::Document("x".into()).is_recoverable());
        assert!(!FillError::PageOutOfRange { page: 9, count: 1 }.is_recoverable());
        assert!(!FillError::Signing(SignError::Unavailable).is_recoverable());
    }
}
