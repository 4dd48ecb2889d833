//! Contracts for the collaborators the editor talks to.
//!
//! Transport is the host's business: implementations may call a remote
//! command interface, a local library, or a test stub. The formula
//! evaluator contract lives in [`crate::formula`].

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::xlsx::XlsxImport;

/// Who is editing, and whether they may perform destructive operations.
pub trait IdentityService {
    /// Display name used to tag history entries.
    fn current_user_name(&self) -> Result<String>;

    /// Check operator credentials.
    fn validate_credentials(&self, user: &str, password: &str) -> Result<bool>;
}

/// Operator credentials for gated operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

/// Describes where and how a template is filed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMetadata {
    /// Document category understood by the backend
    pub tipo: String,
    pub tag: String,
    pub file_name: String,
    pub path: String,
}

/// The message handed to the persistence command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePayload {
    #[serde(flatten)]
    pub metadata: TemplateMetadata,
    /// Base64 of the JSON-serialized document
    pub json_data_base64: String,
}

/// Backend storage for named, tagged templates.
pub trait PersistenceService {
    /// Store a new template and return its id.
    fn save(&mut self, payload: &TemplatePayload) -> Result<String>;

    /// Overwrite an existing template.
    fn update(&mut self, existing_id: &str, payload: &TemplatePayload) -> Result<()>;

    /// Fetch the base64 JSON of a template.
    fn load(&self, id: &str) -> Result<String>;
}

/// Byte-level XLSX parser.
pub trait XlsxParser {
    /// Parse `bytes`, importing `sheet_name` or the first sheet.
    ///
    /// Failures are reported through [`XlsxImport::error`] rather than `Err`.
    fn parse(&self, bytes: &[u8], file_name: &str, sheet_name: Option<&str>) -> XlsxImport;
}
