//! JSON template persistence.
//!
//! A template is the whole [`SpreadsheetDocument`] as JSON, base64-encoded
//! for transport to the [`PersistenceService`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{Result, XleditError};
use crate::grid::GridDefaults;
use crate::services::{
    Credentials, IdentityService, PersistenceService, TemplateMetadata, TemplatePayload,
};
use crate::types::SpreadsheetDocument;

pub fn document_to_json(doc: &SpreadsheetDocument) -> Result<String> {
    Ok(serde_json::to_string(doc)?)
}

/// Parse and validate a document from JSON.
pub fn document_from_json(json: &str, defaults: GridDefaults) -> Result<SpreadsheetDocument> {
    let mut doc: SpreadsheetDocument = serde_json::from_str(json)?;
    doc.normalize(defaults)?;
    Ok(doc)
}

pub fn encode_document(doc: &SpreadsheetDocument) -> Result<String> {
    Ok(STANDARD.encode(document_to_json(doc)?))
}

pub fn decode_document(encoded: &str, defaults: GridDefaults) -> Result<SpreadsheetDocument> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let json =
        String::from_utf8(bytes).map_err(|e| XleditError::Validation(format!("template: {e}")))?;
    document_from_json(&json, defaults)
}

fn check_metadata(metadata: &TemplateMetadata) -> Result<()> {
    let required = [
        ("tipo", &metadata.tipo),
        ("tag", &metadata.tag),
        ("fileName", &metadata.file_name),
    ];
    match required.iter().find(|(_, v)| v.trim().is_empty()) {
        Some((field, _)) => Err(XleditError::Validation(format!("{field} is required"))),
        None => Ok(()),
    }
}

fn payload(doc: &SpreadsheetDocument, metadata: &TemplateMetadata) -> Result<TemplatePayload> {
    check_metadata(metadata)?;
    Ok(TemplatePayload {
        metadata: metadata.clone(),
        json_data_base64: encode_document(doc)?,
    })
}

/// Store the document as a new template. Returns the backend id.
pub fn save_template(
    store: &mut dyn PersistenceService,
    doc: &SpreadsheetDocument,
    metadata: &TemplateMetadata,
) -> Result<String> {
    let payload = payload(doc, metadata)?;
    let id = store.save(&payload)?;
    tracing::info!(id = %id, file = %metadata.file_name, "template saved");
    Ok(id)
}

/// Overwrite an existing template. Destructive, so the operator's
/// credentials are checked first.
pub fn update_template(
    store: &mut dyn PersistenceService,
    identity: &dyn IdentityService,
    credentials: &Credentials,
    existing_id: &str,
    doc: &SpreadsheetDocument,
    metadata: &TemplateMetadata,
) -> Result<()> {
    if existing_id.trim().is_empty() {
        return Err(XleditError::Validation("template id is required".into()));
    }
    let payload = payload(doc, metadata)?;
    if !identity.validate_credentials(&credentials.user, &credentials.password)? {
        tracing::warn!(user = %credentials.user, id = existing_id, "template update denied");
        return Err(XleditError::Persistence("invalid credentials".into()));
    }
    store.update(existing_id, &payload)?;
    tracing::info!(id = existing_id, "template updated");
    Ok(())
}

/// Fetch and decode a template.
pub fn load_template(
    store: &dyn PersistenceService,
    id: &str,
    defaults: GridDefaults,
) -> Result<SpreadsheetDocument> {
    let encoded = store.load(id)?;
    let doc = decode_document(&encoded, defaults)?;
    tracing::info!(id, rows = doc.rows, cols = doc.cols, "template loaded");
    Ok(doc)
}
