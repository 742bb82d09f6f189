//! Decoding and structural parsing of the portal's XML export artifact.
//!
//! The portal always emits Big5 regardless of what the document claims about
//! itself; the self-declaration drifts between `BIG5` and `big5` and is
//! stripped before parsing rather than trusted. Undecodable bytes become
//! replacement characters instead of failing the segment.

use super::errors::PortalError;
use crate::records::RawShipRecord;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

static ENCODING_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\s*encoding="big5""#).expect("encoding pattern is valid"));

/// Reads and parses an export artifact from disk.
pub fn parse_export(path: &Path) -> Result<Vec<RawShipRecord>, PortalError> {
    let bytes = std::fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "decoding export artifact");
    parse_export_bytes(&bytes)
}

/// Decodes export bytes as Big5 and walks every `SHIP` node into a raw
/// record, in document order.
///
/// A structurally invalid document fails with
/// [`PortalError::MalformedExport`]; a node with missing tags yields absent
/// fields, never an error.
pub fn parse_export_bytes(bytes: &[u8]) -> Result<Vec<RawShipRecord>, PortalError> {
    let (text, _, had_errors) = encoding_rs::BIG5.decode(bytes);
    if had_errors {
        warn!("export contained undecodable bytes, substituted replacement characters");
    }
    let text = ENCODING_DECL.replace(&text, "");

    let doc = roxmltree::Document::parse(text.as_ref())
        .map_err(|e| PortalError::MalformedExport(e.to_string()))?;

    let records = doc
        .descendants()
        .filter(|node| node.has_tag_name("SHIP"))
        .map(|ship| RawShipRecord {
            vessel_cname: tag_text(&ship, "VESSEL_CNAME"),
            vessel_ename: tag_text(&ship, "VESSEL_ENAME"),
            gross_tonnage: tag_text(&ship, "GROSS_TOA"),
            loa: tag_text(&ship, "LOA"),
            wharf_code: tag_text(&ship, "WHARF_CODE"),
            pilot_expected_time: tag_text(&ship, "PILOT_EXP_TM"),
            status: tag_text(&ship, "SP_STS"),
            prev_port: tag_text(&ship, "PREV_PORT"),
            next_port: tag_text(&ship, "NEXT_PORT"),
            agent_name: tag_text(&ship, "PBG_NAME"),
        })
        .collect();

    Ok(records)
}

fn tag_text(ship: &roxmltree::Node<'_, '_>, tag: &str) -> Option<String> {
    ship.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}
