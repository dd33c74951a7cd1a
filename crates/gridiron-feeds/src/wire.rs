//! Provider response envelope: `{ "data": [...], "meta": { "next_cursor": ... } }`.

use gridiron_core::{ExternalRecord, PageCursor};
use serde::Deserialize;

use crate::Page;

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Vec<serde_json::Value>,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    next_cursor: Option<PageCursor>,
}

pub(crate) fn decode_page(body: &[u8]) -> Result<Page, serde_json::Error> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    Ok(Page {
        records: envelope.data.into_iter().map(ExternalRecord::new).collect(),
        next_cursor: envelope.meta.and_then(|m| m.next_cursor),
    })
}
