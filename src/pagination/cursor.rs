use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime, UtcOffset};
use uuid::Uuid;

const SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("cursor is not valid base64")]
    Encoding,
    #[error("cursor is not valid utf-8")]
    Utf8,
    #[error("cursor has no separator")]
    Separator,
    #[error("cursor timestamp is invalid")]
    Timestamp,
    #[error("cursor id is invalid")]
    Id,
    #[error("timestamp cannot be represented in a cursor")]
    Unencodable,
}

/// Last-seen row of a page: ordering timestamp plus id as tie-breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub at: OffsetDateTime,
    pub id: Uuid,
}

impl Position {
    pub fn new(at: OffsetDateTime, id: Uuid) -> Self {
        Self { at, id }
    }

    /// URL-safe base64 of `"<rfc3339 timestamp>|<uuid>"`.
    pub fn encode(&self) -> Result<String, CursorError> {
        let ts = self
            .at
            .to_offset(UtcOffset::UTC)
            .format(&Rfc3339)
            .map_err(|_| CursorError::Unencodable)?;
        let raw = format!("{ts}{SEPARATOR}{}", self.id);
        Ok(URL_SAFE.encode(raw.as_bytes()))
    }

    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let token = token.trim();
        let bytes = URL_SAFE
            .decode(token)
            .or_else(|_| URL_SAFE_NO_PAD.decode(token))
            .map_err(|_| CursorError::Encoding)?;
        let raw = String::from_utf8(bytes).map_err(|_| CursorError::Utf8)?;
        let (ts, id) = raw.split_once(SEPARATOR).ok_or(CursorError::Separator)?;
        let at = OffsetDateTime::parse(ts, &Rfc3339).map_err(|_| CursorError::Timestamp)?;
        let id = Uuid::parse_str(id).map_err(|_| CursorError::Id)?;
        Ok(Self { at, id })
    }
}
