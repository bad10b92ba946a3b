//! Resource URI grammar
//!
//! ```text
//! uri        = "tap://" ident [ "/" ident ]
//! ident      = 1*( ALPHA / DIGIT )
//! ```
//!
//! The whole input must match; anything else is not a resource URI.

use std::fmt;

use crate::branding::RESOURCE_SCHEME;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUri {
    Connection { connection_id: String },
    Table { connection_id: String, table_id: String },
}

impl ResourceUri {
    /// Parse a resource URI, returning `None` when it does not match the grammar
    pub fn parse(input: &str) -> Option<Self> {
        let rest = input
            .strip_prefix(RESOURCE_SCHEME)
            .and_then(|r| r.strip_prefix("://"))?;

        let (connection_id, table_id) = match rest.split_once('/') {
            Some((conn, table)) => (conn, Some(table)),
            None => (rest, None),
        };

        if !is_ident(connection_id) {
            return None;
        }

        match table_id {
            None => Some(Self::Connection {
                connection_id: connection_id.to_string(),
            }),
            Some(table_id) if is_ident(table_id) => Some(Self::Table {
                connection_id: connection_id.to_string(),
                table_id: table_id.to_string(),
            }),
            Some(_) => None,
        }
    }

    pub fn connection_id(&self) -> &str {
        match self {
            Self::Connection { connection_id } | Self::Table { connection_id, .. } => connection_id,
        }
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection { connection_id } => {
                write!(f, "{}://{}", RESOURCE_SCHEME, connection_id)
            }
            Self::Table {
                connection_id,
                table_id,
            } => write!(f, "{}://{}/{}", RESOURCE_SCHEME, connection_id, table_id),
        }
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}
