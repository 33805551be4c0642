//! Placeholder delimiters
//!
//! A [`DelimiterSpec`] names the open and close markers the generator's
//! templates use around substitution placeholders (`<%=` / `%>` for EJS).

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Default EJS open marker
pub const EJS_OPEN: &str = "<%=";

/// Default EJS close marker
pub const EJS_CLOSE: &str = "%>";

/// Ordered pair of placeholder markers
///
/// # Invariants
/// - Neither marker is empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDelimiters", into = "RawDelimiters")]
pub struct DelimiterSpec {
    open: String,
    close: String,
}

impl DelimiterSpec {
    /// Create a delimiter pair
    ///
    /// # Errors
    /// Returns error if either marker is empty
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Result<Self, DelimiterError> {
        let open = open.into();
        let close = close.into();
        if open.is_empty() {
            return Err(DelimiterError::EmptyOpen);
        }
        if close.is_empty() {
            return Err(DelimiterError::EmptyClose);
        }
        Ok(Self { open, close })
    }

    /// EJS output tags (`<%=` ... `%>`)
    #[inline]
    #[must_use]
    pub fn ejs() -> Self {
        Self {
            open: EJS_OPEN.to_string(),
            close: EJS_CLOSE.to_string(),
        }
    }

    /// Open marker
    #[inline]
    #[must_use]
    pub fn open(&self) -> &str {
        &self.open
    }

    /// Close marker
    #[inline]
    #[must_use]
    pub fn close(&self) -> &str {
        &self.close
    }

    /// Wrap an identifier in this delimiter pair
    #[must_use]
    pub fn wrap(&self, identifier: &str) -> String {
        format!("{} {} {}", self.open, identifier, self.close)
    }
}

impl Default for DelimiterSpec {
    fn default() -> Self {
        Self::ejs()
    }
}

impl Display for DelimiterSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ... {}", self.open, self.close)
    }
}

#[derive(Serialize, Deserialize)]
struct RawDelimiters {
    open: String,
    close: String,
}

impl TryFrom<RawDelimiters> for DelimiterSpec {
    type Error = DelimiterError;

    fn try_from(raw: RawDelimiters) -> Result<Self, Self::Error> {
        Self::new(raw.open, raw.close)
    }
}

impl From<DelimiterSpec> for RawDelimiters {
    fn from(spec: DelimiterSpec) -> Self {
        Self {
            open: spec.open,
            close: spec.close,
        }
    }
}

/// Errors constructing a delimiter pair
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DelimiterError {
    /// Open marker is empty
    #[error("placeholder open marker must not be empty")]
    EmptyOpen,

    /// Close marker is empty
    #[error("placeholder close marker must not be empty")]
    EmptyClose,
}
