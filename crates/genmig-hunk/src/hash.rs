//! Content fingerprints
//!
//! A [`ContentHash`] is captured when a local file is read for planning and
//! compared again right before that file is replaced on disk.

/// Blake3 digest of a file's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash `data`
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_bytes_equal_hash() {
        let data = b"module.exports = {};\n";
        assert_eq!(ContentHash::compute(data), ContentHash::compute(data));
        assert_ne!(ContentHash::compute(data), ContentHash::compute(b"module.exports = {};\r\n"));
    }
}
