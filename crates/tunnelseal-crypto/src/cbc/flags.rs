//! Per-call framing flags

/// Per-packet framing passed to every envelope call.
///
/// Not stored by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CryptoFlags<'a> {
    /// Packet identifier used as IV seed by counter-based modes.
    ///
    /// CBC carries its IV inside the envelope and does not read this.
    pub iv: &'a [u8],
    /// Additional authenticated data, covered by the tag but not emitted
    pub ad: &'a [u8],
}

impl<'a> CryptoFlags<'a> {
    /// Flags with both packet id and additional data.
    pub fn new(iv: &'a [u8], ad: &'a [u8]) -> Self {
        Self { iv, ad }
    }

    /// Flags carrying only additional authenticated data.
    pub fn with_ad(ad: &'a [u8]) -> Self {
        Self { iv: &[], ad }
    }
}
