//! Four-byte vendor codes, carried straight from gtk-gnutella's
//! `vendors.h` table since both the `Messages-Supported` handshake and the
//! query hit trailer's vendor code field need to name the same set of
//! implementations.

/// A little-endian-ordered 4-ASCII-character vendor code.
pub type VendorCode = [u8; 4];

pub const T_ACQX: VendorCode = *b"ACQX";
pub const T_ARES: VendorCode = *b"ARES";
pub const T_BEAR: VendorCode = *b"BEAR";
pub const T_COCO: VendorCode = *b"COCO";
pub const T_FIRE: VendorCode = *b"FIRE";
pub const T_GNEW: VendorCode = *b"GNEW";
pub const T_GNOT: VendorCode = *b"GNOT";
pub const T_GNUC: VendorCode = *b"GNUC";
pub const T_GNUM: VendorCode = *b"GNUM";
pub const T_GTKG: VendorCode = *b"GTKG";
pub const T_HSPT: VendorCode = *b"HSPT";
pub const T_LIME: VendorCode = *b"LIME";
pub const T_MMMM: VendorCode = *b"MMMM";
pub const T_MRPH: VendorCode = *b"MRPH";
pub const T_MUTE: VendorCode = *b"MUTE";
pub const T_NAPS: VendorCode = *b"NAPS";
pub const T_OCFG: VendorCode = *b"OCFG";
pub const T_PHEX: VendorCode = *b"PHEX";
pub const T_QTEL: VendorCode = *b"QTEL";
pub const T_RAZA: VendorCode = *b"RAZA";
pub const T_SHLN: VendorCode = *b"SHLN";
pub const T_SNUT: VendorCode = *b"SNUT";
pub const T_SWAP: VendorCode = *b"SWAP";
pub const T_TOAD: VendorCode = *b"TOAD";
pub const T_XOLO: VendorCode = *b"XOLO";
pub const T_ZIGA: VendorCode = *b"ZIGA";

/// The all-zero code used by vendor-neutral messages (e.g.
/// Messages-Supported itself).
pub const T_0000: VendorCode = [0, 0, 0, 0];

/// Look up a human-readable vendor name for logging, falling back to the
/// raw ASCII code when it isn't one of the known constants.
pub fn name_of(code: VendorCode) -> &'static str {
    match code {
        T_ACQX => "Acquisition",
        T_ARES => "Ares",
        T_BEAR => "BearShare",
        T_COCO => "CocoGnut",
        T_FIRE => "FireFly",
        T_GNEW => "Gnewtellium",
        T_GNOT => "Gnotella",
        T_GNUC => "Gnucleus",
        T_GNUM => "Gnuplex",
        T_GTKG => "gtk-gnutella",
        T_HSPT => "Hspot",
        T_LIME => "LimeWire",
        T_MMMM => "Morpheus (v2)",
        T_MRPH => "Morpheus (v1)",
        T_MUTE => "Mutella",
        T_NAPS => "NapShare",
        T_OCFG => "OpenCola Freenet gateway",
        T_PHEX => "Phex",
        T_QTEL => "Qtella",
        T_RAZA => "Shareaza",
        T_SHLN => "Shell",
        T_SNUT => "SwapNut",
        T_SWAP => "Swapper",
        T_TOAD => "ToadNode",
        T_XOLO => "Xolox",
        T_ZIGA => "Ziga",
        T_0000 => "(vendor-neutral)",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve() {
        assert_eq!(name_of(T_GTKG), "gtk-gnutella");
        assert_eq!(name_of(T_LIME), "LimeWire");
        assert_eq!(name_of(T_BEAR), "BearShare");
    }

    #[test]
    fn unknown_code_falls_back() {
        assert_eq!(name_of(*b"ZZZZ"), "unknown");
    }
}
