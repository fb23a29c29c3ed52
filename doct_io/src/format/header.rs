//! Container header shared by the octree and tensor formats.

/// Magic bytes for octree containers.
pub const OCTREE_MAGIC: [u8; 4] = *b"DOCT";

/// Magic bytes for tensor containers.
pub const TENSOR_MAGIC: [u8; 4] = *b"DTNS";

/// Current container version.
pub const FORMAT_VERSION: u16 = 1;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 32;

/// Flag bit: the octree container carries leaf features.
pub const FLAG_HAS_FEATURES: u16 = 1;

/// Container header.
///
/// Layout (32 bytes total):
/// - Bytes 0-3: Magic ("DOCT" or "DTNS")
/// - Bytes 4-5: version (u16 LE)
/// - Bytes 6-7: flags (u16 LE)
/// - Bytes 8-23: four payload descriptors (u32 LE each)
/// - Bytes 24-31: reserved (8 bytes)
///
/// The meaning of the descriptors depends on the magic. Octrees store
/// `[depth, full_depth, feature_channels, leaf_count]`, tensors store
/// `[rank, element_count, 0, 0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Magic bytes.
    pub magic: [u8; 4],
    /// Format version.
    pub version: u16,
    /// Flags.
    pub flags: u16,
    /// Payload descriptors.
    pub fields: [u32; 4],
    /// Reserved bytes for future expansion.
    pub reserved: [u8; 8],
}

impl ContainerHeader {
    /// Create a header for the current version.
    pub fn new(magic: [u8; 4], flags: u16, fields: [u32; 4]) -> Self {
        Self {
            magic,
            version: FORMAT_VERSION,
            flags,
            fields,
            reserved: [0; 8],
        }
    }

    /// True if the magic matches and the version is supported.
    pub fn is_valid(&self, magic: [u8; 4]) -> bool {
        self.magic == magic && self.version == FORMAT_VERSION
    }

    /// True if `flag` is set.
    #[inline]
    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    /// Serialize the header to a byte array.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];

        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.flags.to_le_bytes());
        for (i, field) in self.fields.iter().enumerate() {
            let start = 8 + 4 * i;
            bytes[start..start + 4].copy_from_slice(&field.to_le_bytes());
        }
        bytes[24..32].copy_from_slice(&self.reserved);

        bytes
    }

    /// Deserialize a header from a byte array.
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        let flags = u16::from_le_bytes([bytes[6], bytes[7]]);

        let mut fields = [0u32; 4];
        for (i, field) in fields.iter_mut().enumerate() {
            let s = 8 + 4 * i;
            *field = u32::from_le_bytes([bytes[s], bytes[s + 1], bytes[s + 2], bytes[s + 3]]);
        }

        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&bytes[24..32]);

        Self {
            magic,
            version,
            flags,
            fields,
            reserved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = ContainerHeader::new(OCTREE_MAGIC, FLAG_HAS_FEATURES, [6, 2, 3, 1200]);
        let restored = ContainerHeader::from_bytes(&header.to_bytes());
        assert_eq!(header, restored);
        assert!(restored.has_flag(FLAG_HAS_FEATURES));
    }

    #[test]
    fn test_header_magic() {
        let header = ContainerHeader::new(TENSOR_MAGIC, 0, [2, 12, 0, 0]);
        assert!(header.is_valid(TENSOR_MAGIC));
        assert!(!header.is_valid(OCTREE_MAGIC));

        let mut future = header;
        future.version = FORMAT_VERSION + 1;
        assert!(!future.is_valid(TENSOR_MAGIC));
    }

    #[test]
    fn test_field_byte_positions() {
        let header = ContainerHeader::new(TENSOR_MAGIC, 0, [1, 0x0102_0304, 0, 0]);
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"DTNS");
        assert_eq!(&bytes[8..12], &[1, 0, 0, 0]);
        assert_eq!(&bytes[12..16], &[4, 3, 2, 1]);
    }
}
