//! Conversion between integer sequences and raw byte strings.

use bytes::Bytes;

/// Pack integers in `0..=255` into a byte string.
///
/// Returns `None` if any value does not fit in a byte.
pub fn pack(values: &[u32]) -> Option<Bytes> {
    values
        .iter()
        .map(|&value| u8::try_from(value).ok())
        .collect::<Option<Vec<u8>>>()
        .map(Bytes::from)
}

/// Unpack a byte string into one integer per byte.
pub fn unpack(data: &[u8]) -> Vec<u32> {
    data.iter().copied().map(u32::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_packs_to_empty_bytes() {
        assert_eq!(pack(&[]), Some(Bytes::new()));
        assert!(unpack(&[]).is_empty());
    }

    #[test]
    fn unpack_inverts_pack() {
        let values: Vec<u32> = (0..=255).rev().collect();
        let packed = pack(&values).unwrap();
        assert_eq!(packed.len(), 256);
        assert_eq!(packed[0], 0xff);
        assert_eq!(unpack(&packed), values);
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        assert_eq!(pack(&[1, 2, 256]), None);
        assert_eq!(pack(&[u32::MAX]), None);
    }
}
