/// Hashes a key with the MurmurHash3 32-bit finalizer (`fmix32`).
///
/// Every bit of the input affects every bit of the output, which keeps the
/// linear probe sequences of consecutive keys apart.
#[inline]
pub fn murmur3(key: i32) -> u32 {
    let mut h = key as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}
