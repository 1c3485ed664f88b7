/// Digest modulus of the compact regime (~1e10). Cheap to mine against.
pub const COMPACT_DIGEST_MODULUS: u64 = 10_000_000_000;

/// Digest modulus of the prime regime (largest prime below 1e15).
pub const PRIME_DIGEST_MODULUS: u64 = 999_999_999_999_989;

/// Toy, order-sensitive fingerprint of `data`.
///
/// The accumulator starts at `modulus` and, for every byte triple ending at
/// position `i >= 2`, absorbs `(b[i] * b[i-1] * b[i-2] * i)^2`, reducing modulo
/// `modulus` whenever it grows past it. Inputs shorter than three bytes have
/// no triples and return `modulus` unchanged.
///
/// Arithmetic is 64-bit wrapping, so the function is total for any input.
/// NOT cryptographically secure.
pub fn digest(data: &[u8], modulus: u64) -> u64 {
    let mut acc = modulus;
    for i in 2..data.len() {
        let t = u64::from(data[i])
            .wrapping_mul(u64::from(data[i - 1]))
            .wrapping_mul(u64::from(data[i - 2]))
            .wrapping_mul(i as u64);
        acc = acc.wrapping_add(t.wrapping_mul(t));
        if acc > modulus {
            acc %= modulus;
        }
    }
    acc
}
