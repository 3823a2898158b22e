use std::fmt;

/// Entropy source for session tokens and WebAuthn ceremony nonces.
///
/// Kept behind a trait (rather than calling `rand` directly everywhere)
/// so tests can inject deterministic byte streams.
pub trait RandomSource: Send + Sync + fmt::Debug {
    fn fill_bytes(&self, buf: &mut [u8]);

    fn token_bytes(&self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.fill_bytes(&mut buf);
        buf
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, buf: &mut [u8]) {
        use rand::RngCore;
        rand::rngs::OsRng.fill_bytes(buf);
    }
}
