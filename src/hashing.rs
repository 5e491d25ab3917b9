//! Content digests for raster maps.
//!
//! A map is identified by what it was built from (source bytes and build
//! parameters), so reloading identical content can reuse the pyramid.

use sha2::{Digest, Sha256};

/// Digest of a map build: source bytes, level count, sigma and target size.
pub fn map_digest(source: &[u8], nb_levels: u32, sigma: f32, fit: Option<(u32, u32)>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source);
    hasher.update(nb_levels.to_le_bytes());
    hasher.update(sigma.to_bits().to_le_bytes());
    match fit {
        Some((w, h)) => {
            hasher.update([1u8]);
            hasher.update(w.to_le_bytes());
            hasher.update(h.to_le_bytes());
        }
        None => hasher.update([0u8]),
    }
    hex::encode(hasher.finalize())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}
