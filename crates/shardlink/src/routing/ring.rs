//! Weighted consistent-hash ring.

use std::collections::BTreeMap;

/// Deterministic mapping from a key to a shard id.
///
/// Built once from the full set of `(id, weight)` pairs; a shard with weight
/// `w` is placed on the ring with `w * replicas` virtual nodes, so its
/// expected share of keys is proportional to `w`. The mapping depends only
/// on the `(id, weight)` set — rebinding a shard's connection never moves a
/// key, and removing one shard only releases the arcs its own virtual nodes
/// covered.
#[derive(Debug, Clone)]
pub struct HashRing {
    ring: BTreeMap<u64, String>,
}

impl HashRing {
    /// Build a ring from `(id, weight)` pairs with `replicas` virtual nodes
    /// per unit of weight.
    pub fn new(shards: &[(String, u32)], replicas: usize) -> Self {
        let mut ring = BTreeMap::new();
        for (id, weight) in shards {
            let vnodes = (*weight as usize).max(1) * replicas;
            for replica in 0..vnodes {
                let point = hash(format!("{id}-{replica}").as_bytes());
                ring.insert(point, id.clone());
            }
        }
        Self { ring }
    }

    /// Shard id owning `key`, or `None` for an empty ring.
    pub fn owner_of(&self, key: &str) -> Option<&str> {
        if self.ring.is_empty() {
            return None;
        }
        let point = hash(key.as_bytes());
        // Clockwise successor, wrapping to the first entry past the top.
        self.ring
            .range(point..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, id)| id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

/// FNV-1a with a murmur3 finalizer, stable across processes and toolchains.
///
/// Raw FNV-1a avalanches poorly in the high bits on short, near-sequential
/// strings like vnode labels, which clusters ring points and skews the
/// per-shard key share; the fmix64 step spreads them uniformly.
fn hash(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut h = FNV_OFFSET;
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    fmix64(h)
}

/// murmur3 64-bit finalizer.
fn fmix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51afd7ed558ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ceb9fe1a85ec53);
    h ^= h >> 33;
    h
}
