//! Hash Router Module
//!
//! Maps keys to shard indexes. Every strategy is a pure function of the key;
//! the result is reduced with the cache's shard mask so it always falls in
//! `[0, shard_count)`.

// == Hash Router ==
/// Strategy routing a key to a shard.
///
/// `shard_mask` is `shard_count - 1` for a power-of-two shard count. The
/// built-in strategies apply it themselves, but implementations need not: the
/// cache masks every result again before indexing its shards.
pub trait HashRouter<K: ?Sized>: Send + Sync {
    fn shard_index(&self, key: &K, shard_mask: usize) -> usize;
}

/// Masks fixed-width integer keys: `key & mask`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntMask;

/// Masks 64-bit integer keys before narrowing to an index.
#[derive(Debug, Clone, Copy, Default)]
pub struct WideIntMask;

/// Sums the key's bytes and masks the sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringHash;

/// Wraps a caller-supplied routing function. Its output is masked like the
/// built-in strategies.
#[derive(Clone, Copy)]
pub struct CustomHash<F>(F);

impl<F> CustomHash<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> std::fmt::Debug for CustomHash<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CustomHash")
    }
}

macro_rules! impl_int_mask {
    ($($t:ty),*) => {
        $(
            impl HashRouter<$t> for IntMask {
                #[inline]
                fn shard_index(&self, key: &$t, shard_mask: usize) -> usize {
                    // Sign extension keeps the low bits of negative keys intact.
                    (*key as usize) & shard_mask
                }
            }
        )*
    };
}

impl_int_mask!(i8, i16, i32, isize, u8, u16, u32, usize);

impl HashRouter<i64> for WideIntMask {
    #[inline]
    fn shard_index(&self, key: &i64, shard_mask: usize) -> usize {
        (*key & shard_mask as i64) as usize
    }
}

impl HashRouter<u64> for WideIntMask {
    #[inline]
    fn shard_index(&self, key: &u64, shard_mask: usize) -> usize {
        (*key & shard_mask as u64) as usize
    }
}

// == Byte Sum ==
/// Additive hash: wrapping sum of the byte values.
pub fn byte_sum(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .fold(0usize, |sum, b| sum.wrapping_add(*b as usize))
}

impl HashRouter<str> for StringHash {
    #[inline]
    fn shard_index(&self, key: &str, shard_mask: usize) -> usize {
        byte_sum(key.as_bytes()) & shard_mask
    }
}

impl HashRouter<String> for StringHash {
    #[inline]
    fn shard_index(&self, key: &String, shard_mask: usize) -> usize {
        byte_sum(key.as_bytes()) & shard_mask
    }
}

impl<'a> HashRouter<&'a str> for StringHash {
    #[inline]
    fn shard_index(&self, key: &&'a str, shard_mask: usize) -> usize {
        byte_sum(key.as_bytes()) & shard_mask
    }
}

impl<K, F> HashRouter<K> for CustomHash<F>
where
    K: ?Sized,
    F: Fn(&K) -> usize + Send + Sync,
{
    #[inline]
    fn shard_index(&self, key: &K, shard_mask: usize) -> usize {
        (self.0)(key) & shard_mask
    }
}
