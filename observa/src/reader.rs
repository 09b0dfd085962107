//! Bucket reader: fetches consolidated records by time.
//!
//! A record ([`Averages`]) holds one `f64` per observable. On the wire it is
//! [`RECORD_SIZE`] bytes of little-endian values in observable order. A read
//! either yields the complete record or nothing; a partially filled record
//! is never observable.

use std::ops::Index;

use crate::bucket::bucket_key;
use crate::error::Result;
use crate::observable::{OBSERVABLE_COUNT, ObservableId};
use crate::store::BucketStore;

/// Size in bytes of one encoded [`Averages`] record.
pub const RECORD_SIZE: usize = OBSERVABLE_COUNT * size_of::<f64>();

/// One consolidated sample: a value per observable for one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Averages {
    values: [f64; OBSERVABLE_COUNT],
}

impl Default for Averages {
    fn default() -> Self {
        Self {
            values: [0.0; OBSERVABLE_COUNT],
        }
    }
}

impl Averages {
    /// Wraps a full set of values.
    pub fn from_values(values: [f64; OBSERVABLE_COUNT]) -> Self {
        Self { values }
    }

    /// Decodes a record from its wire form.
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut values = [0.0; OBSERVABLE_COUNT];
        for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(size_of::<f64>())) {
            let mut raw = [0u8; size_of::<f64>()];
            raw.copy_from_slice(chunk);
            *value = f64::from_le_bytes(raw);
        }
        Self { values }
    }

    /// Encodes the record into its wire form.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        for (chunk, value) in bytes.chunks_exact_mut(size_of::<f64>()).zip(&self.values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// The value for one observable.
    pub fn get(&self, id: ObservableId) -> f64 {
        self.values[id.index()]
    }

    /// All values in observable order.
    pub fn values(&self) -> &[f64; OBSERVABLE_COUNT] {
        &self.values
    }
}

impl Index<ObservableId> for Averages {
    type Output = f64;

    fn index(&self, id: ObservableId) -> &f64 {
        &self.values[id.index()]
    }
}

/// Fetches the record for the shift containing `t`.
///
/// Returns `Ok(None)` if the store has no record under the bucket key.
///
/// # Errors
///
/// Returns [`crate::error::BucketError::TimestampOutOfRange`] if `t` cannot
/// be mapped to a bucket key.
///
/// # Examples
///
/// ```rust
/// use observa::reader::{fetch_bucket, Averages};
/// use observa::store::MemoryStore;
///
/// let mut store = MemoryStore::new();
/// store.insert("15_Mar_Lcycle_2_Morning", Averages::default().to_bytes());
///
/// assert!(fetch_bucket(&store, 1_710_489_600)?.is_some());
/// assert!(fetch_bucket(&store, 0)?.is_none());
/// # Ok::<(), observa::ObservaError>(())
/// ```
pub fn fetch_bucket<S: BucketStore + ?Sized>(store: &S, t: i64) -> Result<Option<Averages>> {
    let key = bucket_key(t)?;
    let mut buf = [0u8; RECORD_SIZE];

    if !store.read(key.as_str(), &mut buf) {
        tracing::trace!("no record for bucket '{key}'");
        return Ok(None);
    }

    Ok(Some(Averages::from_bytes(&buf)))
}

/// Fetches the record for the shift containing `t` into `out`.
///
/// Returns `Ok(true)` if a record was found. On a miss `out` is left
/// exactly as it was.
///
/// # Errors
///
/// Returns [`crate::error::BucketError::TimestampOutOfRange`] if `t` cannot
/// be mapped to a bucket key.
pub fn fetch_bucket_into<S: BucketStore + ?Sized>(
    store: &S,
    t: i64,
    out: &mut Averages,
) -> Result<bool> {
    match fetch_bucket(store, t)? {
        Some(averages) => {
            *out = averages;
            Ok(true)
        }
        None => Ok(false),
    }
}
