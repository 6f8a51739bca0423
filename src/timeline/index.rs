use std::collections::HashMap;

use crate::{
    foundation::error::{SingalongError, SingalongResult},
    timeline::model::Segment,
};

/// Default bucket width: one bucket per whole second.
pub const DEFAULT_BUCKET_WIDTH_SECS: f64 = 1.0;

/// Upper bound on segment-to-bucket registrations in one index.
pub const MAX_INDEX_ENTRIES: u64 = 1 << 22;

/// Time-bucketed lookup from a query time to the segments that may be visible then.
///
/// Every segment `[start, end)` is registered in buckets `floor(start / w)` through
/// `floor(end / w)` inclusive, so a query returns a superset of the segments containing `t`.
/// Ids inside a bucket are ascending (segment-list order).
#[derive(Clone, Debug)]
pub struct TimelineIndex {
    bucket_width: f64,
    buckets: HashMap<u64, Vec<usize>>,
}

impl TimelineIndex {
    /// Build the index once for an already validated segment list.
    ///
    /// Fails when the segments would need more than [`MAX_INDEX_ENTRIES`] bucket registrations;
    /// use [`TimelineIndex::build_until`] when queries never reach past a known time.
    pub fn build(segments: &[Segment], bucket_width_secs: f64) -> SingalongResult<Self> {
        Self::build_until(segments, bucket_width_secs, f64::INFINITY)
    }

    /// Build an index that answers queries for `t < horizon_secs` only.
    ///
    /// Segments are registered up to the bucket holding the horizon, so a segment whose `end`
    /// runs far past the video costs no more than one that ends with it.
    #[tracing::instrument(skip(segments), fields(segments = segments.len()))]
    pub fn build_until(
        segments: &[Segment],
        bucket_width_secs: f64,
        horizon_secs: f64,
    ) -> SingalongResult<Self> {
        if !bucket_width_secs.is_finite() || bucket_width_secs <= 0.0 {
            return Err(SingalongError::validation(
                "index bucket width must be finite and > 0",
            ));
        }
        if horizon_secs.is_nan() || horizon_secs < 0.0 {
            return Err(SingalongError::validation("index horizon must be >= 0"));
        }
        let horizon_bucket = bucket_of(horizon_secs, bucket_width_secs);

        let mut entries = 0u64;
        let mut buckets = HashMap::<u64, Vec<usize>>::new();
        for (id, seg) in segments.iter().enumerate() {
            if seg.start > seg.end || seg.start < 0.0 {
                return Err(SingalongError::validation(format!(
                    "segment {id} has an invalid span and cannot be indexed"
                )));
            }
            let first = bucket_of(seg.start, bucket_width_secs);
            let last = bucket_of(seg.end, bucket_width_secs).min(horizon_bucket);
            if first > last {
                continue;
            }
            entries = entries.saturating_add(last - first + 1);
            if entries > MAX_INDEX_ENTRIES {
                return Err(SingalongError::validation(format!(
                    "segment {id} ends at {}s; indexing it with {}s buckets exceeds {} entries",
                    seg.end, bucket_width_secs, MAX_INDEX_ENTRIES
                )));
            }
            for b in first..=last {
                buckets.entry(b).or_default().push(id);
            }
        }

        tracing::debug!(buckets = buckets.len(), "timeline index built");
        Ok(Self {
            bucket_width: bucket_width_secs,
            buckets,
        })
    }

    /// Candidate segment ids for time `t`. Empty for silence, negative or non-finite `t`.
    pub fn query(&self, t: f64) -> &[usize] {
        if !t.is_finite() || t < 0.0 {
            return &[];
        }
        self.buckets
            .get(&bucket_of(t, self.bucket_width))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Width of one bucket in seconds.
    pub fn bucket_width(&self) -> f64 {
        self.bucket_width
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

fn bucket_of(t: f64, width: f64) -> u64 {
    (t / width).floor().max(0.0) as u64
}
