use crate::timeline::{
    index::TimelineIndex,
    model::{Segment, Timeline},
};

/// A word visible at some instant, and whether it is being sung right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedWord {
    pub text: String,
    pub highlighted: bool,
}

impl ResolvedWord {
    pub fn new(text: impl Into<String>, highlighted: bool) -> Self {
        Self {
            text: text.into(),
            highlighted,
        }
    }
}

/// Answers "which words are on screen at `t`" using a prebuilt [`TimelineIndex`].
///
/// Read-only; one resolver can be shared by every render worker.
#[derive(Clone, Copy, Debug)]
pub struct WordResolver<'a> {
    segments: &'a [Segment],
    index: &'a TimelineIndex,
}

impl<'a> WordResolver<'a> {
    pub fn new(timeline: &'a Timeline, index: &'a TimelineIndex) -> Self {
        Self {
            segments: &timeline.segments,
            index,
        }
    }

    /// Words visible at `t`, in segment order then word order.
    ///
    /// Segments and words use half-open `[start, end)` spans. Overlapping segments contribute
    /// all of their words; nothing is de-duplicated or re-sorted.
    pub fn resolve(&self, t: f64) -> Vec<ResolvedWord> {
        let mut out = Vec::new();
        for &id in self.index.query(t) {
            let Some(seg) = self.segments.get(id) else {
                continue;
            };
            push_segment_words(&mut out, seg, t);
        }
        out
    }
}

/// Linear scan over every segment; the reference the indexed path must agree with.
pub fn resolve_linear(segments: &[Segment], t: f64) -> Vec<ResolvedWord> {
    let mut out = Vec::new();
    for seg in segments {
        push_segment_words(&mut out, seg, t);
    }
    out
}

fn push_segment_words(out: &mut Vec<ResolvedWord>, seg: &Segment, t: f64) {
    if !(seg.start <= t && t < seg.end) {
        return;
    }
    out.extend(seg.words.iter().map(|w| ResolvedWord {
        text: w.text.clone(),
        highlighted: w.start <= t && t < w.end,
    }));
}
