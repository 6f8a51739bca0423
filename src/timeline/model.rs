use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;

use crate::foundation::error::{SingalongError, SingalongResult};

/// Language codes rendered right-to-left.
const RTL_LANGUAGES: &[&str] = &["ar", "he", "fa", "ur", "yi", "ps", "sd", "ug", "dv", "ckb"];

/// One word and the span during which it is actively sung.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Word {
    #[serde(rename = "word")]
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// A timed group of words, visible during `[start, end)`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub words: Vec<Word>,
}

/// Validated lyric timeline. Immutable after [`Timeline::validate`] succeeds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    pub duration: f64,
    #[serde(default = "default_language")]
    pub language: String,
    pub segments: Vec<Segment>,
}

fn default_language() -> String {
    "en".to_string()
}

/// Horizontal reading direction for the lyric line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl TextDirection {
    /// Direction for an ISO language code; only the primary subtag is considered.
    pub fn for_language(code: &str) -> Self {
        let primary = code
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if RTL_LANGUAGES.contains(&primary.as_str()) {
            Self::Rtl
        } else {
            Self::Ltr
        }
    }
}

/// Permissive timing oddities that load fine but are worth reporting.
#[derive(Clone, Debug, PartialEq)]
pub enum TimelineWarning {
    /// Two words of one segment overlap in time; both highlight together.
    OverlappingWords {
        segment: usize,
        first: usize,
        second: usize,
    },
    /// A word's span reaches outside its segment's visibility window.
    WordOutsideSegment { segment: usize, word: usize },
}

impl std::fmt::Display for TimelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OverlappingWords {
                segment,
                first,
                second,
            } => write!(
                f,
                "segment {segment}: words {first} and {second} overlap and will highlight together"
            ),
            Self::WordOutsideSegment { segment, word } => write!(
                f,
                "segment {segment}: word {word} extends outside the segment span"
            ),
        }
    }
}

impl Timeline {
    /// Parse and validate a timeline from JSON text.
    pub fn from_json_str(s: &str) -> SingalongResult<Self> {
        let timeline: Timeline = serde_json::from_str(s).context("parse lyrics JSON")?;
        timeline.validate()?;
        Ok(timeline)
    }

    /// Parse and validate a timeline from a JSON reader.
    pub fn from_reader(r: impl std::io::Read) -> SingalongResult<Self> {
        let timeline: Timeline = serde_json::from_reader(r).context("parse lyrics JSON")?;
        timeline.validate()?;
        Ok(timeline)
    }

    /// Load, validate and lint a timeline file.
    #[tracing::instrument]
    pub fn load(path: &Path) -> SingalongResult<Self> {
        let f = File::open(path).with_context(|| format!("open lyrics '{}'", path.display()))?;
        let timeline = Self::from_reader(BufReader::new(f))?;
        for warning in timeline.lint() {
            tracing::warn!("{warning}");
        }
        tracing::info!(
            segments = timeline.segments.len(),
            duration = timeline.duration,
            language = %timeline.language,
            "loaded lyrics"
        );
        Ok(timeline)
    }

    /// Reject timing that cannot be indexed: `start > end`, negative or non-finite values.
    pub fn validate(&self) -> SingalongResult<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(SingalongError::validation(
                "timeline duration must be finite and >= 0",
            ));
        }

        for (si, seg) in self.segments.iter().enumerate() {
            check_span(seg.start, seg.end).map_err(|why| {
                SingalongError::validation(format!("segment {si}: {why}"))
            })?;
            for (wi, word) in seg.words.iter().enumerate() {
                check_span(word.start, word.end).map_err(|why| {
                    SingalongError::validation(format!(
                        "segment {si} word {wi} ('{}'): {why}",
                        word.text
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Report overlapping words and words outside their segment without rejecting them.
    pub fn lint(&self) -> Vec<TimelineWarning> {
        let mut out = Vec::new();
        for (si, seg) in self.segments.iter().enumerate() {
            for (wi, word) in seg.words.iter().enumerate() {
                if word.start < seg.start || word.end > seg.end {
                    out.push(TimelineWarning::WordOutsideSegment {
                        segment: si,
                        word: wi,
                    });
                }
            }

            // Zero-length words never highlight, so they can neither overlap nor hide one.
            let mut order: Vec<usize> = (0..seg.words.len())
                .filter(|&wi| seg.words[wi].start < seg.words[wi].end)
                .collect();
            order.sort_by(|&a, &b| seg.words[a].start.total_cmp(&seg.words[b].start));

            // Sweep in start order against the earlier word reaching furthest.
            let mut reach: Option<usize> = None;
            for &wi in &order {
                let word = &seg.words[wi];
                match reach {
                    Some(ri) if word.start < seg.words[ri].end => {
                        out.push(TimelineWarning::OverlappingWords {
                            segment: si,
                            first: ri.min(wi),
                            second: ri.max(wi),
                        });
                        if word.end > seg.words[ri].end {
                            reach = Some(wi);
                        }
                    }
                    _ => reach = Some(wi),
                }
            }
        }
        out
    }

    /// Text direction selected by `language`.
    pub fn direction(&self) -> TextDirection {
        TextDirection::for_language(&self.language)
    }
}

fn check_span(start: f64, end: f64) -> Result<(), &'static str> {
    if !start.is_finite() || !end.is_finite() {
        return Err("start/end must be finite");
    }
    if start < 0.0 {
        return Err("start must be >= 0");
    }
    if start > end {
        return Err("start must be <= end");
    }
    Ok(())
}
