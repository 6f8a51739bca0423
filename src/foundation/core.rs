use crate::foundation::error::{SingalongError, SingalongResult};

/// Absolute 0-based output frame index.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex,
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> SingalongResult<Self> {
        if start.0 > end.0 {
            return Err(SingalongError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Return `true` when `f` is inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> SingalongResult<Self> {
        if den == 0 {
            return Err(SingalongError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(SingalongError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Timestamp in seconds of the start of frame `idx`.
    pub fn frame_time_secs(self, idx: FrameIndex) -> f64 {
        (idx.0 as f64) * f64::from(self.den) / f64::from(self.num)
    }

    /// Number of frames needed to cover `secs`, i.e. `ceil(secs * fps)`.
    ///
    /// Products within 1e-9 of an integer are snapped so that `5.0 s @ 24 fps` yields 120
    /// rather than 121 after float noise.
    pub fn frame_count_for(self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        let exact = secs * f64::from(self.num) / f64::from(self.den);
        let nearest = exact.round();
        if (exact - nearest).abs() < 1e-9 {
            nearest as u64
        } else {
            exact.ceil() as u64
        }
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Byte length of one tightly packed RGBA8 frame.
    pub fn rgba_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

/// Straight-alpha RGBA8 colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    255
}

impl Rgba8 {
    /// Fully opaque colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Premultiplied `[r, g, b, a]` bytes.
    pub fn to_premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }
        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_range_is_half_open() {
        let r = FrameRange::new(FrameIndex(3), FrameIndex(6)).unwrap();
        assert_eq!(r.len_frames(), 3);
        assert!(r.contains(FrameIndex(3)));
        assert!(r.contains(FrameIndex(5)));
        assert!(!r.contains(FrameIndex(6)));
        assert!(!r.contains(FrameIndex(2)));

        let empty = FrameRange::new(FrameIndex(4), FrameIndex(4)).unwrap();
        assert!(empty.is_empty());
        assert!(!empty.contains(FrameIndex(4)));
        assert!(FrameRange::new(FrameIndex(5), FrameIndex(4)).is_err());
    }

    #[test]
    fn fps_rejects_zero() {
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(24, 0).is_err());
    }

    #[test]
    fn frame_count_is_ceil_with_float_snap() {
        let fps = Fps::new(24, 1).unwrap();
        assert_eq!(fps.frame_count_for(5.0), 120);
        assert_eq!(fps.frame_count_for(5.01), 121);
        assert_eq!(fps.frame_count_for(0.0), 0);
        assert_eq!(fps.frame_count_for(f64::NAN), 0);

        let ntsc = Fps::new(30_000, 1001).unwrap();
        assert_eq!(ntsc.frame_count_for(1001.0 / 30_000.0 * 10.0), 10);
    }

    #[test]
    fn frame_time_matches_index_over_fps() {
        let fps = Fps::new(24, 1).unwrap();
        assert_eq!(fps.frame_time_secs(FrameIndex(0)), 0.0);
        assert_eq!(fps.frame_time_secs(FrameIndex(12)), 0.5);
        assert_eq!(fps.frame_time_secs(FrameIndex(36)), 1.5);
    }

    #[test]
    fn premul_scales_channels() {
        assert_eq!(Rgba8::rgb(10, 20, 30).to_premul(), [10, 20, 30, 255]);
        let half = Rgba8 {
            r: 255,
            g: 0,
            b: 0,
            a: 128,
        };
        assert_eq!(half.to_premul(), [128, 0, 0, 128]);
    }
}
