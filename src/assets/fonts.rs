use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    foundation::error::SingalongResult,
    render::{backend::TextBackend, builtin::BlockTextBackend, cpu::VelloTextBackend},
};

/// System locations tried, in order, when no font is given or the given one fails.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A font loaded from disk.
#[derive(Debug)]
pub struct TruetypeFont {
    pub source: PathBuf,
    pub bytes: Arc<Vec<u8>>,
}

/// A usable face: real font bytes, or the built-in block face.
///
/// Cheap to clone and safe to share across render workers; each worker builds its own
/// [`TextBackend`] from it.
#[derive(Clone, Debug)]
pub enum FontFace {
    Truetype(Arc<TruetypeFont>),
    Builtin,
}

impl FontFace {
    /// Text backend rendering this face at `size_px`. A face whose bytes cannot be shaped
    /// degrades to the block face.
    pub fn backend(&self, size_px: f32) -> SingalongResult<Box<dyn TextBackend>> {
        match self {
            Self::Truetype(font) => match VelloTextBackend::new(&font.bytes, size_px) {
                Ok(b) => Ok(Box::new(b)),
                Err(e) => {
                    tracing::warn!(
                        font = %font.source.display(),
                        error = %e,
                        "font could not be registered; using built-in face"
                    );
                    Ok(Box::new(BlockTextBackend::new(size_px)?))
                }
            },
            Self::Builtin => Ok(Box::new(BlockTextBackend::new(size_px)?)),
        }
    }

    /// Human-readable origin of the face.
    pub fn describe(&self) -> String {
        match self {
            Self::Truetype(font) => font.source.display().to_string(),
            Self::Builtin => "built-in block face".to_string(),
        }
    }
}

/// Resolves font files once and hands out shared faces.
///
/// Owned by whoever sets up a render; nothing here is global.
#[derive(Debug)]
pub struct FontCache {
    candidates: Vec<PathBuf>,
    loaded: HashMap<PathBuf, Option<FontFace>>,
}

impl Default for FontCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FontCache {
    /// Cache searching the usual system font locations.
    pub fn new() -> Self {
        Self::with_candidates(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from).collect())
    }

    /// Cache searching only `candidates` after an explicit font.
    pub fn with_candidates(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            loaded: HashMap::new(),
        }
    }

    /// Resolve `preferred`, then the candidates, then the built-in face. Never fails.
    pub fn resolve(&mut self, preferred: Option<&Path>) -> FontFace {
        if let Some(path) = preferred {
            if let Some(face) = self.load(path) {
                return face;
            }
            tracing::warn!(font = %path.display(), "requested font unavailable; falling back");
        }

        let candidates = self.candidates.clone();
        for path in &candidates {
            if let Some(face) = self.load(path) {
                tracing::debug!(font = %path.display(), "using system font");
                return face;
            }
        }

        tracing::warn!("no usable font file found; using built-in block face");
        FontFace::Builtin
    }

    /// Number of paths probed so far, including failures.
    pub fn probed(&self) -> usize {
        self.loaded.len()
    }

    fn load(&mut self, path: &Path) -> Option<FontFace> {
        if let Some(hit) = self.loaded.get(path) {
            return hit.clone();
        }
        let face = match std::fs::read(path) {
            Ok(bytes) if looks_like_font(&bytes) => Some(FontFace::Truetype(Arc::new(TruetypeFont {
                source: path.to_path_buf(),
                bytes: Arc::new(bytes),
            }))),
            Ok(_) => {
                tracing::debug!(font = %path.display(), "not a TrueType/OpenType file");
                None
            }
            Err(_) => None,
        };
        self.loaded.insert(path.to_path_buf(), face.clone());
        face
    }
}

/// sfnt magic: TrueType, OpenType CFF, Apple `true`, or a collection.
fn looks_like_font(bytes: &[u8]) -> bool {
    matches!(
        bytes.get(..4),
        Some([0x00, 0x01, 0x00, 0x00]) | Some(b"OTTO") | Some(b"true") | Some(b"ttcf")
    )
}
