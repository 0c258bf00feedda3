//! Encode configuration (§6 of the distilled specification). This is an
//! in-process value, not a CLI surface — "There is no CLI, no environment,
//! and no persisted state at this layer" — so unlike the teacher's
//! `clap`-driven `Config`, it's a plain struct with a `Default` impl and a
//! small builder-style API.

/// How much effort the encoder spends looking for better endpoints.
///
/// Ordered from cheapest to most thorough: `Superfast` runs the optimiser's
/// initial PCA pass with zero refinement iterations, `Uber` runs a
/// brute-force search over a widened endpoint neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quality {
    /// No refinement iterations past the initial PCA endpoint guess.
    Superfast,
    /// A single refinement iteration.
    Fast,
    /// The default: a handful of refinement iterations.
    Normal,
    /// More refinement iterations and a wider initial candidate search.
    Better,
    /// Brute-force search over a widened endpoint neighbourhood.
    Uber,
}

impl Default for Quality {
    fn default() -> Self {
        Self::Normal
    }
}

impl Quality {
    /// Number of local-refinement iterations the endpoint optimisers run
    /// past the initial PCA pass, per §4.2 point 4.
    pub(crate) fn refinement_iterations(self) -> u32 {
        match self {
            Self::Superfast => 0,
            Self::Fast => 1,
            Self::Normal => 2,
            Self::Better => 4,
            Self::Uber => 8,
        }
    }
}

/// Which per-element encoder back-end `set_block_pixels` dispatches to
/// (§4.4). Only the selection contract is specified for `Crnf`/`Ryg`; their
/// internals are simplified stand-ins for the optional alternate back-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compressor {
    /// The default: the least-squares endpoint optimiser (§4.2).
    Crn,
    /// Fast path: single-pass PCA / min-max, no refinement.
    Crnf,
    /// Reference path. Not used for DXT1A (can't honour the 1-bit alpha
    /// threshold); receives pixels with R/B swapped and alpha forced opaque
    /// for DXT1.
    Ryg,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::Crn
    }
}

/// Encode configuration. All fields are read-only during encode; the
/// scheduler never mutates this record (§5).
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    /// Which per-element back-end to use.
    pub compressor: Compressor,
    /// How much effort the default back-end's optimisers spend.
    pub quality: Quality,
    /// Number of helper threads; `T = num_helper_threads + 1` workers total.
    pub num_helper_threads: usize,
    /// Use a luma-weighted (299/587/114-style) squared-error metric instead
    /// of RGB-uniform.
    pub perceptual: bool,
    /// Collapse RGB to luma for endpoint selection.
    pub grayscale_sampling: bool,
    /// DXT1 only: allow the encoder to pick the 3-color/punch-through
    /// palette if it reduces error.
    pub use_both_block_types: bool,
    /// Bias the optimiser toward using the transparent-black selector for
    /// near-black pixels in the punch-through palette.
    pub use_transparent_indices_for_black: bool,
    /// DXT1A only: input pixels with `a` below this are forced transparent.
    pub dxt1a_alpha_threshold: u8,
    /// Per-channel weights used by the perceptual error metric, `[r, g, b]`.
    pub color_weights: [u32; 3],
    /// Reuse optimiser scratch state across blocks on the same worker.
    pub endpoint_caching: bool,
    /// Progress percentage reported for the first block.
    pub progress_start: u32,
    /// Span of percentage values reported across the whole encode.
    pub progress_range: u32,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            compressor: Compressor::default(),
            quality: Quality::default(),
            num_helper_threads: 0,
            perceptual: false,
            grayscale_sampling: false,
            use_both_block_types: true,
            use_transparent_indices_for_black: false,
            dxt1a_alpha_threshold: 128,
            color_weights: [1, 1, 1],
            endpoint_caching: true,
            progress_start: 0,
            progress_range: 100,
        }
    }
}

impl EncodeParams {
    /// Sets `num_helper_threads` so that `T = helper_threads + 1` matches
    /// the number of logical CPUs reported by [`num_cpus::get`].
    pub fn with_default_parallelism(mut self) -> Self {
        self.num_helper_threads = num_cpus::get().saturating_sub(1);
        self
    }

    /// Builder form of [`Self::compressor`].
    pub fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = compressor;
        self
    }

    /// Builder form of [`Self::quality`].
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Builder form of [`Self::num_helper_threads`].
    pub fn with_num_helper_threads(mut self, num_helper_threads: usize) -> Self {
        self.num_helper_threads = num_helper_threads;
        self
    }

    /// Builder form of [`Self::perceptual`].
    pub fn with_perceptual(mut self, perceptual: bool) -> Self {
        self.perceptual = perceptual;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_match_documented_defaults() {
        let params = EncodeParams::default();
        assert_eq!(params.dxt1a_alpha_threshold, 128);
        assert_eq!(params.compressor, Compressor::Crn);
        assert_eq!(params.quality, Quality::Normal);
        assert_eq!(params.num_helper_threads, 0);
    }

    #[test]
    fn quality_ordering_runs_from_cheap_to_thorough() {
        assert!(Quality::Superfast < Quality::Fast);
        assert!(Quality::Fast < Quality::Normal);
        assert!(Quality::Normal < Quality::Better);
        assert!(Quality::Better < Quality::Uber);
    }

    #[test]
    fn builder_methods_compose() {
        let params = EncodeParams::default()
            .with_quality(Quality::Uber)
            .with_perceptual(true)
            .with_num_helper_threads(3);
        assert_eq!(params.quality, Quality::Uber);
        assert!(params.perceptual);
        assert_eq!(params.num_helper_threads, 3);
    }
}
