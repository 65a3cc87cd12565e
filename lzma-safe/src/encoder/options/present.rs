//! Compression presets exposed by liblzma.

use crate::Result;

/// Enum mirroring the preset argument passed to liblzma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum Compression {
    /// Level 0 preset (fastest, lowest ratio).
    Level0 = 0,

    /// Level 1 preset.
    Level1 = 1,

    /// Level 2 preset.
    Level2 = 2,

    /// Level 3 preset.
    Level3 = 3,

    /// Level 4 preset.
    Level4 = 4,

    /// Level 5 preset.
    Level5 = 5,

    /// Level 6 preset (liblzma default).
    #[default]
    Level6 = 6,

    /// Level 7 preset.
    Level7 = 7,

    /// Level 8 preset.
    Level8 = 8,

    /// Level 9 preset (slowest, best ratio).
    Level9 = 9,

    /// Extreme variant of a preset. Values above 9 are clamped.
    Extreme(u8),
}

impl Compression {
    /// Bit flag to enable "extreme" compression mode.
    const LZMA_PRESET_EXTREME: u32 = 1u32 << 31;

    /// Convert to the numeric preset expected by liblzma.
    pub fn to_preset(self) -> u32 {
        match self {
            Compression::Level0 => 0,
            Compression::Level1 => 1,
            Compression::Level2 => 2,
            Compression::Level3 => 3,
            Compression::Level4 => 4,
            Compression::Level5 => 5,
            Compression::Level6 => 6,
            Compression::Level7 => 7,
            Compression::Level8 => 8,
            Compression::Level9 => 9,
            Compression::Extreme(level) => {
                // Clamp level to 0..=9 as required by liblzma.
                let level = u32::from(level.min(9));
                level | Self::LZMA_PRESET_EXTREME
            }
        }
    }

    /// Dictionary size liblzma would use for this preset's LZMA2 filter.
    ///
    /// Callers that need to size buffers relative to the match window (e.g. a
    /// block-size-as-multiple-of-dictionary policy) can use this instead of
    /// duplicating liblzma's preset table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OptionsError`] if the linked liblzma does not
    /// recognize this preset.
    pub fn dict_size(self) -> Result<u32> {
        // SAFETY: zeroed `lzma_options_lzma` is a valid argument to `lzma_lzma_preset`,
        // which fills every field before returning.
        let mut opts = unsafe { std::mem::zeroed::<liblzma_sys::lzma_options_lzma>() };
        crate::ffi::lzma_lzma_preset(&mut opts, self.to_preset())?;
        Ok(opts.dict_size)
    }

    /// Full LZMA2 filter options liblzma would use for this preset, for
    /// callers that build their own filter chain (e.g. the block codec)
    /// instead of going through [`crate::Encoder::new`]'s one-shot preset
    /// handling.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OptionsError`] if the linked liblzma does not
    /// recognize this preset.
    pub fn lzma2_options(self) -> Result<super::filter::LzmaOptions> {
        // SAFETY: zeroed `lzma_options_lzma` is a valid argument to `lzma_lzma_preset`,
        // which fills every field before returning.
        let mut opts = unsafe { std::mem::zeroed::<liblzma_sys::lzma_options_lzma>() };
        crate::ffi::lzma_lzma_preset(&mut opts, self.to_preset())?;

        let mode = if opts.mode == liblzma_sys::lzma_mode_LZMA_MODE_FAST {
            super::filter::CompressionMode::Fast
        } else {
            super::filter::CompressionMode::Normal
        };
        let mf = match opts.mf {
            liblzma_sys::lzma_match_finder_LZMA_MF_HC3 => super::filter::MatchFinder::Hc3,
            liblzma_sys::lzma_match_finder_LZMA_MF_BT2 => super::filter::MatchFinder::Bt2,
            liblzma_sys::lzma_match_finder_LZMA_MF_BT3 => super::filter::MatchFinder::Bt3,
            liblzma_sys::lzma_match_finder_LZMA_MF_BT4 => super::filter::MatchFinder::Bt4,
            _ => super::filter::MatchFinder::Hc4,
        };

        Ok(super::filter::LzmaOptions {
            dict_size: opts.dict_size,
            lc: opts.lc,
            lp: opts.lp,
            pb: opts.pb,
            mode,
            nice_len: opts.nice_len,
            mf,
            depth: opts.depth,
            preset_dict: None,
            ext_flags: 0,
            ext_size_low: 0,
            ext_size_high: 0,
        })
    }
}
