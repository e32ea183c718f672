//! Five-band equalizer settings and presets.
//!
//! Only the settings live here. Applying gains to audio is the engine's
//! job (`PlaybackEngine::apply_equalizer`).

use {
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

use crate::config::preferences::{PreferenceError, PreferenceValue};

/// Number of equalizer bands.
pub const BAND_COUNT: usize = 5;

/// Center frequency labels, low to high.
pub const BAND_LABELS: [&str; BAND_COUNT] = ["60Hz", "230Hz", "910Hz", "3.6kHz", "14kHz"];

/// Lowest accepted gain in dB.
pub const MIN_GAIN_DB: f32 = -10.0;

/// Highest accepted gain in dB.
pub const MAX_GAIN_DB: f32 = 10.0;

/// Name of the flat preset.
pub const NORMAL_PRESET: &str = "Normal";

/// Preset name shown once a band is edited by hand.
pub const CUSTOM_PRESET: &str = "Custom";

/// A named set of band gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualizerPreset {
    /// Display name.
    pub name: &'static str,
    /// Gains in dB, one per band.
    pub gains: [f32; BAND_COUNT],
}

/// Built-in presets.
pub const PRESETS: [EqualizerPreset; 6] = [
    EqualizerPreset {
        name: NORMAL_PRESET,
        gains: [0.0, 0.0, 0.0, 0.0, 0.0],
    },
    EqualizerPreset {
        name: "Rock",
        gains: [3.0, 2.0, -1.0, -1.0, 3.0],
    },
    EqualizerPreset {
        name: "Pop",
        gains: [-1.0, 2.0, 3.0, 2.0, -1.0],
    },
    EqualizerPreset {
        name: "Classical",
        gains: [3.0, 2.0, -1.0, 2.0, 3.0],
    },
    EqualizerPreset {
        name: "Jazz",
        gains: [2.0, 1.0, 1.0, 2.0, 3.0],
    },
    EqualizerPreset {
        name: "Bass Boost",
        gains: [5.0, 3.0, 0.0, -2.0, -3.0],
    },
];

/// Error type for equalizer edits.
#[derive(Error, Debug, PartialEq)]
pub enum EqualizerError {
    /// Band index past the last band.
    #[error("Band {band} out of range")]
    BandOutOfRange { band: usize },
    /// Gain is not a finite number.
    #[error("Gain must be a finite number")]
    InvalidGain,
    /// No preset with that name.
    #[error("Unknown preset: {name}")]
    UnknownPreset { name: String },
}

/// Current equalizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualizerState {
    /// Gains in dB, one per band.
    pub gains: [f32; BAND_COUNT],
    /// Active preset name, or `Custom`.
    pub preset: String,
}

impl Default for EqualizerState {
    fn default() -> Self {
        Self {
            gains: [0.0; BAND_COUNT],
            preset: NORMAL_PRESET.to_string(),
        }
    }
}

impl EqualizerState {
    /// Restores persisted gains and preset name, clamping out-of-range gains.
    #[must_use]
    pub fn restored(gains: [f32; BAND_COUNT], preset: String) -> Self {
        Self {
            gains: gains.map(clamp_gain),
            preset,
        }
    }

    /// Sets one band and marks the configuration as custom.
    ///
    /// # Errors
    ///
    /// Returns `EqualizerError` for an unknown band or a non-finite gain.
    pub fn set_band(&mut self, band: usize, gain_db: f32) -> Result<(), EqualizerError> {
        if !gain_db.is_finite() {
            return Err(EqualizerError::InvalidGain);
        }
        let slot = self
            .gains
            .get_mut(band)
            .ok_or(EqualizerError::BandOutOfRange { band })?;
        *slot = clamp_gain(gain_db);
        self.preset = CUSTOM_PRESET.to_string();
        Ok(())
    }

    /// Switches to a built-in preset.
    ///
    /// # Errors
    ///
    /// Returns `EqualizerError::UnknownPreset` if no preset has that name.
    pub fn apply_preset(&mut self, name: &str) -> Result<(), EqualizerError> {
        let preset = PRESETS
            .iter()
            .find(|preset| preset.name == name)
            .ok_or_else(|| EqualizerError::UnknownPreset {
                name: name.to_string(),
            })?;
        self.gains = preset.gains;
        self.preset = preset.name.to_string();
        Ok(())
    }

    /// Back to the flat preset.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn clamp_gain(gain_db: f32) -> f32 {
    if gain_db.is_finite() {
        gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB)
    } else {
        0.0
    }
}

/// Band gains persist as comma-joined numbers; exactly five are required.
impl PreferenceValue for [f32; BAND_COUNT] {
    fn decode(raw: &str) -> Result<Self, PreferenceError> {
        let values = raw
            .split(',')
            .map(|part| part.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| PreferenceError::invalid(raw, "five comma-separated numbers"))?;

        <[f32; BAND_COUNT]>::try_from(values)
            .map_err(|_| PreferenceError::invalid(raw, "five comma-separated numbers"))
    }

    fn encode(&self) -> String {
        self.iter()
            .map(f32::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}
