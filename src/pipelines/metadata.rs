// SPDX-License-Identifier: GPL-3.0-only

//! Still capture metadata
//!
//! Stills are taken with `--metadata - --metadata-format txt`, which prints
//! `Key=value` lines on stdout. Only the exposure result is kept.

use std::fmt;

/// Exposure actually used for a still
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StillMetadata {
    /// Microseconds
    pub exposure_time: Option<u64>,
    pub analogue_gain: Option<f64>,
    pub digital_gain: Option<f64>,
}

impl StillMetadata {
    /// Parse tool output; later lines win, unknown keys are ignored
    pub fn parse(text: &str) -> Self {
        let mut metadata = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "ExposureTime" => metadata.exposure_time = value.parse().ok(),
                "AnalogueGain" => metadata.analogue_gain = value.parse().ok(),
                "DigitalGain" => metadata.digital_gain = value.parse().ok(),
                _ => {}
            }
        }
        metadata
    }

    pub fn is_empty(&self) -> bool {
        self.exposure_time.is_none() && self.analogue_gain.is_none() && self.digital_gain.is_none()
    }
}

impl fmt::Display for StillMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show<T: fmt::Display>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
        }
        write!(
            f,
            "Ana Gain: {} Dig Gain: {} Exp Time: {}uS",
            show(self.analogue_gain),
            show(self.digital_gain),
            show(self.exposure_time)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata() {
        let text = "SensorTimestamp=1234\nExposureTime=9998\nAnalogueGain=2.5\nDigitalGain=1.0012\n";
        let metadata = StillMetadata::parse(text);
        assert_eq!(metadata.exposure_time, Some(9998));
        assert_eq!(metadata.analogue_gain, Some(2.5));
        assert_eq!(metadata.digital_gain, Some(1.0012));
        assert_eq!(
            metadata.to_string(),
            "Ana Gain: 2.5 Dig Gain: 1.0012 Exp Time: 9998uS"
        );
    }

    #[test]
    fn test_empty_output() {
        let metadata = StillMetadata::parse("no metadata here\n");
        assert!(metadata.is_empty());
    }
}
