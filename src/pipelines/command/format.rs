// SPDX-License-Identifier: GPL-3.0-only

//! Value formatting for capture tool arguments
//!
//! The rpicam tools accept decimal values in the shortest form; whole values
//! keep a trailing `.0` (`--brightness 0.0`, `--contrast 0.7`).

/// Render a float the way the tools' reference front end always has
pub fn decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// `numerator / denominator` as a decimal argument
pub fn ratio(numerator: i32, denominator: i32) -> String {
    decimal(numerator as f64 / denominator as f64)
}

/// Normalised crop rectangle for `--roi`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Roi {
    /// Crop of `crop` centred on a `frame`
    ///
    /// A crop larger than the frame along an axis covers that axis fully.
    pub fn centered(crop: (u32, u32), frame: (u32, u32)) -> Self {
        let (x, width) = centered_axis(crop.0, frame.0);
        let (y, height) = centered_axis(crop.1, frame.1);
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_normalized(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
            && self.x + self.width <= 1.0 + f64::EPSILON
            && self.y + self.height <= 1.0 + f64::EPSILON
    }

    /// `x,y,w,h` argument
    pub fn to_arg(&self) -> String {
        format!(
            "{},{},{},{}",
            decimal(self.x),
            decimal(self.y),
            decimal(self.width),
            decimal(self.height)
        )
    }
}

fn centered_axis(crop: u32, frame: u32) -> (f64, f64) {
    if frame == 0 || crop >= frame {
        return (0.0, 1.0);
    }
    let frame = frame as f64;
    let crop = crop as f64;
    (((frame - crop) / 2.0) / frame, crop / frame)
}
