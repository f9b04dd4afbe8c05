/// A 3×3 color transform, row-major: `rows[out][in]`.
///
/// Row `i` produces output channel `i` (R, G, B) from the input RGB triple.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HueMatrix {
    rows: [[f32; 3]; 3],
}

impl HueMatrix {
    pub fn from_rows(rows: [[f32; 3]; 3]) -> Self {
        Self { rows }
    }

    pub fn identity() -> Self {
        Self::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }

    pub fn rows(&self) -> &[[f32; 3]; 3] {
        &self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.rows[row][col]
    }

    /// Multiply an RGB triple by the matrix without clamping.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let m = &self.rows;
        [
            m[0][0] * rgb[0] + m[0][1] * rgb[1] + m[0][2] * rgb[2],
            m[1][0] * rgb[0] + m[1][1] * rgb[1] + m[1][2] * rgb[2],
            m[2][0] * rgb[0] + m[2][1] * rgb[1] + m[2][2] * rgb[2],
        ]
    }

    /// Transform the RGB channels of an 8-bit pixel, rounding and clamping to `[0, 255]`.
    ///
    /// Only the first three channels are read; callers pass alpha through themselves.
    pub fn apply_to_pixel(&self, pixel: &[u8]) -> [u8; 3] {
        let out = self.apply([pixel[0] as f32, pixel[1] as f32, pixel[2] as f32]);
        out.map(|v| v.round().clamp(0.0, 255.0) as u8)
    }
}

/// Build the hue-rotation matrix for `angle_radians`.
///
/// Folds RGB→HSV, a hue rotation and HSV→RGB into one matrix whose entries are
/// linear in `cos(angle)` and `sin(angle)`, weighted by the NTSC luma
/// coefficients (0.299, 0.587, 0.114). The `cos` terms of each column sum to the
/// identity minus the luma row, so `angle = 0` yields the exact identity.
///
/// Any real angle is accepted; no normalization into `[0, 2π)` is done.
pub fn build_hue_rotation_matrix(angle_radians: f32) -> HueMatrix {
    let angle = angle_radians as f64;
    let c = angle.cos();
    let s = angle.sin();

    let rows = [
        [
            0.299 + 0.701 * c + 0.168 * s,
            0.587 - 0.587 * c + 0.330 * s,
            0.114 - 0.114 * c - 0.497 * s,
        ],
        [
            0.299 - 0.299 * c - 0.328 * s,
            0.587 + 0.413 * c + 0.035 * s,
            0.114 - 0.114 * c + 0.292 * s,
        ],
        [
            0.299 - 0.299 * c + 1.25 * s,
            0.587 - 0.587 * c - 1.05 * s,
            0.114 + 0.886 * c - 0.203 * s,
        ],
    ];

    HueMatrix::from_rows(rows.map(|row| row.map(|v| v as f32)))
}
