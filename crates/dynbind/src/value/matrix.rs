// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! 3x3 affine matrix, laid out exactly as natives expect it.

/// Row-major 3x3 matrix of doubles.
///
/// Always handed to natives by pointer, never by value.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Matrix {
    pub xx: f64,
    pub xy: f64,
    pub xz: f64,
    pub yx: f64,
    pub yy: f64,
    pub yz: f64,
    pub zx: f64,
    pub zy: f64,
    pub zz: f64,
}

impl Matrix {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            xx: 1.0,
            yy: 1.0,
            zz: 1.0,
            ..Self::default()
        }
    }

    /// Build from nine row-major coefficients.
    pub fn from_array(m: [f64; 9]) -> Self {
        Self {
            xx: m[0],
            xy: m[1],
            xz: m[2],
            yx: m[3],
            yy: m[4],
            yz: m[5],
            zx: m[6],
            zy: m[7],
            zz: m[8],
        }
    }

    /// Row-major coefficients.
    pub fn to_array(&self) -> [f64; 9] {
        [
            self.xx, self.xy, self.xz, self.yx, self.yy, self.yz, self.zx, self.zy, self.zz,
        ]
    }
}
