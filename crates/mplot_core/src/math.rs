//! Projection math

/// 4x4 transformation matrix (column-major)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Orthographic projection with a 0..1 depth range (wgpu convention)
    ///
    /// Passing `bottom > top` flips Y, which is how device-pixel space
    /// (origin top-left) is mapped to clip space.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let rl = right - left;
        let tb = top - bottom;
        let fn_ = far - near;
        Self {
            cols: [
                [2.0 / rl, 0.0, 0.0, 0.0],
                [0.0, 2.0 / tb, 0.0, 0.0],
                [0.0, 0.0, 1.0 / fn_, 0.0],
                [-(right + left) / rl, -(top + bottom) / tb, -near / fn_, 1.0],
            ],
        }
    }

    /// Projection for device pixels of a `width` x `height` target
    ///
    /// z is a depth hint in -1..1 with +1 nearest the viewer: z = 1 maps to
    /// depth 0 and z = -1 to depth 1 (the far plane).
    pub fn screen(width: f32, height: f32) -> Self {
        Self::orthographic(0.0, width, height, 0.0, 1.0, -1.0)
    }

    /// Multiply two matrices
    pub fn mul(&self, other: &Mat4) -> Mat4 {
        let mut result = [[0.0f32; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    result[i][j] += self.cols[k][j] * other.cols[i][k];
                }
            }
        }
        Mat4 { cols: result }
    }

    /// Transform a point, returning homogeneous clip coordinates
    pub fn transform_point(&self, p: [f32; 3]) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        for (row, value) in out.iter_mut().enumerate() {
            *value = self.cols[0][row] * p[0]
                + self.cols[1][row] * p[1]
                + self.cols[2][row] * p[2]
                + self.cols[3][row];
        }
        out
    }

    pub fn to_cols_array(&self) -> [[f32; 4]; 4] {
        self.cols
    }
}
