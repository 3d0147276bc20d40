//! Flat buffers in the shape the graphics device expects: raw data plus the
//! stride (scalar components per logical element) and element count.

use crate::core::Vec2;

#[derive(Clone, Debug, PartialEq)]
pub struct FloatBuffer {
    pub data: Vec<f32>,
    pub len: usize,
    pub stride: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntBuffer {
    pub data: Vec<i32>,
    pub len: usize,
    pub stride: usize,
}

impl FloatBuffer {
    pub fn from_vec2s(rows: &[Vec2]) -> Self {
        let data = rows.iter().flat_map(|v| [v.x, v.y]).collect();
        Self {
            data,
            len: rows.len(),
            stride: 2,
        }
    }

    pub fn from_rows<const N: usize>(rows: &[[f32; N]]) -> Self {
        let data = rows.iter().flatten().copied().collect();
        Self {
            data,
            len: rows.len(),
            stride: N,
        }
    }
}

impl IntBuffer {
    pub fn from_scalars(values: &[i32]) -> Self {
        Self {
            data: values.to_vec(),
            len: values.len(),
            stride: 1,
        }
    }

    pub fn from_rows<const N: usize>(rows: &[[i32; N]]) -> Self {
        let data = rows.iter().flatten().copied().collect();
        Self {
            data,
            len: rows.len(),
            stride: N,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec2_rows_have_stride_two() {
        let buf = FloatBuffer::from_vec2s(&[Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0)]);
        assert_eq!(buf.data, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buf.len, 2);
        assert_eq!(buf.stride, 2);
    }

    #[test]
    fn fixed_rows_keep_their_width() {
        let buf = FloatBuffer::from_rows(&[[1.0, 30.0, 30.0, -1.0]]);
        assert_eq!(buf.stride, 4);
        assert_eq!(buf.len, 1);

        let idx = IntBuffer::from_rows(&[[0, 1, 0], [2, 0, 0]]);
        assert_eq!(idx.stride, 3);
        assert_eq!(idx.len, 2);
    }

    #[test]
    fn empty_rows_are_legal() {
        let buf = FloatBuffer::from_vec2s(&[]);
        assert_eq!(buf.len, 0);
        assert!(buf.data.is_empty());
    }
}
