//! Box transforms for `[N, 4]` arrays in corner form `[x1, y1, x2, y2]`.
//! Each function returns a new array and leaves its input untouched.

use ndarray::{Array2, ArrayView2};

/// Undo a resize: divide x coordinates by `scale_x` and y coordinates by `scale_y`.
pub fn rescale_boxes(boxes: ArrayView2<f32>, scale_x: f32, scale_y: f32) -> Array2<f32> {
    let mut out = boxes.to_owned();
    for mut row in out.rows_mut() {
        row[0] /= scale_x;
        row[1] /= scale_y;
        row[2] /= scale_x;
        row[3] /= scale_y;
    }
    out
}

/// Undo a pad: move boxes left by `left` and up by `top`.
pub fn shift_boxes(boxes: ArrayView2<f32>, left: f32, top: f32) -> Array2<f32> {
    let mut out = boxes.to_owned();
    for mut row in out.rows_mut() {
        row[0] -= left;
        row[1] -= top;
        row[2] -= left;
        row[3] -= top;
    }
    out
}

/// Convert `[x1, y1, x2, y2]` to `[x, y, w, h]`.
pub fn xyxy_to_xywh(boxes: ArrayView2<f32>) -> Array2<f32> {
    let mut out = boxes.to_owned();
    for mut row in out.rows_mut() {
        let (x1, y1) = (row[0], row[1]);
        row[2] -= x1;
        row[3] -= y1;
    }
    out
}
