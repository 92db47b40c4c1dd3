//! Numeric post-processing kernels shared by every model family.
//!
//! All functions are pure: they allocate their own output buffers and never
//! mutate their inputs, so they can be called concurrently from any thread.

mod activation;
mod boxes;
mod ctc;
mod select;

pub use activation::{argmax, l2_normalize, log_softmax, sigmoid, sigmoid_scalar, softmax};
pub use boxes::{cxcywh_to_xyxy, iou, nms, BOX_STRIDE};
pub use ctc::{ctc_collapse, ctc_greedy_decode};
pub use select::top_k;
