//! Image transforms used by the processing pipeline.
//!
//! | Module | Concern |
//! |--------|---------|
//! | [`filters`] | Per-pixel work: whitening, background removal, border crop, perimeter check, padding, brightness/contrast |
//! | [`geometry`] | Size and canvas work: fit-within, aspect-ratio extension, exact canvas |

pub mod filters;
pub mod geometry;
