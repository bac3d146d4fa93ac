// Copyright @yucwang 2026

pub mod exr_utils;
pub mod job_loader;
pub mod obj_utils;
pub mod png_utils;
