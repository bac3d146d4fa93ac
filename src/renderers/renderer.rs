// Copyright @yucwang 2021

use crate::core::error::RenderResult;
use crate::math::bitmap::Bitmap;

pub trait Renderer {
    /// Renders the initialized job to completion and returns the image.
    fn render(&mut self) -> RenderResult<Bitmap>;
}
