// Copyright @yucwang 2021

pub mod core;
pub mod math;
pub mod io;
pub mod sensors;
pub mod samplers;
pub mod shapes;
pub mod integrators;
pub mod renderers;
