// Copyright @yucwang 2021

pub mod arena;
pub mod barrier;
pub mod error;
pub mod film;
pub mod filter;
pub mod integrator;
pub mod job;
pub mod rng;
pub mod sampler;
pub mod scene;
pub mod sensor;
pub mod thread_pool;
pub mod tile;
