//! wgpu backend for the `overlay` rendering core.
//!
//! - `context` owns the wgpu instance, device and window surface.
//! - `compile` assembles visualization sources into GLSL 450 fragment
//!   programs and resolves their uniform names.
//! - `pipeline` links fragment programs with the shared vertex stage.
//! - `uniforms` mirrors the injected uniform block and packs one copy per
//!   draw into a dynamic-offset buffer.
//! - `recorder` turns GL-style state calls into a draw list.
//! - `surface` ties it together as [`GpuSurface`].

mod compile;
mod context;
mod pipeline;
mod recorder;
mod surface;
mod uniforms;

pub use surface::GpuSurface;
