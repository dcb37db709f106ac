//! wgpu implementation of [`GpuBackend`](crate::GpuBackend).
//!
//! - `context` owns the wgpu instance, device and window surface and rebuilds
//!   swapchain state on resize.
//! - `pipeline` turns a translated shader pair into a line-list render
//!   pipeline with a single uniform bind group.
//! - `backend` maps the bind/upload/draw/release calls onto render passes,
//!   padding streamed attributes to the widths the shader declares.

mod backend;
mod context;
mod pipeline;

use std::fmt;
use std::str::FromStr;

pub use backend::WgpuBackend;

/// Multisampling requested for the window surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Highest supported sample count up to 4.
    #[default]
    Auto,
    Off,
    /// A specific sample count, lowered to what the device supports.
    Samples(u32),
}

impl FromStr for Antialiasing {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Antialiasing::Auto),
            "off" | "none" | "0" | "1" => Ok(Antialiasing::Off),
            other => match other.parse::<u32>() {
                Ok(samples) if samples.is_power_of_two() && samples <= 16 => {
                    Ok(Antialiasing::Samples(samples))
                }
                _ => Err(format!(
                    "invalid antialiasing `{value}`; expected auto, off or a sample count (2, 4, 8, 16)"
                )),
            },
        }
    }
}

impl fmt::Display for Antialiasing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Antialiasing::Auto => f.write_str("auto"),
            Antialiasing::Off => f.write_str("off"),
            Antialiasing::Samples(samples) => write!(f, "{samples}"),
        }
    }
}

/// Device and surface preferences for [`WgpuBackend::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuOptions {
    pub antialiasing: Antialiasing,
    pub vsync: bool,
    pub low_power: bool,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            antialiasing: Antialiasing::Auto,
            vsync: true,
            low_power: false,
        }
    }
}
