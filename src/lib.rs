// Watermark Engine Library
// Stamps text labels onto PDF documents and raster images

pub mod config;
pub mod logging;
pub mod watermark;
