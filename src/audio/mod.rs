pub mod analysis;
pub mod decode;
pub mod features;
pub mod fft;
pub mod frames;
pub mod mapper;
pub mod spectrum;
pub mod synth;
