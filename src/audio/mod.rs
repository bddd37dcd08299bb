pub mod analyser;
pub mod decode;
pub mod source;

pub use analyser::SpectrumAnalyser;
pub use decode::{decode_audio, DecodedAudio};
pub use source::{SignalSource, SourceConfig, DEFAULT_MAX_ASSET_BYTES};
