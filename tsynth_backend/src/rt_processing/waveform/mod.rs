pub mod cache;
pub mod envelopes;
pub mod generators;
pub mod noise;
pub mod tables;

pub use cache::WaveTableCache;
pub use envelopes::{Envelope, EnvelopeState};
pub use tables::WaveTable;
