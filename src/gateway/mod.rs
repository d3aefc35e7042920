//! Gateway construction and the cache façade.

mod builder;
mod speech;

pub use builder::{Huginn, HuginnBuilder};
pub use speech::{CacheSource, ClearReport, GatewayStatus, SpeechGateway, Synthesized};
