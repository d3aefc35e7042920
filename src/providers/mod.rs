//! Speech model backends.

pub mod remote;
pub mod retry;

pub use remote::{RemoteConfig, RemoteModel, RemoteModelLoader};
pub use retry::{RetryConfig, RetryingSpeechModel};
