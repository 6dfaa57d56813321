pub mod http;
pub mod narration;
pub mod protocol;
pub mod store;
pub mod tts;

pub use http::HttpGenerationAdapter;
pub use narration::{FileBackedNarration, SynthesizedNarration};
pub use store::{FileStore, MemoryStore};
pub use tts::OpenAiTtsAdapter;
