pub mod model;
pub mod openai_client;
pub mod prompts;
pub mod store;
pub mod voice;

pub use model::ChatModel;
pub use openai_client::{ChatCompletionModel, ChatCompletionRequest, OpenAIClient};
pub use store::{NewItinerary, StoredItinerary, SupabaseStore, TripStore};
pub use voice::{
    transcribe_upload, transcribe_with_config, SpeechRecognizer, TempAudioFile, TranscriptionResult,
};
