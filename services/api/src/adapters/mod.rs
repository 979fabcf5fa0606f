pub mod chat_llm;
pub mod db;
pub mod memory;
pub mod tutor;

pub use chat_llm::OpenAiChatAdapter;
pub use db::DbAdapter;
pub use memory::MemoryDatabase;
pub use tutor::Tutor;
