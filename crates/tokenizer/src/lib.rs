pub mod corpus;
pub mod error;
pub mod vocab;

pub use corpus::EncodedCorpus;
pub use error::{Result, VocabError};
pub use vocab::Vocabulary;
