pub mod connection;
pub mod entities;
pub mod error;
pub mod json_store;
pub mod repositories;
pub mod store;

pub use error::StorageError;
pub use json_store::JsonScoreStore;
pub use repositories::ScoreRepository;
pub use store::{PersistBackend, ScoreStore, StoreSettings, open_store};
