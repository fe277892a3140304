pub mod errors;
pub mod game_state;
pub mod validation;

// Re-export main components
pub use errors::*;
pub use game_state::*;
pub use validation::*;
