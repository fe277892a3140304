pub mod score_repository;

pub use score_repository::ScoreRepository;
