pub use super::scores::Entity as Scores;
