pub mod answer;
pub mod image_prep;
pub mod normalizer;
pub mod receiver;
pub mod reporter;
pub mod sweeper;
