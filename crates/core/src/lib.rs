pub mod detection;
pub mod gallery;
pub mod imaging;
pub mod matching;
pub mod pipeline;
pub mod shared;
