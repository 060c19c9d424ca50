pub mod input;
pub mod statusline;
pub mod transcript;
