//! vision-service: image labelling, text generation and word similarity over
//! OpenAI and Gemini.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

pub use startup::AppState;
