pub mod ai_provider;
pub mod ai_service;
pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod logging;
pub mod material_service;
pub mod models;
pub mod pdf_text;
pub mod response_parser;

pub use ai_service::AiService;
pub use auth::SessionStore;
pub use config::Config;
pub use database::Database;
pub use errors::*;
pub use material_service::MaterialService;
pub use models::*;
