pub mod access;
pub mod analytics;
pub mod auth;
pub mod config;
pub mod detailed_analytics;
pub mod export;
pub mod health;
pub mod listing;
pub mod moderation;
pub mod notifications;
pub mod services;
pub mod surreal;
pub mod user_analytics;
