// Serenity/poise adapters for the dispatch pipeline
pub mod events;
pub mod guild;
pub mod message;
pub mod slash;
