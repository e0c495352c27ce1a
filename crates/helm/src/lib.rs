//! Touch drag-and-drop configurator for steering-wheel button slots.

pub mod app;
pub mod catalog;
pub mod config;
pub mod events;
pub mod geometry;
pub mod interaction;
pub mod scene;
pub mod sys;
