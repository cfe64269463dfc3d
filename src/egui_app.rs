//! egui front-end: page state, the controller that drives the orchestrator, and the renderer.

pub mod controller;
pub mod state;
pub mod ui;
