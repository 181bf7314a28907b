//! Ratatui front-end: a table list with a SQL script box, a row grid per
//! table, and modal popups for every form and confirmation.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
