/// UI widgets and helpers for the editor screen
pub mod canvas;
pub mod shortcuts;
pub mod toast;
