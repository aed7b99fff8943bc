pub mod alert;
pub mod message;
pub mod outcome;
pub mod recipient;
pub mod suppression_window;
