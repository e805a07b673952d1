// Protected handlers: every operation here authenticates the caller first
// and, for record access, runs the ownership guard after the existence check.
pub mod dashboard;
pub mod finance;
pub mod images;
pub mod loans;
pub mod profile;
pub mod properties;
