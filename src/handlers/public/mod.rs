// Public handlers: no bearer credential required. Registration and login
// acquire credentials; health reports dependency status.
pub mod auth;
pub mod health;
