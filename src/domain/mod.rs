pub mod classifier;
pub mod controller;
pub mod discovery;
pub mod models;
pub mod pairing;
pub mod settings;
pub mod state;
