pub mod example;
pub mod generation;
pub mod health;
pub mod payments;
pub mod webhook;
