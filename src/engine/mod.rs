pub mod controller;

pub use controller::{ChangeOutcome, CountdownController, StartOutcome, TickOutcome, TICK_PERIOD};
