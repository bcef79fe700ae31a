pub mod departures;
pub mod matcher;
pub mod time;
