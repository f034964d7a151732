pub mod observation_reader;
pub mod parameter_reader;
pub mod station_reader;

pub use observation_reader::{ObservationReader, ParsedObservations};
pub use parameter_reader::ParameterReader;
pub use station_reader::StationReader;
