pub mod observation;
pub mod parameter;
pub mod station;

pub use observation::{FieldValue, Observation};
pub use parameter::{ParameterMap, ParameterMapping};
pub use station::Station;
