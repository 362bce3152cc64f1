pub mod engine;
pub mod event;
pub mod parameters;
pub mod table;

pub use crate::domain::model::Record;
pub use crate::domain::ports::{EventPublisher, Handler, KeyValueStore, ParameterStore};
pub use crate::utils::error::Result;
