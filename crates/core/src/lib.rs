pub mod config;
pub mod error;
pub mod table;
pub mod types;

pub use config::AppConfig;
pub use error::{PoppyError, PoppyResult};
pub use table::{PredictionRow, PredictionTable};
pub use types::{AffinityRecord, Category, IdentifierKey, InteractionRecord, InteractionType};
