pub mod channels;
pub mod config_store;
pub mod cron;
pub mod error;
pub mod gateway;
pub mod logs;
pub mod paths;
pub mod sessions;
pub mod settings;
pub mod skills;
pub mod validate;

pub use config_store::{ConfigSnapshot, ConfigStore};
pub use error::{StoreError, SyntaxLocation, ValidationError};
pub use paths::OpenClawPaths;
pub use settings::AdapterSettings;
