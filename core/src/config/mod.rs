mod load;
mod types;

pub use load::{
    apply_env_overrides, get_taskflow_data_dir, load_default, load_from_path, parse_config,
    LOCAL_CONFIG_FILE,
};
pub use types::{AppConfig, EngineConfig, EventsOutConfig, LoggingConfig, ReportsConfig};
