//! Configuration type definitions

mod updater_config;

pub use updater_config::{
    AssetConfig, InstallConfig, NetworkConfig, NotificationConfig, RegistryConfig, UpdaterConfig,
};
