pub mod catalog;
pub mod check;
pub mod matrix;

use rolegate_core::backend::{HttpBackend, MemoryBackend, PermissionBackend};
use rolegate_core::config::RolegateConfig;
use std::sync::Arc;

/// Backend selected by `--demo` or the `[client]` section
pub fn backend(config: &RolegateConfig, demo: bool) -> anyhow::Result<Arc<dyn PermissionBackend>> {
    if demo {
        log::info!("Using the in-memory demo catalog");
        return Ok(Arc::new(MemoryBackend::demo()));
    }
    log::debug!("Using catalog at {}", config.client.base_url);
    Ok(Arc::new(HttpBackend::from_config(&config.client)?))
}
