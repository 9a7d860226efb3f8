//! Rolldown plugins applied by [`BuildContext`](crate::BuildContext).

pub mod loader;
pub mod vue;

use std::sync::Arc;

use obpack_config::{BundleConfig, PluginKind};
use rolldown_plugin::__inner::SharedPluginable;

pub use loader::LoaderPlugin;
pub use vue::VueSfcPlugin;

/// Instantiate the plugins a configuration asks for, in order.
///
/// The loader plugin comes last so component plugins see their own file
/// types first.
pub fn plugins_for(config: &BundleConfig) -> Vec<SharedPluginable> {
    let mut plugins: Vec<SharedPluginable> = config
        .plugins
        .iter()
        .map(|kind| match kind {
            PluginKind::VueSfc => Arc::new(VueSfcPlugin::new()) as SharedPluginable,
        })
        .collect();

    if !config.loader.is_empty() {
        plugins.push(Arc::new(LoaderPlugin::new(config.loader.clone())));
    }

    plugins
}
