//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{ConfigurationBuilder, MeshInspector};
use crate::config::Settings;
use crate::infrastructure::gmsh::GmshProvider;
use crate::infrastructure::traits::{
    CommandRunner, EngineProvider, FileSystem, RealCommandRunner, RealFileSystem,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Opens geometry engine sessions
    pub provider: Arc<dyn EngineProvider>,

    pub builder: ConfigurationBuilder,
    pub inspector: MeshInspector,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(RealCommandRunner),
        )
    }

    /// Create a service container with custom I/O (gmsh still drives the engine).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
    ) -> Self {
        let provider: Arc<dyn EngineProvider> =
            Arc::new(GmshProvider::new(fs.clone(), cmd, settings.gmsh.clone()));
        Self::with_provider(settings, fs, provider)
    }

    /// Create a service container around any engine provider (for testing).
    pub fn with_provider(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        provider: Arc<dyn EngineProvider>,
    ) -> Self {
        let settings = Arc::new(settings);

        let builder = ConfigurationBuilder::new(provider.clone(), fs.clone(), settings.clone());
        let inspector = MeshInspector::new(fs.clone(), settings.clone());

        Self {
            settings,
            fs,
            provider,
            builder,
            inspector,
        }
    }
}
