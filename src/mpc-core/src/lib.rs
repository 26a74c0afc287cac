pub mod catalog;
pub mod config;
pub mod logging;
pub mod model;
pub mod paths;
pub mod progress;
pub mod redact;
pub mod resources;
pub mod secrets;
pub mod service;
pub mod status;
pub mod tasks;
pub mod url;

pub use catalog::{CatalogDescriptor, CatalogError, CatalogRegistry};
pub use config::{Config, ConfigError, LogLevel, LoggingConfig, ValidationError};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use paths::{AppDirs, DirsError};
pub use progress::{CancellationFlag, NullProgressMonitor, ProgressMonitor, TracingProgressMonitor};
pub use resources::{ResourceError, ResourceFetcher, ResourceRetriever};
pub use secrets::{CredentialStore, SecretsError};
pub use service::{
    describe_install_failure, InstallReport, MarketplaceService, NetworkErrorKind, SearchQuery,
    ServiceError, ServiceResult, SharedService,
};
pub use status::{Severity, Status};
pub use tasks::{ConcurrentTaskManager, TaskError, TaskManagerConfig};
pub use crate::url::{LinkDispatcher, MarketplaceLink};

pub const APP_NAME: &str = "mpc";
pub const APP_AUTHOR: &str = "Eclipse";
pub const APP_QUALIFIER: &str = "org";
