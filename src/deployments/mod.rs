//! Packages and their distribution to git repositories

pub mod packages;
pub mod packmind_config;
pub mod ports;
pub mod publisher;
pub mod renderer;

pub use packages::{
    AddArtefactsCommand, CatalogPorts, CreatePackageCommand, DeletePackagesCommand,
    PackageCatalog, UpdatePackageCommand,
};
pub use packmind_config::PackmindFileConfig;
pub use publisher::{PackagePublisher, PublishPackagesCommand, PublisherPorts};
pub use renderer::MarkdownRenderer;
