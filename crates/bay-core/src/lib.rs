pub mod allocator;
pub mod container_driver;
pub mod forwarder;
pub mod logging;
pub mod readiness;
pub mod scheduler;

pub use allocator::Allocator;
pub use container_driver::{
    ContainerDriver, ContainerSpec, DockerContainerDriver, ProvisionedContainer,
};
pub use forwarder::Forwarder;
pub use logging::init_logging;
pub use readiness::{HttpReadinessProbe, ReadinessProbe};
pub use scheduler::Scheduler;
