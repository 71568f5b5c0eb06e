use fathom_common::HarnessConfig;
use fathom_error::Result;

/// Creates and destroys the backing cluster.
///
/// Implementations block until the operation completes. `create` failures are
/// fatal for the run; `destroy` failures are logged and absorbed by the
/// coordinator.
pub trait ClusterProvider: Send + Sync {
    type Handle: Send + Sync + 'static;

    fn create(&self, config: &HarnessConfig) -> Result<Self::Handle>;

    fn destroy(&self, handle: &Self::Handle) -> Result<()>;

    /// Identifier used in logs and error context.
    fn instance_id(&self, handle: &Self::Handle) -> String;
}
