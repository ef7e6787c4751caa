//! Fabric bus backends.
//!
//! Two backends implement [`crate::FabricBus`]:
//! - **`DevMemFabric`**: the real fabric window, mapped from `/dev/mem`.
//! - **`SimFabric`**: a behavioral model of the whole fabric — dispatchers,
//!   stream processor, destination RAM, and the CPU data cache. The entire
//!   verification protocol runs against it without hardware, including its
//!   failure modes (stale cache, mis-ordered launch, wedged sink).

pub mod devmem;
pub mod sim;

pub use devmem::DevMemFabric;
pub use sim::SimFabric;
