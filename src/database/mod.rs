pub mod adapter;
pub mod memory;

pub use adapter::{
    Adapter, AdapterError, DockerImageAdapter, Filter, LabAdapter, LabDockerImageAdapter,
    LabInstanceAdapter, UserAdapter,
};
pub use memory::MemoryStore;
