pub mod contract;
pub mod descriptor;
pub mod draw;
pub mod frame;
pub mod material;
pub mod mesh;
pub mod texture;

pub use contract::{ContractError, RenderingContract};
pub use descriptor::BoundDescriptorSet;
pub use draw::{DrawError, DrawList};
pub use frame::{
    FrameBufferError, LinearFrameBuffer, PoolError, PoolState, TransientPoolCreateInfo,
    TransientResourcePool,
};
pub use material::{Material, MaterialCreateInfo, MaterialError};
pub use mesh::{MeshAsset, MeshSection};
pub use texture::{RenderTarget, Texture};
