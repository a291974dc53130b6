// crates/fv_physics/src/field/mod.rs

//! 场
//!
//! - [`value`]: 场值类型（标量、矢量、张量）
//! - [`vol_field`]: 单元中心场与边界面片场
//! - [`surface_field`]: 面场（通量、插值系数）
//! - [`registry`]: 按名称持有场的注册表
//! - [`io`]: 文本记录持久化
//!
//! 场不持有网格引用，需要几何的操作显式传入 `&FvMesh`。

pub mod io;
pub mod registry;
pub mod surface_field;
pub mod value;
pub mod vol_field;

pub use io::{FieldRecord, PatchRecord};
pub use registry::{FieldRegistry, Registrable};
pub use surface_field::SurfaceField;
pub use value::{FieldValue, Gradient};
pub use vol_field::VolField;

use glam::{DMat3, DVec3};

/// 单元标量场
pub type VolScalarField = VolField<f64>;
/// 单元矢量场
pub type VolVectorField = VolField<DVec3>;
/// 单元张量场
pub type VolTensorField = VolField<DMat3>;
/// 面标量场（通量）
pub type SurfaceScalarField = SurfaceField<f64>;
/// 面矢量场
pub type SurfaceVectorField = SurfaceField<DVec3>;
