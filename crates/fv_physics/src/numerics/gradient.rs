// crates/fv_physics/src/numerics/gradient.rs

//! Green-Gauss 梯度
//!
//! ```text
//! (∇φ)_P = (1/V_P) Σ_f S_f ⊗ φ_f
//! ```
//!
//! 内部面取线性插值，边界面取面片场的面值，空面片不参与。
//! 梯度场的边界值用面片法向梯度修正：
//!
//! ```text
//! (∇φ)_b = (∇φ)_P + n ⊗ (snGrad_b - n·(∇φ)_P)
//! ```

use super::interpolation::interpolate;
use crate::boundary::PatchGeometry;
use crate::field::{FieldValue, Gradient, SurfaceField, VolField};
use fv_foundation::dimension::DimensionSet;
use fv_foundation::error::FvResult;
use fv_mesh::FvMesh;

/// 由面值做 Gauss 积分，返回每个单元的 `Σ S_f ⊗ φ_f / V`
pub fn gauss_grad<T: Gradient>(mesh: &FvMesh, face_values: &SurfaceField<T>) -> Vec<T::Grad> {
    let own = mesh.owner_addr();
    let nei = mesh.neighbour_addr();
    let sf = mesh.sf();
    let mut grad = vec![T::Grad::ZERO; mesh.n_cells()];

    for (f, &vf) in face_values.internal().iter().enumerate() {
        let flux = T::outer(sf[f], vf);
        grad[own[f]] = grad[own[f]] + flux;
        grad[nei[f]] = grad[nei[f]] - flux;
    }

    for patch in mesh.patches().iter().filter(|p| !p.is_empty_kind()) {
        let values = face_values.boundary_values(patch.index);
        for (i, face) in patch.faces().enumerate() {
            let o = own[face];
            grad[o] = grad[o] + T::outer(sf[face], values[i]);
        }
    }

    for (g, &v) in grad.iter_mut().zip(mesh.v()) {
        *g = *g * (1.0 / v);
    }
    grad
}

/// 单元场的 Green-Gauss 梯度
pub fn green_gauss<T: Gradient>(mesh: &FvMesh, field: &VolField<T>) -> FvResult<VolField<T::Grad>> {
    let face_values = interpolate(mesh, field)?;
    let internal = gauss_grad(mesh, &face_values);

    let mut boundary = Vec::with_capacity(mesh.patches().len());
    for (patch, pf) in mesh.patches().iter().zip(field.boundary()) {
        let geo = PatchGeometry::new(mesh, patch.index)?;
        let face_cells = geo.face_cells();
        let values = if patch.is_empty_kind() {
            face_cells.iter().map(|&c| internal[c]).collect()
        } else {
            let sn_grad = pf.sn_grad(&geo, field.internal());
            face_cells
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    let n = geo.sf()[i] / geo.mag_sf()[i];
                    let g = internal[c];
                    g + T::outer(n, sn_grad[i] - T::directional(n, &g))
                })
                .collect()
        };
        boundary.push(values);
    }

    VolField::calculated(
        format!("grad({})", field.name()),
        mesh,
        field.dimensions() / DimensionSet::LENGTH,
        internal,
        boundary,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::StructuredBlock;
    use glam::{DMat3, DVec3};

    fn linear_field(mesh: &FvMesh) -> VolField<f64> {
        let values: Vec<f64> = mesh.c().iter().map(|c| 2.0 * c.x + 3.0 * c.y).collect();
        let mut field = VolField::from_values("T", mesh, DimensionSet::TEMPERATURE, values).unwrap();
        for name in ["left", "right", "bottom", "top"] {
            let patch = mesh.patch_index(name).unwrap();
            let cf = mesh.cf();
            let vals: Vec<f64> = mesh.patches()[patch]
                .faces()
                .map(|f| 2.0 * cf[f].x + 3.0 * cf[f].y)
                .collect();
            field
                .set_boundary_condition(mesh, name, Box::new(crate::boundary::FixedValue), vals)
                .unwrap();
        }
        field
    }

    #[test]
    fn test_uniform_field_has_zero_gradient() {
        let mesh = StructuredBlock::uniform([3, 2, 2], [1.0, 1.0, 1.0])
            .graded_x(2.0)
            .distorted(0.1)
            .build()
            .unwrap();
        let u = VolField::uniform("U", &mesh, DimensionSet::VELOCITY, DVec3::new(1.0, -2.0, 0.5)).unwrap();
        let grad = green_gauss(&mesh, &u).unwrap();
        for g in grad.internal() {
            assert!(g.abs_diff_eq(DMat3::ZERO, 1e-10), "{g:?}");
        }
        assert_eq!(grad.dimensions(), DimensionSet::VELOCITY / DimensionSet::LENGTH);
    }

    #[test]
    fn test_linear_field_exact_on_uniform_mesh() {
        let mesh = StructuredBlock::plane(4, 3, 1.0, 1.0).build().unwrap();
        let t = linear_field(&mesh);
        let grad = green_gauss(&mesh, &t).unwrap();
        for g in grad.internal() {
            assert!((g.x - 2.0).abs() < 1e-10);
            assert!((g.y - 3.0).abs() < 1e-10);
            assert!(g.z.abs() < 1e-10);
        }
        assert_eq!(grad.name(), "grad(T)");
        // 边界梯度带法向修正，固定值面片上仍为精确值
        let left = mesh.patch_index("left").unwrap();
        for g in grad.boundary()[left].values() {
            assert!((g.x - 2.0).abs() < 1e-10);
        }
    }
}
