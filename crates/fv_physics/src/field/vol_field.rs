// crates/fv_physics/src/field/vol_field.rs

//! 单元中心场
//!
//! [`VolField`] 保存每个单元一个值、每个面片一个 [`PatchField`]，
//! 以及可选的旧时间层（`old`、`old_old`）和上一迭代值（场松弛用）。
//!
//! # 算术
//!
//! 所有算术先检查量纲：加减要求量纲相同，乘除按量纲代数组合。
//! 结果的边界条件为 `calculated`，面值是对操作数面值做同样运算的结果；
//! 空面片和耦合面片保持各自的类型。
//!
//! ```
//! use fv_foundation::DimensionSet;
//! use fv_mesh::StructuredBlock;
//! use fv_physics::field::VolScalarField;
//!
//! let mesh = StructuredBlock::line(4, 1.0).build().unwrap();
//! let p = VolScalarField::uniform("p", &mesh, DimensionSet::PRESSURE, 1.0).unwrap();
//! let u = VolScalarField::uniform("u", &mesh, DimensionSet::VELOCITY, 2.0).unwrap();
//! assert!(p.try_add(&u).is_err());
//! let pu = (&p * &u).unwrap();
//! assert_eq!(pu.dimensions(), DimensionSet::PRESSURE * DimensionSet::VELOCITY);
//! ```

use super::surface_field::SurfaceField;
use super::value::{tensor, FieldValue};
use crate::boundary::{
    check_patch_kind, default_condition, lookup_patch_values, new_patch_field, BoundaryCondition,
    Calculated, Empty, FixedGradient, FixedValue, PatchField, PatchGeometry, Processor,
};
use crate::registry::ModelRegistry;
use fv_config::Dictionary;
use fv_foundation::dimension::{DimensionSet, DimensionedScalar};
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;
use glam::{DMat3, DVec3};
use std::ops::{Add, Div, Mul, Sub};

/// 单元中心场
#[derive(Debug, Clone)]
pub struct VolField<T: FieldValue> {
    name: String,
    dimensions: DimensionSet,
    internal: Vec<T>,
    boundary: Vec<PatchField<T>>,
    old: Option<Vec<T>>,
    old_old: Option<Vec<T>>,
    prev_iter: Option<Vec<T>>,
}

/// 运算结果的边界条件
fn derived_condition<T: FieldValue, U: FieldValue>(pf: &PatchField<T>) -> Box<dyn BoundaryCondition<U>> {
    if !pf.contributes() {
        Box::new(Empty)
    } else if pf.is_coupled() {
        Box::new(Processor::new(vec![U::ZERO; pf.len()]))
    } else {
        Box::new(Calculated)
    }
}

/// 面片类型默认条件，面值由内部场计算
fn default_patch_field<T: FieldValue>(mesh: &FvMesh, patch: usize, internal: &[T]) -> FvResult<PatchField<T>> {
    let geo = PatchGeometry::new(mesh, patch)?;
    let mut pf = PatchField::new(&geo, default_condition(geo.patch()), geo.internal_values(internal))?;
    pf.evaluate(&geo, internal)?;
    Ok(pf)
}

impl<T: FieldValue> VolField<T> {
    // ========================================================================
    // 构造
    // ========================================================================

    /// 由内部值和面片场构造，检查尺寸与面片顺序
    pub fn new(
        name: impl Into<String>,
        mesh: &FvMesh,
        dimensions: DimensionSet,
        internal: Vec<T>,
        boundary: Vec<PatchField<T>>,
    ) -> FvResult<Self> {
        let name = name.into();
        FvError::check_size(&name, mesh.n_cells(), internal.len())?;
        FvError::check_size(&format!("{name}.boundaryField"), mesh.patches().len(), boundary.len())?;
        for (patch, pf) in mesh.patches().iter().zip(&boundary) {
            if pf.patch_index() != patch.index {
                return Err(FvError::mesh_consistency(format!(
                    "{name} 的第 {} 个面片场属于面片 {}",
                    patch.index,
                    pf.patch_index()
                )));
            }
            FvError::check_size(&format!("{name}.{}", patch.name), patch.size, pf.len())?;
            check_patch_kind(patch, pf.condition())?;
        }
        Ok(Self {
            name,
            dimensions,
            internal,
            boundary,
            old: None,
            old_old: None,
            prev_iter: None,
        })
    }

    /// 均匀场，边界取面片类型的默认条件（zeroGradient/empty/processor）
    pub fn uniform(name: impl Into<String>, mesh: &FvMesh, dimensions: DimensionSet, value: T) -> FvResult<Self> {
        Self::from_values(name, mesh, dimensions, vec![value; mesh.n_cells()])
    }

    /// 由内部值构造，边界取默认条件
    pub fn from_values(
        name: impl Into<String>,
        mesh: &FvMesh,
        dimensions: DimensionSet,
        internal: Vec<T>,
    ) -> FvResult<Self> {
        let name = name.into();
        FvError::check_size(&name, mesh.n_cells(), internal.len())?;
        let boundary = (0..mesh.patches().len())
            .map(|p| default_patch_field(mesh, p, &internal))
            .collect::<FvResult<Vec<_>>>()?;
        Self::new(name, mesh, dimensions, internal, boundary)
    }

    /// 由内部值和各面片面值构造，边界为 calculated
    pub fn calculated(
        name: impl Into<String>,
        mesh: &FvMesh,
        dimensions: DimensionSet,
        internal: Vec<T>,
        boundary_values: Vec<Vec<T>>,
    ) -> FvResult<Self> {
        let name = name.into();
        FvError::check_size(&format!("{name}.boundaryField"), mesh.patches().len(), boundary_values.len())?;
        let boundary = mesh
            .patches()
            .iter()
            .zip(boundary_values)
            .map(|(patch, values)| {
                let geo = PatchGeometry::new(mesh, patch.index)?;
                let condition: Box<dyn BoundaryCondition<T>> = match patch.kind {
                    fv_mesh::PatchKind::Empty => Box::new(Empty),
                    kind if kind.is_coupled() => Box::new(Processor::new(vec![T::ZERO; patch.size])),
                    _ => Box::new(Calculated),
                };
                PatchField::new(&geo, condition, values)
            })
            .collect::<FvResult<Vec<_>>>()?;
        Self::new(name, mesh, dimensions, internal, boundary)
    }

    /// 从配置字典构造
    ///
    /// ```text
    /// {
    ///   "dimensions": "[0 1 -1 0 0 0 0]",        // 可选，须与期望一致
    ///   "internalField": [0, 0, 0],               // 均匀值或逐单元列表
    ///   "boundaryField": {
    ///     "inlet":  { "type": "fixedValue", "value": [1, 0, 0] },
    ///     "outlet": { "type": "zeroGradient" }
    ///   }
    /// }
    /// ```
    ///
    /// 空面片和耦合面片可以省略，其余面片必须给出；未知面片名报错。
    pub fn from_dict(
        name: impl Into<String>,
        mesh: &FvMesh,
        dimensions: DimensionSet,
        dict: &Dictionary,
        registry: &ModelRegistry,
    ) -> FvResult<Self> {
        let name = name.into();
        dict.check_keys(&["dimensions", "internalField", "boundaryField"])?;
        if let Some(text) = dict.lookup_optional::<String>("dimensions")? {
            let declared: DimensionSet = text.parse()?;
            declared.check_same(&dimensions, &format!("读取场 {name}"))?;
        }

        let internal = lookup_patch_values::<T>(dict, "internalField", mesh.n_cells())?
            .ok_or_else(|| FvError::missing_key("internalField", dict.scope()))?;

        let boundary_dict = dict.sub_dict_or_empty("boundaryField")?;
        if let Some(unknown) = boundary_dict.keys().find(|k| mesh.patch_index(k).is_none()) {
            return Err(FvError::unknown_patch(&name, unknown));
        }

        let mut boundary = Vec::with_capacity(mesh.patches().len());
        for patch in mesh.patches() {
            let pf = if boundary_dict.found(&patch.name) {
                let sub = boundary_dict.sub_dict(&patch.name)?;
                new_patch_field(registry, mesh, patch.index, &sub, &internal)?
            } else if patch.is_empty_kind() || patch.kind.is_coupled() {
                default_patch_field(mesh, patch.index, &internal)?
            } else {
                return Err(FvError::missing_key(&patch.name, boundary_dict.scope()));
            };
            boundary.push(pf);
        }
        Self::new(name, mesh, dimensions, internal, boundary)
    }

    // ========================================================================
    // 访问
    // ========================================================================

    /// 名称
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 重命名
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// 重命名后返回
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.rename(name);
        self
    }

    /// 量纲
    #[inline]
    pub fn dimensions(&self) -> DimensionSet {
        self.dimensions
    }

    /// 单元数
    #[inline]
    pub fn len(&self) -> usize {
        self.internal.len()
    }

    /// 是否没有单元
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.internal.is_empty()
    }

    /// 单元值
    #[inline]
    pub fn value(&self, cell: usize) -> T {
        self.internal[cell]
    }

    /// 内部场
    #[inline]
    pub fn internal(&self) -> &[T] {
        &self.internal
    }

    /// 可变内部场
    #[inline]
    pub fn internal_mut(&mut self) -> &mut [T] {
        &mut self.internal
    }

    /// 替换内部场
    pub fn set_internal(&mut self, values: Vec<T>) -> FvResult<()> {
        FvError::check_size(&self.name, self.internal.len(), values.len())?;
        self.internal = values;
        Ok(())
    }

    /// 所有面片场
    #[inline]
    pub fn boundary(&self) -> &[PatchField<T>] {
        &self.boundary
    }

    /// 面片场
    pub fn boundary_field(&self, patch: usize) -> FvResult<&PatchField<T>> {
        self.boundary
            .get(patch)
            .ok_or_else(|| FvError::unknown_patch(&self.name, patch.to_string()))
    }

    /// 可变面片场
    pub fn boundary_field_mut(&mut self, patch: usize) -> FvResult<&mut PatchField<T>> {
        let name = &self.name;
        self.boundary
            .get_mut(patch)
            .ok_or_else(|| FvError::unknown_patch(name, patch.to_string()))
    }

    /// 按面片名取面片场
    pub fn boundary_field_by_name(&self, mesh: &FvMesh, patch: &str) -> FvResult<&PatchField<T>> {
        let index = mesh
            .patch_index(patch)
            .ok_or_else(|| FvError::unknown_patch(&self.name, patch))?;
        self.boundary_field(index)
    }

    /// 面片局部面的边界值
    pub fn boundary_value(&self, patch: usize, face: usize) -> FvResult<T> {
        let pf = self.boundary_field(patch)?;
        pf.values().get(face).copied().ok_or_else(|| {
            FvError::invalid_input(format!(
                "{} 的面片 {} 只有 {} 个面，无法访问第 {} 个",
                self.name,
                patch,
                pf.len(),
                face
            ))
        })
    }

    // ========================================================================
    // 边界条件
    // ========================================================================

    /// 替换面片的边界条件并重新计算面值
    pub fn set_boundary_condition(
        &mut self,
        mesh: &FvMesh,
        patch: &str,
        condition: Box<dyn BoundaryCondition<T>>,
        values: Vec<T>,
    ) -> FvResult<()> {
        let index = mesh
            .patch_index(patch)
            .ok_or_else(|| FvError::unknown_patch(&self.name, patch))?;
        let geo = PatchGeometry::new(mesh, index)?;
        check_patch_kind(geo.patch(), condition.as_ref())?;
        let mut pf = PatchField::new(&geo, condition, values)?;
        pf.evaluate(&geo, &self.internal)?;
        self.boundary[index] = pf;
        Ok(())
    }

    /// 面片设为均匀给定值
    pub fn fix_value(&mut self, mesh: &FvMesh, patch: &str, value: T) -> FvResult<()> {
        let size = self.patch_size(mesh, patch)?;
        self.set_boundary_condition(mesh, patch, Box::new(FixedValue), vec![value; size])
    }

    /// 面片设为均匀给定梯度
    pub fn fix_gradient(&mut self, mesh: &FvMesh, patch: &str, gradient: T) -> FvResult<()> {
        let size = self.patch_size(mesh, patch)?;
        self.set_boundary_condition(
            mesh,
            patch,
            Box::new(FixedGradient::new(vec![gradient; size])),
            vec![T::ZERO; size],
        )
    }

    fn patch_size(&self, mesh: &FvMesh, patch: &str) -> FvResult<usize> {
        mesh.patch_index(patch)
            .map(|i| mesh.patches()[i].size)
            .ok_or_else(|| FvError::unknown_patch(&self.name, patch))
    }

    /// 按通量更新所有面片的系数（每个外迭代一次，已更新的面片跳过）
    pub fn update_boundary_coeffs(&mut self, mesh: &FvMesh, flux: Option<&SurfaceField<f64>>) -> FvResult<()> {
        for pf in &mut self.boundary {
            let geo = PatchGeometry::new(mesh, pf.patch_index())?;
            let patch_flux = flux.map(|phi| phi.boundary_values(pf.patch_index()));
            pf.update_coeffs(&geo, patch_flux)?;
        }
        Ok(())
    }

    /// 由内部场重新计算所有面片面值
    pub fn correct_boundary_conditions(&mut self, mesh: &FvMesh) -> FvResult<()> {
        for pf in &mut self.boundary {
            let geo = PatchGeometry::new(mesh, pf.patch_index())?;
            pf.evaluate(&geo, &self.internal)?;
        }
        Ok(())
    }

    /// 写入耦合面片的邻侧单元值，并按新值重算该面片面值
    pub fn set_neighbour_values(&mut self, mesh: &FvMesh, patch: usize, values: &[T]) -> FvResult<()> {
        let geo = PatchGeometry::new(mesh, patch)?;
        let pf = self
            .boundary
            .get_mut(patch)
            .ok_or_else(|| FvError::unknown_patch(&self.name, patch.to_string()))?;
        pf.set_neighbour_values(&geo, &self.internal, values)
    }

    /// 没有任何面片固定面值时，压力类方程需要参考点
    pub fn needs_reference(&self) -> bool {
        !self.boundary.iter().any(|pf| pf.condition().fixes_value())
    }

    // ========================================================================
    // 时间层与迭代层
    // ========================================================================

    /// 保存当前值为旧时间层，原旧时间层移至 `old_old`
    pub fn store_old_time(&mut self) {
        self.old_old = self.old.replace(self.internal.clone());
    }

    /// 旧时间层
    #[inline]
    pub fn old_time(&self) -> Option<&[T]> {
        self.old.as_deref()
    }

    /// 旧旧时间层
    #[inline]
    pub fn old_old_time(&self) -> Option<&[T]> {
        self.old_old.as_deref()
    }

    /// 已保存的时间层数
    pub fn n_old_times(&self) -> usize {
        usize::from(self.old.is_some()) + usize::from(self.old_old.is_some())
    }

    /// 保存当前值为上一迭代值
    pub fn store_prev_iter(&mut self) {
        self.prev_iter = Some(self.internal.clone());
    }

    /// 上一迭代值
    #[inline]
    pub fn prev_iter(&self) -> Option<&[T]> {
        self.prev_iter.as_deref()
    }

    /// 场松弛 `ψ = ψ_prev + α(ψ - ψ_prev)`，`α ∈ (0, 1]`
    ///
    /// 只改变内部场，调用方随后修正边界。
    pub fn relax(&mut self, alpha: f64) -> FvResult<()> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(FvError::invalid_config(
                format!("relaxationFactors.fields.{}", self.name),
                alpha,
                "松弛因子必须在 (0, 1] 内",
            ));
        }
        let prev = self
            .prev_iter
            .as_ref()
            .ok_or_else(|| FvError::invalid_input(format!("{} 没有保存上一迭代值，无法松弛", self.name)))?;
        for (v, &p) in self.internal.iter_mut().zip(prev) {
            *v = p + (*v - p) * alpha;
        }
        Ok(())
    }

    // ========================================================================
    // 逐点运算
    // ========================================================================

    /// 逐点映射（内部场与面片面值）
    pub fn map<V: FieldValue>(
        &self,
        name: impl Into<String>,
        dimensions: DimensionSet,
        f: impl Fn(T) -> V,
    ) -> VolField<V> {
        VolField {
            name: name.into(),
            dimensions,
            internal: self.internal.iter().map(|&v| f(v)).collect(),
            boundary: self
                .boundary
                .iter()
                .map(|pf| {
                    let values = pf.values().iter().map(|&v| f(v)).collect();
                    PatchField::from_parts(pf.patch_index(), derived_condition(pf), values)
                })
                .collect(),
            old: None,
            old_old: None,
            prev_iter: None,
        }
    }

    /// 两个场逐点组合
    pub fn zip_with<U: FieldValue, V: FieldValue>(
        &self,
        other: &VolField<U>,
        name: impl Into<String>,
        dimensions: DimensionSet,
        f: impl Fn(T, U) -> V,
    ) -> FvResult<VolField<V>> {
        FvError::check_size(&other.name, self.internal.len(), other.internal.len())?;
        FvError::check_size(&other.name, self.boundary.len(), other.boundary.len())?;
        let boundary = self
            .boundary
            .iter()
            .zip(&other.boundary)
            .map(|(a, b)| {
                FvError::check_size(&other.name, a.len(), b.len())?;
                let values = a.values().iter().zip(b.values()).map(|(&x, &y)| f(x, y)).collect();
                Ok(PatchField::from_parts(a.patch_index(), derived_condition(a), values))
            })
            .collect::<FvResult<Vec<_>>>()?;
        Ok(VolField {
            name: name.into(),
            dimensions,
            internal: self
                .internal
                .iter()
                .zip(&other.internal)
                .map(|(&x, &y)| f(x, y))
                .collect(),
            boundary,
            old: None,
            old_old: None,
            prev_iter: None,
        })
    }

    /// 加法，量纲必须相同
    pub fn try_add(&self, other: &Self) -> FvResult<Self> {
        let name = format!("({}+{})", self.name, other.name);
        let dims = self.dimensions.check_same(&other.dimensions, &name)?;
        self.zip_with(other, name, dims, |a, b| a + b)
    }

    /// 减法，量纲必须相同
    pub fn try_sub(&self, other: &Self) -> FvResult<Self> {
        let name = format!("({}-{})", self.name, other.name);
        let dims = self.dimensions.check_same(&other.dimensions, &name)?;
        self.zip_with(other, name, dims, |a, b| a - b)
    }

    /// 乘标量场
    pub fn mul_scalar_field(&self, other: &VolField<f64>) -> FvResult<Self> {
        let name = format!("({}*{})", self.name, other.name);
        self.zip_with(other, name, self.dimensions * other.dimensions, |a, b| a * b)
    }

    /// 除以标量场
    pub fn div_scalar_field(&self, other: &VolField<f64>) -> FvResult<Self> {
        let name = format!("({}|{})", self.name, other.name);
        self.zip_with(other, name, self.dimensions / other.dimensions, |a, b| a * (1.0 / b))
    }

    /// 乘带量纲常数
    pub fn scale(&self, factor: &DimensionedScalar) -> Self {
        self.map(
            format!("({}*{})", factor.name, self.name),
            factor.dimensions * self.dimensions,
            |v| v * factor.value,
        )
    }

    /// 取负
    pub fn negate(&self) -> Self {
        self.map(format!("-{}", self.name), self.dimensions, |v| v * -1.0)
    }

    /// 模
    pub fn mag(&self) -> VolField<f64> {
        self.map(format!("mag({})", self.name), self.dimensions, |v| v.mag())
    }

    /// 模的平方
    pub fn mag_sqr(&self) -> VolField<f64> {
        self.map(
            format!("magSqr({})", self.name),
            self.dimensions * self.dimensions,
            |v| v.mag_sqr(),
        )
    }

    /// 第 `d` 个分量
    pub fn component(&self, d: usize) -> FvResult<VolField<f64>> {
        if d >= T::N_COMPONENTS {
            return Err(FvError::invalid_input(format!(
                "{} 是 {} 场，没有第 {} 个分量",
                self.name,
                T::CLASS_NAME,
                d
            )));
        }
        Ok(self.map(format!("{}.component({})", self.name, d), self.dimensions, |v| v.component(d)))
    }

    /// 体积加权平均
    pub fn weighted_average(&self, mesh: &FvMesh) -> T {
        let total = mesh.total_volume();
        let sum = self
            .internal
            .iter()
            .zip(mesh.v())
            .fold(T::ZERO, |acc, (&x, &v)| acc + x * v);
        if total > 0.0 {
            sum * (1.0 / total)
        } else {
            T::ZERO
        }
    }

    /// 所有单元值之和
    pub fn sum(&self) -> T {
        self.internal.iter().fold(T::ZERO, |acc, &x| acc + x)
    }

    /// 逐分量最小值
    pub fn cmpt_min(&self) -> Option<T> {
        self.internal.iter().copied().reduce(T::cmpt_min)
    }

    /// 逐分量最大值
    pub fn cmpt_max(&self) -> Option<T> {
        self.internal.iter().copied().reduce(T::cmpt_max)
    }
}

// ============================================================
// 矢量与张量专用运算
// ============================================================

impl VolField<DVec3> {
    /// 点积
    pub fn dot(&self, other: &Self) -> FvResult<VolField<f64>> {
        let name = format!("({}&{})", self.name, other.name);
        self.zip_with(other, name, self.dimensions * other.dimensions, |a, b| a.dot(b))
    }

    /// 叉积
    pub fn cross(&self, other: &Self) -> FvResult<Self> {
        let name = format!("({}^{})", self.name, other.name);
        self.zip_with(other, name, self.dimensions * other.dimensions, |a, b| a.cross(b))
    }
}

impl VolField<DMat3> {
    /// 转置
    pub fn transpose(&self) -> Self {
        self.map(format!("{}.T()", self.name), self.dimensions, |t| t.transpose())
    }

    /// 对称部分
    pub fn symm(&self) -> Self {
        self.map(format!("symm({})", self.name), self.dimensions, |t| tensor::symm(&t))
    }

    /// 迹
    pub fn trace(&self) -> VolField<f64> {
        self.map(format!("tr({})", self.name), self.dimensions, |t| tensor::trace(&t))
    }

    /// `T - (2/3)·tr(T)·I`
    pub fn dev2(&self) -> Self {
        self.map(format!("dev2({})", self.name), self.dimensions, |t| tensor::dev2(&t))
    }
}

// ============================================================
// 运算符
// ============================================================

impl<T: FieldValue> Add for &VolField<T> {
    type Output = FvResult<VolField<T>>;

    fn add(self, rhs: Self) -> Self::Output {
        self.try_add(rhs)
    }
}

impl<T: FieldValue> Sub for &VolField<T> {
    type Output = FvResult<VolField<T>>;

    fn sub(self, rhs: Self) -> Self::Output {
        self.try_sub(rhs)
    }
}

impl<T: FieldValue> Mul<&VolField<f64>> for &VolField<T> {
    type Output = FvResult<VolField<T>>;

    fn mul(self, rhs: &VolField<f64>) -> Self::Output {
        self.mul_scalar_field(rhs)
    }
}

impl<T: FieldValue> Div<&VolField<f64>> for &VolField<T> {
    type Output = FvResult<VolField<T>>;

    fn div(self, rhs: &VolField<f64>) -> Self::Output {
        self.div_scalar_field(rhs)
    }
}
