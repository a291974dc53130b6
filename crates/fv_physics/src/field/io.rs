// crates/fv_physics/src/field/io.rs

//! 场的文本记录
//!
//! 行式自描述格式：
//!
//! ```text
//! FvField 1
//! name T
//! class scalar
//! dimensions [0 0 0 1 0 0 0]
//! internalField 3
//! 1.0
//! 2.5
//! 3.0
//! patch left fixedValue 1
//! 0.0
//! patch right zeroGradient 1
//! 3.0
//! end
//! ```
//!
//! 标量一行一个数，矢量和张量写成 `(x y z)`（张量按行主序 9 个分量）。
//! 数值使用最短往返格式（极大极小值用指数形式），读回后逐位相等。

use super::value::FieldValue;
use super::vol_field::VolField;
use crate::boundary::{
    calculated_condition, check_patch_kind, BoundaryCondition, BoundaryConditions, PatchField, PatchGeometry,
};
use crate::registry::{ModelContext, ModelRegistry};
use fv_config::Dictionary;
use fv_foundation::dimension::DimensionSet;
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::{BoundaryPatch, FvMesh};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// 记录首行
pub const RECORD_HEADER: &str = "FvField 1";

/// 面片记录
#[derive(Debug, Clone, PartialEq)]
pub struct PatchRecord<T> {
    /// 面片名
    pub name: String,
    /// 边界条件类型名
    pub type_name: String,
    /// 面值
    pub values: Vec<T>,
}

/// 场记录
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord<T> {
    /// 场名
    pub name: String,
    /// 量纲
    pub dimensions: DimensionSet,
    /// 单元值
    pub internal: Vec<T>,
    /// 面片记录，按网格面片顺序
    pub patches: Vec<PatchRecord<T>>,
}

fn format_value<T: FieldValue>(value: &T) -> String {
    if T::N_COMPONENTS == 1 {
        format!("{:?}", value.component(0))
    } else {
        let parts: Vec<String> = (0..T::N_COMPONENTS)
            .map(|d| format!("{:?}", value.component(d)))
            .collect();
        format!("({})", parts.join(" "))
    }
}

fn parse_value<T: FieldValue>(line_no: usize, text: &str) -> FvResult<T> {
    let trimmed = text.trim();
    let inner = if T::N_COMPONENTS == 1 {
        trimmed
    } else {
        trimmed
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .ok_or_else(|| FvError::parse(line_no, format!("{} 值必须写成 (..): '{trimmed}'", T::CLASS_NAME)))?
    };
    let components = inner
        .split_whitespace()
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| FvError::parse(line_no, format!("无效数值 '{t}'")))
        })
        .collect::<FvResult<Vec<f64>>>()?;
    T::from_components(&components).ok_or_else(|| {
        FvError::parse(
            line_no,
            format!("{} 值需要 {} 个分量，读到 {}", T::CLASS_NAME, T::N_COMPONENTS, components.len()),
        )
    })
}

/// 逐行读取，行号从 1 开始
struct LineReader<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineReader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            pos: 0,
        }
    }

    fn next_line(&mut self) -> FvResult<(usize, &'a str)> {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos].trim();
            self.pos += 1;
            if !line.is_empty() {
                return Ok((self.pos, line));
            }
        }
        Err(FvError::parse(self.pos + 1, "记录意外结束"))
    }

    fn keyword(&mut self, keyword: &str) -> FvResult<(usize, &'a str)> {
        let (no, line) = self.next_line()?;
        match line.split_once(char::is_whitespace) {
            Some((kw, rest)) if kw == keyword => Ok((no, rest.trim())),
            None if line == keyword => Ok((no, "")),
            _ => Err(FvError::parse(no, format!("应为 '{keyword} ..'，读到 '{line}'"))),
        }
    }

    fn values<T: FieldValue>(&mut self, n: usize) -> FvResult<Vec<T>> {
        (0..n)
            .map(|_| {
                let (no, line) = self.next_line()?;
                parse_value(no, line)
            })
            .collect()
    }
}

fn parse_count(line_no: usize, text: &str) -> FvResult<usize> {
    text.trim()
        .parse()
        .map_err(|_| FvError::parse(line_no, format!("无效的数目 '{text}'")))
}

impl<T: FieldValue> FieldRecord<T> {
    /// 由场生成记录
    pub fn from_field(field: &VolField<T>, mesh: &FvMesh) -> Self {
        Self {
            name: field.name().to_string(),
            dimensions: field.dimensions(),
            internal: field.internal().to_vec(),
            patches: mesh
                .patches()
                .iter()
                .zip(field.boundary())
                .map(|(patch, pf)| PatchRecord {
                    name: patch.name.clone(),
                    type_name: pf.type_name().to_string(),
                    values: pf.values().to_vec(),
                })
                .collect(),
        }
    }

    /// 写出
    pub fn write_to<W: Write>(&self, mut writer: W) -> FvResult<()> {
        write!(writer, "{self}")?;
        writer.flush()?;
        Ok(())
    }

    /// 从文本解析
    pub fn parse(text: &str) -> FvResult<Self> {
        let mut reader = LineReader::new(text);
        let (no, header) = reader.next_line()?;
        if header != RECORD_HEADER {
            return Err(FvError::parse(no, format!("记录首行应为 '{RECORD_HEADER}'，读到 '{header}'")));
        }

        let (_, name) = reader.keyword("name")?;
        let (no, class) = reader.keyword("class")?;
        if class != T::CLASS_NAME {
            return Err(FvError::parse(
                no,
                format!("记录是 {class} 场，期望 {} 场", T::CLASS_NAME),
            ));
        }
        let (no, dims) = reader.keyword("dimensions")?;
        let dimensions: DimensionSet = dims
            .parse()
            .map_err(|e: FvError| FvError::parse(no, e.to_string()))?;
        let (no, count) = reader.keyword("internalField")?;
        let internal = reader.values(parse_count(no, count)?)?;

        let mut patches = Vec::new();
        loop {
            let (no, line) = reader.next_line()?;
            if line == "end" {
                break;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            let [kw, patch_name, type_name, count] = parts.as_slice() else {
                return Err(FvError::parse(no, format!("应为 'patch <名称> <类型> <面数>' 或 'end'，读到 '{line}'")));
            };
            if *kw != "patch" {
                return Err(FvError::parse(no, format!("未知记录项 '{kw}'")));
            }
            let values = reader.values(parse_count(no, count)?)?;
            patches.push(PatchRecord {
                name: patch_name.to_string(),
                type_name: type_name.to_string(),
                values,
            });
        }

        Ok(Self {
            name: name.to_string(),
            dimensions,
            internal,
            patches,
        })
    }

    /// 写入文件
    pub fn write_file(&self, path: impl AsRef<Path>) -> FvResult<()> {
        let path = path.as_ref();
        let file = fs::File::create(path)
            .map_err(|e| FvError::io(format!("无法创建 {}: {e}", path.display())))?;
        self.write_to(BufWriter::new(file))
    }

    /// 从文件读取
    pub fn read_file(path: impl AsRef<Path>) -> FvResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| FvError::io(format!("无法读取 {}: {e}", path.display())))?;
        Self::parse(&text).map_err(|e| match e {
            FvError::Parse { line, message, .. } => FvError::parse_file(path, line, message),
            other => other,
        })
    }
}

impl<T: FieldValue> fmt::Display for FieldRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RECORD_HEADER}")?;
        writeln!(f, "name {}", self.name)?;
        writeln!(f, "class {}", T::CLASS_NAME)?;
        writeln!(f, "dimensions {}", self.dimensions)?;
        writeln!(f, "internalField {}", self.internal.len())?;
        for v in &self.internal {
            writeln!(f, "{}", format_value(v))?;
        }
        for patch in &self.patches {
            writeln!(f, "patch {} {} {}", patch.name, patch.type_name, patch.values.len())?;
            for v in &patch.values {
                writeln!(f, "{}", format_value(v))?;
            }
        }
        writeln!(f, "end")
    }
}

/// 按记录的类型名重建边界条件，失败时退为 calculated
fn restore_condition<T: FieldValue>(
    mesh: &FvMesh,
    patch: &BoundaryPatch,
    record: &PatchRecord<T>,
    registry: Option<&ModelRegistry>,
) -> FvResult<Box<dyn BoundaryCondition<T>>> {
    let Some(registry) = registry.filter(|r| r.contains::<BoundaryConditions<T>>(&record.type_name)) else {
        return Ok(calculated_condition(patch));
    };
    let mut dict = Dictionary::new(format!("{}.{}", record.name, patch.name));
    dict.set("type", &record.type_name)?;
    dict.set(
        "values",
        Value::Array(record.values.iter().map(FieldValue::to_json).collect()),
    )?;
    let ctx = ModelContext::for_patch(mesh, patch.index);
    match registry.new_model::<BoundaryConditions<T>>(&record.type_name, &dict, &ctx) {
        Ok(condition) => Ok(condition),
        Err(e) => {
            log::warn!(
                "面片 {} 的 {} 条件无法仅由面值重建（{e}），按 calculated 读入",
                patch.name,
                record.type_name
            );
            Ok(calculated_condition(patch))
        }
    }
}

impl<T: FieldValue> VolField<T> {
    /// 生成记录
    pub fn to_record(&self, mesh: &FvMesh) -> FieldRecord<T> {
        FieldRecord::from_field(self, mesh)
    }

    /// 由记录重建
    ///
    /// 内部值和面值按记录恢复。边界条件类型在注册表中存在且能仅由面值构造时恢复原类型，
    /// 否则为 calculated（空面片、耦合面片保持各自类型）。
    pub fn from_record(record: &FieldRecord<T>, mesh: &FvMesh, registry: Option<&ModelRegistry>) -> FvResult<Self> {
        if let Some(extra) = record
            .patches
            .iter()
            .find(|p| mesh.patch_index(&p.name).is_none())
        {
            return Err(FvError::unknown_patch(&record.name, &extra.name));
        }

        let mut boundary = Vec::with_capacity(mesh.patches().len());
        for patch in mesh.patches() {
            let patch_record = record
                .patches
                .iter()
                .find(|p| p.name == patch.name)
                .ok_or_else(|| FvError::missing_key(&patch.name, &record.name))?;
            let geo = PatchGeometry::new(mesh, patch.index)?;
            let condition = restore_condition(mesh, patch, patch_record, registry)?;
            check_patch_kind(patch, condition.as_ref())?;
            boundary.push(PatchField::new(&geo, condition, patch_record.values.clone())?);
        }
        VolField::new(record.name.clone(), mesh, record.dimensions, record.internal.clone(), boundary)
    }

    /// 写入文件
    pub fn write(&self, mesh: &FvMesh, path: impl AsRef<Path>) -> FvResult<()> {
        self.to_record(mesh).write_file(path)
    }

    /// 从文件读取
    pub fn read(path: impl AsRef<Path>, mesh: &FvMesh, registry: Option<&ModelRegistry>) -> FvResult<Self> {
        Self::from_record(&FieldRecord::read_file(path)?, mesh, registry)
    }
}
