// crates/fv_config/src/schemes.rs

//! 离散格式选择 (fvSchemes)
//!
//! 每一类算子有一张 "项名 → 格式文本" 表，先查精确项名（如 `div(phi,U)`），
//! 再退回 `default`。`default` 为 `none` 时缺失项名是配置错误。
//!
//! ```text
//! {
//!   "ddtSchemes":       { "default": "Euler" },
//!   "divSchemes":       { "default": "none", "div(phi,U)": "Gauss limitedLinear 1" },
//!   "laplacianSchemes": { "default": "Gauss linear corrected" },
//!   "snGradSchemes":    { "default": "corrected" }
//! }
//! ```
//!
//! 时间格式是进程级配置，启动时读取一次（[`FvSchemes::ddt_scheme`]）。

use crate::dictionary::Dictionary;
use fv_foundation::error::{FvError, FvResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 格式表中表示 "没有默认值" 的文本
const NONE_ENTRY: &str = "none";

// ============================================================================
// 时间格式
// ============================================================================

/// 时间导数格式
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DdtScheme {
    /// 稳态，时间项为零
    SteadyState,
    /// 一阶隐式欧拉
    #[default]
    Euler,
    /// 二阶后向差分（变步长）
    Backward,
    /// `psi·backward + (1-psi)·Euler`，`psi ∈ [0, 1]`
    Blended(f64),
}

impl DdtScheme {
    /// 格式名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SteadyState => "steadyState",
            Self::Euler => "Euler",
            Self::Backward => "backward",
            Self::Blended(_) => "blended",
        }
    }

    /// 是否需要前两个时间层
    pub fn needs_old_old(&self) -> bool {
        matches!(self, Self::Backward | Self::Blended(_))
    }
}

impl fmt::Display for DdtScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blended(psi) => write!(f, "blended {psi}"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for DdtScheme {
    type Err = FvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        match tokens.as_slice() {
            ["steadyState"] => Ok(Self::SteadyState),
            ["Euler"] => Ok(Self::Euler),
            ["backward"] => Ok(Self::Backward),
            ["blended", psi] => {
                let psi = parse_coefficient("ddtSchemes", s, psi)?;
                Ok(Self::Blended(psi))
            }
            _ => Err(FvError::unknown_model(
                "ddtScheme",
                s,
                vec![
                    "steadyState".into(),
                    "Euler".into(),
                    "backward".into(),
                    "blended".into(),
                ],
            )),
        }
    }
}

// ============================================================================
// 对流插值格式
// ============================================================================

/// 对流项面插值格式
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ConvectionScheme {
    /// 一阶迎风
    #[default]
    Upwind,
    /// 线性（中心）插值
    Linear,
    /// 迎风加单元梯度的延迟修正
    LinearUpwind,
    /// Sweby 型限制线性格式，系数 `k ∈ [0, 1]`
    LimitedLinear(f64),
    /// van Leer 限制器
    VanLeer,
    /// Minmod 限制器
    Minmod,
    /// Roe SuperBee 限制器
    SuperBee,
}

impl ConvectionScheme {
    /// 格式名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upwind => "upwind",
            Self::Linear => "linear",
            Self::LinearUpwind => "linearUpwind",
            Self::LimitedLinear(_) => "limitedLinear",
            Self::VanLeer => "vanLeer",
            Self::Minmod => "Minmod",
            Self::SuperBee => "SuperBee",
        }
    }

    /// 是否为 TVD 限制格式
    pub fn is_limited(&self) -> bool {
        matches!(
            self,
            Self::LimitedLinear(_) | Self::VanLeer | Self::Minmod | Self::SuperBee
        )
    }

    /// 所有可用格式名（已排序）
    pub fn valid_names() -> Vec<String> {
        let mut names: Vec<String> = [
            "upwind",
            "linear",
            "linearUpwind",
            "limitedLinear",
            "vanLeer",
            "Minmod",
            "SuperBee",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        names.sort();
        names
    }
}

impl fmt::Display for ConvectionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LimitedLinear(k) => write!(f, "limitedLinear {k}"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for ConvectionScheme {
    type Err = FvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        match tokens.as_slice() {
            ["upwind", ..] => Ok(Self::Upwind),
            ["linear"] => Ok(Self::Linear),
            // 梯度格式名仅作说明，梯度总是 Green-Gauss 线性
            ["linearUpwind", ..] => Ok(Self::LinearUpwind),
            ["limitedLinear", k] => {
                let k = parse_coefficient("divSchemes", s, k)?;
                Ok(Self::LimitedLinear(k))
            }
            ["limitedLinear"] => Err(FvError::missing_key("limitedLinear coefficient", s)),
            ["vanLeer"] => Ok(Self::VanLeer),
            ["Minmod"] | ["minmod"] => Ok(Self::Minmod),
            ["SuperBee"] | ["superBee"] => Ok(Self::SuperBee),
            _ => Err(FvError::unknown_model(
                "convectionScheme",
                s,
                Self::valid_names(),
            )),
        }
    }
}

/// 散度项格式：`[bounded] Gauss <interpolation>`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DivScheme {
    /// 减去 `div(phi)·psi`，用于稳态输运
    pub bounded: bool,
    /// 面插值格式
    pub interpolation: ConvectionScheme,
}

impl fmt::Display for DivScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bounded {
            write!(f, "bounded ")?;
        }
        write!(f, "Gauss {}", self.interpolation)
    }
}

impl FromStr for DivScheme {
    type Err = FvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim();
        let bounded = match rest.strip_prefix("bounded") {
            Some(r) => {
                rest = r.trim_start();
                true
            }
            None => false,
        };
        let rest = rest.strip_prefix("Gauss").map(str::trim_start).unwrap_or(rest);
        Ok(Self {
            bounded,
            interpolation: rest.parse()?,
        })
    }
}

// ============================================================================
// 面法向梯度格式
// ============================================================================

/// 面法向梯度（拉普拉斯项）格式
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SnGradScheme {
    /// 不做非正交修正
    Uncorrected,
    /// 显式非正交修正
    #[default]
    Corrected,
    /// 修正量限制为未修正部分的 `psi` 倍，`psi ∈ [0, 1]`
    Limited(f64),
}

impl SnGradScheme {
    /// 是否带非正交修正
    pub fn corrected(&self) -> bool {
        match self {
            Self::Uncorrected => false,
            Self::Corrected => true,
            Self::Limited(psi) => *psi > 0.0,
        }
    }
}

impl fmt::Display for SnGradScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uncorrected => f.write_str("uncorrected"),
            Self::Corrected => f.write_str("corrected"),
            Self::Limited(psi) => write!(f, "limited {psi}"),
        }
    }
}

impl FromStr for SnGradScheme {
    type Err = FvError;

    /// 接受 `corrected` 或 `Gauss linear corrected` 两种写法
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let tail = match tokens.as_slice() {
            ["Gauss", "linear", tail @ ..] => tail,
            all => all,
        };
        match tail {
            ["uncorrected"] | ["orthogonal"] => Ok(Self::Uncorrected),
            ["corrected"] => Ok(Self::Corrected),
            ["limited", psi] => {
                let psi = parse_coefficient("snGradSchemes", s, psi)?;
                Ok(Self::Limited(psi))
            }
            _ => Err(FvError::unknown_model(
                "snGradScheme",
                s,
                vec!["uncorrected".into(), "corrected".into(), "limited".into()],
            )),
        }
    }
}

fn parse_coefficient(section: &str, text: &str, token: &str) -> FvResult<f64> {
    let value: f64 = token
        .parse()
        .map_err(|_| FvError::invalid_config(section, text, "格式系数不是数值"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(FvError::invalid_config(section, text, "格式系数必须在 [0, 1] 内"));
    }
    Ok(value)
}

// ============================================================================
// 格式表
// ============================================================================

/// 一类算子的格式表
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemeTable(pub BTreeMap<String, String>);

impl SchemeTable {
    /// 只含默认项的表
    pub fn with_default(default: &str) -> Self {
        let mut map = BTreeMap::new();
        map.insert("default".to_string(), default.to_string());
        Self(map)
    }

    /// 查找项名，退回 `default`
    pub fn entry(&self, section: &str, term: &str) -> FvResult<&str> {
        if let Some(text) = self.0.get(term) {
            return Ok(text.as_str());
        }
        match self.0.get("default").map(String::as_str) {
            Some(text) if text != NONE_ENTRY => Ok(text),
            _ => Err(FvError::missing_key(term, section)),
        }
    }
}

fn default_ddt_table() -> SchemeTable {
    SchemeTable::with_default("Euler")
}
fn default_div_table() -> SchemeTable {
    SchemeTable::with_default("Gauss upwind")
}
fn default_laplacian_table() -> SchemeTable {
    SchemeTable::with_default("Gauss linear corrected")
}
fn default_sn_grad_table() -> SchemeTable {
    SchemeTable::with_default("corrected")
}

/// 离散格式配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FvSchemes {
    /// 时间导数格式
    #[serde(rename = "ddtSchemes", default = "default_ddt_table")]
    pub ddt_schemes: SchemeTable,
    /// 散度（对流）格式
    #[serde(rename = "divSchemes", default = "default_div_table")]
    pub div_schemes: SchemeTable,
    /// 拉普拉斯格式
    #[serde(rename = "laplacianSchemes", default = "default_laplacian_table")]
    pub laplacian_schemes: SchemeTable,
    /// 面法向梯度格式
    #[serde(rename = "snGradSchemes", default = "default_sn_grad_table")]
    pub sn_grad_schemes: SchemeTable,
}

impl Default for FvSchemes {
    fn default() -> Self {
        Self {
            ddt_schemes: default_ddt_table(),
            div_schemes: default_div_table(),
            laplacian_schemes: default_laplacian_table(),
            sn_grad_schemes: default_sn_grad_table(),
        }
    }
}

impl FvSchemes {
    /// 从字典构造并立即校验所有条目
    pub fn from_dict(dict: &Dictionary) -> FvResult<Self> {
        let schemes: Self = serde_json::from_value(dict.to_value())
            .map_err(|e| FvError::invalid_config(dict.scope(), "fvSchemes", e.to_string()))?;
        schemes.validate()?;
        Ok(schemes)
    }

    /// 校验所有格式文本可以解析
    pub fn validate(&self) -> FvResult<()> {
        for text in self.ddt_schemes.0.values() {
            text.parse::<DdtScheme>()?;
        }
        for text in self.div_schemes.0.values().filter(|t| *t != NONE_ENTRY) {
            text.parse::<DivScheme>()?;
        }
        for text in self.laplacian_schemes.0.values().filter(|t| *t != NONE_ENTRY) {
            text.parse::<SnGradScheme>()?;
        }
        for text in self.sn_grad_schemes.0.values().filter(|t| *t != NONE_ENTRY) {
            text.parse::<SnGradScheme>()?;
        }
        Ok(())
    }

    /// 进程级时间格式（`ddtSchemes.default`）
    pub fn ddt_scheme(&self) -> FvResult<DdtScheme> {
        self.ddt_schemes.entry("ddtSchemes", "default")?.parse()
    }

    /// 散度项格式，`term` 形如 `div(phi,U)`
    pub fn div_scheme(&self, term: &str) -> FvResult<DivScheme> {
        self.div_schemes.entry("divSchemes", term)?.parse()
    }

    /// 拉普拉斯项的面法向梯度格式，`term` 形如 `laplacian(nu,U)`
    pub fn laplacian_scheme(&self, term: &str) -> FvResult<SnGradScheme> {
        self.laplacian_schemes.entry("laplacianSchemes", term)?.parse()
    }

    /// 显式面法向梯度格式
    pub fn sn_grad_scheme(&self, term: &str) -> FvResult<SnGradScheme> {
        self.sn_grad_schemes.entry("snGradSchemes", term)?.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ddt() {
        assert_eq!("Euler".parse::<DdtScheme>().unwrap(), DdtScheme::Euler);
        assert_eq!("backward".parse::<DdtScheme>().unwrap(), DdtScheme::Backward);
        assert_eq!(
            "blended 0.5".parse::<DdtScheme>().unwrap(),
            DdtScheme::Blended(0.5)
        );
        assert!("blended 2".parse::<DdtScheme>().is_err());
        assert!(matches!(
            "CrankNicolson".parse::<DdtScheme>(),
            Err(FvError::UnknownModelType { .. })
        ));
    }

    #[test]
    fn test_parse_div() {
        let s: DivScheme = "Gauss limitedLinear 1".parse().unwrap();
        assert_eq!(s.interpolation, ConvectionScheme::LimitedLinear(1.0));
        assert!(!s.bounded);

        let s: DivScheme = "bounded Gauss linearUpwind grad(U)".parse().unwrap();
        assert!(s.bounded);
        assert_eq!(s.interpolation, ConvectionScheme::LinearUpwind);

        let s: DivScheme = "upwind".parse().unwrap();
        assert_eq!(s.interpolation, ConvectionScheme::Upwind);

        let err = "Gauss QUICK".parse::<DivScheme>().unwrap_err();
        assert!(err.to_string().contains("Minmod, SuperBee"));
    }

    #[test]
    fn test_parse_sn_grad() {
        assert_eq!(
            "Gauss linear corrected".parse::<SnGradScheme>().unwrap(),
            SnGradScheme::Corrected
        );
        assert_eq!(
            "uncorrected".parse::<SnGradScheme>().unwrap(),
            SnGradScheme::Uncorrected
        );
        assert_eq!(
            "limited 0.333".parse::<SnGradScheme>().unwrap(),
            SnGradScheme::Limited(0.333)
        );
    }

    #[test]
    fn test_table_lookup() {
        let dict = Dictionary::from_value(
            "fvSchemes",
            json!({
                "ddtSchemes": { "default": "backward" },
                "divSchemes": { "default": "none", "div(phi,U)": "Gauss vanLeer" },
                "laplacianSchemes": { "default": "Gauss linear uncorrected" }
            }),
        )
        .unwrap();
        let schemes = FvSchemes::from_dict(&dict).unwrap();
        assert_eq!(schemes.ddt_scheme().unwrap(), DdtScheme::Backward);
        assert_eq!(
            schemes.div_scheme("div(phi,U)").unwrap().interpolation,
            ConvectionScheme::VanLeer
        );
        assert!(matches!(
            schemes.div_scheme("div(phi,k)"),
            Err(FvError::MissingConfigurationKey { .. })
        ));
        assert_eq!(
            schemes.laplacian_scheme("laplacian(nu,U)").unwrap(),
            SnGradScheme::Uncorrected
        );
        assert_eq!(schemes.sn_grad_scheme("snGrad(p)").unwrap(), SnGradScheme::Corrected);
    }

    #[test]
    fn test_invalid_entry_detected_eagerly() {
        let dict = Dictionary::from_value(
            "fvSchemes",
            json!({ "divSchemes": { "div(phi,T)": "Gauss cubicSpline" } }),
        )
        .unwrap();
        assert!(FvSchemes::from_dict(&dict).is_err());
    }
}
