// crates/fv_physics/src/control/time.rs

//! 时间状态
//!
//! 只记录当前时刻、当前与上一步时间步长和步数；
//! 写出间隔、结束判定等由调用方负责。

use fv_foundation::dimension::{DimensionSet, DimensionedScalar};
use fv_foundation::error::{FvError, FvResult};
use serde::{Deserialize, Serialize};

/// 时间状态
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeState {
    /// 当前时刻
    pub value: f64,
    /// 当前时间步长
    pub delta_t: f64,
    /// 上一时间步长
    pub delta_t0: f64,
    /// 已推进的步数
    pub index: usize,
    #[serde(skip)]
    last_step: f64,
}

impl Default for TimeState {
    fn default() -> Self {
        Self {
            value: 0.0,
            delta_t: 1.0,
            delta_t0: 1.0,
            index: 0,
            last_step: 1.0,
        }
    }
}

impl TimeState {
    /// 从 `start` 开始、步长 `delta_t`
    pub fn new(start: f64, delta_t: f64) -> FvResult<Self> {
        check_delta_t(delta_t)?;
        Ok(Self {
            value: start,
            delta_t,
            delta_t0: delta_t,
            index: 0,
            last_step: delta_t,
        })
    }

    /// 修改下一步的步长
    pub fn set_delta_t(&mut self, delta_t: f64) -> FvResult<()> {
        check_delta_t(delta_t)?;
        self.delta_t = delta_t;
        Ok(())
    }

    /// 以当前步长推进一步，`delta_t0` 取上一步实际使用的步长
    pub fn advance(&mut self) {
        self.delta_t0 = if self.index > 0 { self.last_step } else { self.delta_t };
        self.last_step = self.delta_t;
        self.value += self.delta_t;
        self.index += 1;
    }

    /// 带量纲的时间步长
    pub fn delta_t_dimensioned(&self) -> DimensionedScalar {
        DimensionedScalar::new("deltaT", DimensionSet::TIME, self.delta_t)
    }

    /// 当前时刻的名称，用于输出目录
    pub fn name(&self) -> String {
        format!("{}", self.value)
    }
}

fn check_delta_t(delta_t: f64) -> FvResult<()> {
    if !(delta_t > 0.0 && delta_t.is_finite()) {
        return Err(FvError::invalid_config("deltaT", delta_t, "时间步长必须为正的有限值"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let mut t = TimeState::new(0.0, 0.1).unwrap();
        t.advance();
        assert_eq!(t.index, 1);
        assert!((t.value - 0.1).abs() < 1e-15);

        assert_eq!(t.delta_t0, 0.1);

        t.set_delta_t(0.2).unwrap();
        t.advance();
        assert_eq!(t.delta_t0, 0.1);
        assert_eq!(t.delta_t, 0.2);
        assert_eq!(t.index, 2);
        assert!((t.value - 0.3).abs() < 1e-15);

        t.advance();
        assert_eq!(t.delta_t0, 0.2);
        assert_eq!(t.delta_t_dimensioned().dimensions, DimensionSet::TIME);
    }

    #[test]
    fn test_rejects_bad_step() {
        assert!(TimeState::new(0.0, 0.0).is_err());
        let mut t = TimeState::default();
        assert!(matches!(t.set_delta_t(-1.0), Err(FvError::InvalidConfig { .. })));
        assert!(t.set_delta_t(f64::NAN).is_err());
        assert_eq!(t.delta_t, 1.0);
    }
}
