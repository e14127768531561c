//! 向量归一化与拼接
//!
//! 图片向量和文本向量来自不同的模型，长度和数值范围都不同，
//! 先各自做 L2 归一化再按「图片在前，文本在后」拼接，得到组合向量。

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 有限浮点数组成的非空向量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Vector(Vec<f64>);

impl Vector {
    /// 创建向量，长度为 0 或包含 NaN/∞ 时返回 `InvalidVector`
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::InvalidVector("向量长度为 0".to_string()));
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidVector(format!("第 {idx} 个元素不是有限数: {}", values[idx])));
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// L2 范数
    pub fn magnitude(&self) -> f64 {
        magnitude(&self.0)
    }
}

impl TryFrom<Vec<f64>> for Vector {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<Vector> for Vec<f64> {
    fn from(v: Vector) -> Self {
        v.0
    }
}

impl From<NormalizedVector> for Vector {
    fn from(v: NormalizedVector) -> Self {
        Self(v.0)
    }
}

/// 归一化后的向量，范数为 1，或者输入范数为 0 时为全零向量
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedVector(Vec<f64>);

impl NormalizedVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 是否为全零向量（输入范数为 0 的退化情况）
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0.)
    }
}

/// 归一化图片向量与归一化文本向量的拼接，顺序是哈希约定的一部分
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedVector {
    values: Vec<f64>,
    image_len: usize,
}

impl Serialize for CombinedVector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl CombinedVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn image_part(&self) -> &[f64] {
        &self.values[..self.image_len]
    }

    pub fn text_part(&self) -> &[f64] {
        &self.values[self.image_len..]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// L2 归一化
///
/// 范数恰好为 0 时返回同长度的全零向量，不视为错误。
/// 平方和上溢，或平方落入次正规数范围时，先按最大绝对值缩放再归一化，
/// 保证结果为有限数且与等比例放大的向量一致。
pub fn normalize(v: &Vector) -> NormalizedVector {
    let values = v.as_slice();
    let mut norm = magnitude(values);

    // 范数低于 sqrt(MIN_POSITIVE) 时平方和已经损失精度
    if norm.is_finite() && norm >= f64::MIN_POSITIVE.sqrt() {
        return NormalizedVector(values.iter().map(|x| x / norm).collect());
    }

    let scale = values.iter().fold(0f64, |acc, x| acc.max(x.abs()));
    if scale == 0. {
        return NormalizedVector(vec![0.; values.len()]);
    }
    let scaled = values.iter().map(|x| x / scale).collect::<Vec<_>>();
    norm = magnitude(&scaled);
    NormalizedVector(scaled.into_iter().map(|x| x / norm).collect())
}

/// 分别归一化后按图片、文本的顺序拼接
pub fn combine(image: &Vector, text: &Vector) -> CombinedVector {
    let image = normalize(image);
    let text = normalize(text);
    let image_len = image.len();
    let mut values = image.0;
    values.extend(text.0);
    CombinedVector { values, image_len }
}

fn magnitude(values: &[f64]) -> f64 {
    values.iter().map(|x| x * x).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[f64]) -> Vector {
        Vector::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_normalize_3_4() {
        let n = normalize(&vector(&[0., 3., 4.]));
        assert_eq!(n.as_slice(), &[0., 0.6, 0.8]);
    }

    #[test]
    fn test_normalize_zero() {
        let n = normalize(&vector(&[0., 0., 0.]));
        assert_eq!(n.as_slice(), &[0., 0., 0.]);
        assert!(n.is_zero());
    }

    #[test]
    fn test_normalize_idempotent() {
        let once = normalize(&vector(&[1.5, -2., 7.25, 0.125]));
        let twice = normalize(&Vector::from(once.clone()));
        for (a, b) in once.as_slice().iter().zip(twice.as_slice()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!((Vector::from(twice).magnitude() - 1.).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_huge_values() {
        let n = normalize(&vector(&[f64::MAX, f64::MAX]));
        assert!(n.as_slice().iter().all(|x| x.is_finite()));
        assert!((n.as_slice()[0] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_tiny_values() {
        let n = normalize(&vector(&[1e-300, 0.]));
        assert_eq!(n.as_slice(), &[1., 0.]);
    }

    #[test]
    fn test_normalize_subnormal_squares() {
        let n = normalize(&vector(&[0., 3e-160, 4e-160]));
        assert_eq!(n.as_slice(), &[0., 0.6, 0.8]);
        assert!((Vector::from(n.clone()).magnitude() - 1.).abs() < 1e-12);
        assert_eq!(n, normalize(&vector(&[0., 3., 4.])));
    }

    #[test]
    fn test_invalid_vector() {
        assert!(matches!(Vector::new(vec![]), Err(Error::InvalidVector(_))));
        assert!(matches!(Vector::new(vec![1., f64::NAN]), Err(Error::InvalidVector(_))));
        assert!(matches!(Vector::new(vec![f64::INFINITY]), Err(Error::InvalidVector(_))));
    }

    #[test]
    fn test_combine_order() {
        let c = combine(&vector(&[0., 3., 4.]), &vector(&[1., 0., 0.]));
        assert_eq!(c.as_slice(), &[0., 0.6, 0.8, 1., 0., 0.]);
        assert_eq!(c.image_part(), &[0., 0.6, 0.8]);
        assert_eq!(c.text_part(), &[1., 0., 0.]);
    }

    #[test]
    fn test_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<Vector>("[]").is_err());
        let v: Vector = serde_json::from_str("[1, 2.5]").unwrap();
        assert_eq!(v.as_slice(), &[1., 2.5]);
    }
}
