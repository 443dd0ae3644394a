use serde::{Deserialize, Serialize};
use std::fmt;

/// 选区编号
///
/// 所有比较都在这个规范整数上进行，不直接比较表格中的原始字符串
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstituencyKey(u32);

impl ConstituencyKey {
    /// 只接受正整数
    pub fn new(value: u32) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// 显示标签，如 "Constituency 111"
    pub fn label(self, prefix: &str) -> String {
        format!("{} {}", prefix, self.0)
    }
}

impl fmt::Display for ConstituencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_rejected() {
        assert!(ConstituencyKey::new(0).is_none());
        assert_eq!(ConstituencyKey::new(7).map(|k| k.get()), Some(7));
    }

    #[test]
    fn test_numeric_ordering() {
        let mut keys: Vec<ConstituencyKey> = [113, 9, 111]
            .into_iter()
            .filter_map(ConstituencyKey::new)
            .collect();
        keys.sort();
        let ordered: Vec<u32> = keys.into_iter().map(ConstituencyKey::get).collect();
        assert_eq!(ordered, vec![9, 111, 113]);
    }
}
