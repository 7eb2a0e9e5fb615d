//! 环境变量

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::config::DEFAULT_ENV;

/// 环境变量表
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// 空表
    pub fn new() -> Self {
        Self::default()
    }

    /// 载入板级默认值
    pub fn with_defaults() -> Self {
        let mut env = Self::new();
        for (k, v) in DEFAULT_ENV {
            env.set(k, v);
        }
        env
    }

    /// 读取变量
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// 按十六进制解析变量
    pub fn get_hex(&self, name: &str) -> Option<u64> {
        let v = self.get(name)?;
        let v = v.strip_prefix("0x").unwrap_or(v);
        u64::from_str_radix(v, 16).ok()
    }

    /// 设置变量，值为空时删除
    pub fn set(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            self.vars.remove(name);
        } else {
            self.vars.insert(name.to_string(), value.to_string());
        }
    }

    /// 以十六进制（无前缀）设置变量
    pub fn set_hex(&mut self, name: &str, value: u64) {
        self.set(name, &format!("{:x}", value));
    }

    /// 删除变量
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    /// 变量个数
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// 按名字排序的全部变量
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut all: Vec<(&str, &str)> = self
            .vars
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        all.sort_unstable();
        all
    }
}
