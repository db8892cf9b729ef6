//! 安全闸门：独立于模式匹配，决定一个路径能否被提议删除

pub mod protected;

pub use protected::{SafetyGate, SafetyPolicy};
