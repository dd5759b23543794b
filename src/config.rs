//! Dashboard 配置
//!
//! 可以从 JSON 文件加载，缺省字段使用默认值，命令行参数会覆盖文件中的值。

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// 本地路径、`file://` 或者 `http(s)://`
    #[serde(default = "default_data_source")]
    pub data_source: String,

    /// 没有选择任何国家时默认展示的国家
    #[serde(default = "default_countries")]
    pub default_countries: Vec<String>,

    /// 侧边栏底部显示的数据来源
    #[serde(default = "default_source_label")]
    pub source_label: String,

    /// 下载文件名
    #[serde(default = "default_export_file_name")]
    pub export_file_name: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8501
}

fn default_data_source() -> String {
    "data/covid-19.csv".to_string()
}

fn default_countries() -> Vec<String> {
    vec!["Global".to_string()]
}

fn default_source_label() -> String {
    "Dataset Source".to_string()
}

fn default_export_file_name() -> String {
    "covid_data.csv".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_source: default_data_source(),
            default_countries: default_countries(),
            source_label: default_source_label(),
            export_file_name: default_export_file_name(),
        }
    }
}

impl DashboardConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
