use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::LoadError;

// rust 的 async trait 还没有稳定，可以用async_trait 宏
#[async_trait]
pub trait Fetch {
    type Error;
    async fn fetch(&self) -> Result<String, Self::Error>;
}

/// 从文件源或者 http 源中获取 CSV 原始文本
///
/// - `http://` / `https://` 走网络
/// - `file://<path>` 或者直接给出的路径都按本地文件读取
pub async fn retrieve_data(source: impl AsRef<str>) -> Result<String, LoadError> {
    let name = source.as_ref();
    if name.starts_with("http://") || name.starts_with("https://") {
        debug!("fetching {} over http", name);
        UrlFetcher(name).fetch().await
    } else {
        let path = name.strip_prefix("file://").unwrap_or(name);
        debug!("reading {} from disk", path);
        FileFetcher(path).fetch().await
    }
}

struct UrlFetcher<'a>(pub(crate) &'a str);

#[async_trait]
impl<'a> Fetch for UrlFetcher<'a> {
    type Error = LoadError;

    async fn fetch(&self) -> Result<String, Self::Error> {
        let unreachable = |e: reqwest::Error| LoadError::Unreachable {
            name: self.0.to_string(),
            reason: e.to_string(),
        };
        let resp = reqwest::get(self.0)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(unreachable)?;
        resp.text().await.map_err(unreachable)
    }
}

struct FileFetcher<'a>(pub(crate) &'a str);

#[async_trait]
impl<'a> Fetch for FileFetcher<'a> {
    type Error = LoadError;

    async fn fetch(&self) -> Result<String, Self::Error> {
        fs::read_to_string(self.0)
            .await
            .map_err(|e| LoadError::Unreachable {
                name: self.0.to_string(),
                reason: e.to_string(),
            })
    }
}
