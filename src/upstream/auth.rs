use crate::error::ImportError;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// API 令牌
///
/// 只能通过 crate 内部的 `expose` 读取; `Debug`/`Display` 只输出占位符, 配置序列化时跳过。
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Result<Self, ImportError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ImportError::validation(
                "No API token provided; missing parameter 'apiToken'",
            ));
        }
        Ok(Self(token))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl<'de> Deserialize<'de> for ApiToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ApiToken::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_rejected() {
        let err = ApiToken::new("  ").unwrap_err();
        assert!(err.to_string().contains("No API token provided"));
    }

    #[test]
    fn formatting_never_reveals_the_token() {
        let token = ApiToken::new("s3cr3t-t0ken").unwrap();
        assert!(!format!("{:?}", token).contains("s3cr3t"));
        assert!(!format!("{}", token).contains("s3cr3t"));
        assert_eq!(token.expose(), "s3cr3t-t0ken");
    }
}
