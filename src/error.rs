use thiserror::Error;

/// 上游响应上下文的最大保留长度
const MAX_CONTEXT_LEN: usize = 512;

/// 上游失败的具体环节
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UpstreamFailure {
    #[error("upload failed")]
    UploadFailed,
    #[error("extraction failed")]
    ExtractionFailed,
    #[error("malformed extraction response")]
    MalformedExtractionResponse,
    #[error("contact load failed")]
    ContactLoadFailed,
    #[error("address load failed")]
    AddressLoadFailed,
    #[error("client profile load failed")]
    ProfileLoadFailed,
    #[error("classification failed")]
    ClassificationFailed,
    #[error("save failed")]
    SaveFailed,
    #[error("upstream call timed out")]
    Timeout,
}

/// 导入流程错误
///
/// 需要 `Clone`: 单飞 (single-flight) 的共享 future 会把同一个结果分发给所有等待者。
#[derive(Debug, Clone, Error)]
pub enum ImportError {
    /// 本地输入缺失或无效, 在任何网络请求之前报告
    #[error("validation error: {0}")]
    Validation(String),

    /// 外部协作方返回了失败或结构不符的响应
    #[error("{kind}: {context}")]
    Upstream {
        kind: UpstreamFailure,
        context: String,
    },

    /// 凭证被上游拒绝
    #[error("authentication required: {0}")]
    Authentication(String),

    /// 导入器只能使用一次
    #[error("importer already used; the object cannot be reused")]
    Reuse,
}

impl ImportError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ImportError::Validation(msg.into())
    }

    /// 构造上游错误, 上下文过长时截断
    pub fn upstream(kind: UpstreamFailure, context: impl Into<String>) -> Self {
        ImportError::Upstream {
            kind,
            context: truncate_context(context.into()),
        }
    }

    /// 认证失败, 响应内容同样截断
    pub fn authentication(context: impl Into<String>) -> Self {
        ImportError::Authentication(truncate_context(context.into()))
    }

    /// 以完整响应体作为上下文
    pub fn malformed(kind: UpstreamFailure, what: &str, response: &serde_json::Value) -> Self {
        Self::upstream(kind, format!("{} missing from response: {}", what, response))
    }

    pub fn upstream_kind(&self) -> Option<UpstreamFailure> {
        match self {
            ImportError::Upstream { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// 地址加载失败时是否可以降级为"国家未知"
    pub fn degrades_to_unknown_country(&self) -> bool {
        matches!(
            self,
            ImportError::Upstream { kind, .. } if *kind != UpstreamFailure::Timeout
        )
    }
}

fn truncate_context(mut context: String) -> String {
    if context.len() > MAX_CONTEXT_LEN {
        let mut cut = MAX_CONTEXT_LEN;
        while !context.is_char_boundary(cut) {
            cut -= 1;
        }
        context.truncate(cut);
        context.push_str("...");
    }
    context
}
