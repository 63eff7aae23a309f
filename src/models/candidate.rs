use super::ContactRecord;
use serde::{Deserialize, Serialize};

/// 命中方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchMethod {
    BankAccountExact,
    NameExact,
    NamePartial,
    Name2Partial,
}

impl MatchMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BankAccountExact => "bankAccountExact",
            Self::NameExact => "nameExact",
            Self::NamePartial => "namePartial",
            Self::Name2Partial => "name2Partial",
        }
    }
}

/// 候选开票方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub contact: ContactRecord,
    pub method: MatchMethod,
}

/// 因与客户自身信息相同而跳过的匹配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelfExclusion {
    Name(String),
    BankAccount(String),
}

/// 候选列表: 按匹配轮次的执行顺序排列, 允许重复, 第一个即为开票方
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerCandidateList {
    pub candidates: Vec<MatchCandidate>,
    pub exclusions: Vec<SelfExclusion>,
}

impl IssuerCandidateList {
    pub fn issuer(&self) -> Option<&ContactRecord> {
        self.candidates.first().map(|c| &c.contact)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub(crate) fn extend(&mut self, other: IssuerCandidateList) {
        self.candidates.extend(other.candidates);
        self.exclusions.extend(other.exclusions);
    }
}
