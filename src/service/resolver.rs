use crate::models::{
    ClientProfile, ContactRecord, ExtractionSet, IssuerCandidateList, MatchCandidate, MatchMethod,
    SelfExclusion,
};
use regex::{Regex, RegexBuilder};

/// 开票方解析: 按固定顺序执行多轮匹配, 结果按执行顺序拼接 (保留重复)
///
/// 1. 完整名称
/// 2. IBAN
/// 3. 名称的第一个词 (至少两个词时)
pub struct IssuerResolver<'a> {
    directory: &'a [ContactRecord],
    profile: &'a ClientProfile,
}

impl<'a> IssuerResolver<'a> {
    pub fn new(directory: &'a [ContactRecord], profile: &'a ClientProfile) -> Self {
        Self { directory, profile }
    }

    pub fn resolve(&self, extractions: &ExtractionSet) -> IssuerCandidateList {
        let mut result = IssuerCandidateList::default();
        let creditor = extractions.creditor_name();

        match creditor {
            Some(name) => result.extend(self.match_by_name(name)),
            None => tracing::debug!("Skipping resolving issuer contact by name; name is not known"),
        }

        match extractions.iban() {
            Some(iban) => result.extend(self.match_by_bank_account(iban)),
            None => tracing::debug!("Skipping resolving issuer contact by IBAN; IBAN is not known"),
        }

        if let Some((first, _)) = creditor.and_then(|n| n.trim().split_once(char::is_whitespace)) {
            result.extend(self.match_by_name(first));
        }

        match result.issuer() {
            Some(issuer) => tracing::info!(
                "Resolved issuer contact: {} (#{}), {} candidates",
                issuer.name,
                issuer.id,
                result.len()
            ),
            None => tracing::info!("No issuer contact could be resolved"),
        }

        result
    }

    /// 名称匹配 (忽略大小写): 精确 → 名称包含 → 第二名称包含, 三轮都执行
    pub fn match_by_name(&self, name: &str) -> IssuerCandidateList {
        let mut result = IssuerCandidateList::default();
        tracing::debug!("Resolving issuer contact by name: {} ...", name);

        let Some(pattern) = LiteralPattern::new(name) else {
            return result;
        };

        if pattern.equals(&self.profile.name) {
            tracing::debug!("Skipping name {}; it is the client's own name", name);
            result.exclusions.push(SelfExclusion::Name(name.to_string()));
            return result;
        }

        for contact in self.directory {
            if pattern.equals(&contact.name) {
                result.candidates.push(candidate(contact, MatchMethod::NameExact));
            }
        }
        for contact in self.directory {
            if pattern.contained_in(&contact.name) {
                result.candidates.push(candidate(contact, MatchMethod::NamePartial));
            }
        }
        for contact in self.directory {
            if contact.name2.as_deref().is_some_and(|n2| pattern.contained_in(n2)) {
                result.candidates.push(candidate(contact, MatchMethod::Name2Partial));
            }
        }

        if result.is_empty() {
            tracing::debug!("No issuer contact was found by name: {}", name);
        }
        for c in &result.candidates {
            tracing::debug!(
                "Found issuer contact by name: {} (#{}) [{}]",
                c.contact.name,
                c.contact.id,
                c.method.as_str()
            );
        }

        result
    }

    /// IBAN 精确匹配 (去掉空格/制表符/连字符后, 忽略大小写)
    pub fn match_by_bank_account(&self, iban: &str) -> IssuerCandidateList {
        let mut result = IssuerCandidateList::default();
        let normalized = normalize_iban(iban);
        if normalized.is_empty() {
            return result;
        }

        let own = self.profile.bank_iban.as_deref().map(normalize_iban);
        if own.is_some_and(|own| own.eq_ignore_ascii_case(&normalized)) {
            tracing::debug!("Skipping IBAN {}; it is the client's own account", normalized);
            result.exclusions.push(SelfExclusion::BankAccount(normalized));
            return result;
        }

        for contact in self.directory {
            let matches = contact
                .bank_account
                .as_deref()
                .is_some_and(|acc| normalize_iban(acc).eq_ignore_ascii_case(&normalized));
            if matches {
                tracing::debug!("Found issuer contact by IBAN: {} (#{})", contact.name, contact.id);
                result.candidates.push(candidate(contact, MatchMethod::BankAccountExact));
            }
        }

        result
    }
}

/// 解析开票方候选
pub fn resolve_issuer(
    extractions: &ExtractionSet,
    directory: &[ContactRecord],
    profile: &ClientProfile,
) -> IssuerCandidateList {
    IssuerResolver::new(directory, profile).resolve(extractions)
}

pub fn normalize_iban(iban: &str) -> String {
    iban.chars().filter(|c| !matches!(c, ' ' | '\t' | '-')).collect()
}

fn candidate(contact: &ContactRecord, method: MatchMethod) -> MatchCandidate {
    MatchCandidate {
        contact: contact.clone(),
        method,
    }
}

/// 外部文本转义后构建的忽略大小写字面量模式
struct LiteralPattern {
    exact: Regex,
    contains: Regex,
}

impl LiteralPattern {
    fn new(text: &str) -> Option<Self> {
        let escaped = regex::escape(text);
        let build = |pattern: String| {
            RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| tracing::warn!("cannot build name pattern for {:?}: {}", text, e))
                .ok()
        };

        Some(Self {
            exact: build(format!("^(?:{})$", escaped))?,
            contains: build(escaped)?,
        })
    }

    fn equals(&self, haystack: &str) -> bool {
        self.exact.is_match(haystack)
    }

    fn contained_in(&self, haystack: &str) -> bool {
        self.contains.is_match(haystack)
    }
}
