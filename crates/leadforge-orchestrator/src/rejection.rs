//! Rejection classification: the rejection reason for a
//! generated domain is the first matching predicate, in this exact order.
//! `low_score` before `no_keywords` is load-bearing — swapping them makes
//! `low_score` unreachable.

use leadforge_types::domain::GeneratedDomain;
use leadforge_types::enums::{DnsStatus, HttpStatus, LeadStatus, RejectionReason};

/// Qualification score threshold below which a domain with keywords is
/// `low_score` rather than `qualified`.
pub const LOW_SCORE_THRESHOLD: f64 = 0.5;

/// Classify a generated domain's rejection reason from its current outcome
/// fields. Pure; never consults anything outside `domain`.
#[must_use]
pub fn classify_rejection(domain: &GeneratedDomain) -> RejectionReason {
    if domain.lead_status == LeadStatus::Match {
        return RejectionReason::Qualified;
    }
    if domain.dns_status == DnsStatus::Timeout {
        return RejectionReason::DnsTimeout;
    }
    if domain.dns_status == DnsStatus::Error {
        return RejectionReason::DnsError;
    }
    if domain.http_status == HttpStatus::Timeout {
        return RejectionReason::HttpTimeout;
    }
    if domain.http_status == HttpStatus::Error {
        return RejectionReason::HttpError;
    }
    if domain.is_parked {
        return RejectionReason::Parked;
    }
    let has_keywords = domain.keywords.as_ref().is_some_and(|k| !k.is_empty());
    let score_below_threshold = domain.keyword_score.is_some_and(|score| score < LOW_SCORE_THRESHOLD);
    if has_keywords && score_below_threshold {
        return RejectionReason::LowScore;
    }
    if domain.lead_status == LeadStatus::NoMatch {
        return RejectionReason::NoKeywords;
    }
    RejectionReason::Pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadforge_types::ids::CampaignId;

    fn base() -> GeneratedDomain {
        GeneratedDomain {
            campaign_id: CampaignId::new(),
            offset_index: 0,
            domain_name: "example.test".into(),
            dns_status: DnsStatus::Ok,
            http_status: HttpStatus::Ok,
            keywords: None,
            keyword_score: None,
            lead_status: LeadStatus::Pending,
            is_parked: false,
            rejection_reason: RejectionReason::Pending,
        }
    }

    #[test]
    fn matched_is_qualified_regardless_of_other_fields() {
        let mut d = base();
        d.lead_status = LeadStatus::Match;
        d.dns_status = DnsStatus::Timeout; // would otherwise dominate; match wins first
        assert_eq!(classify_rejection(&d), RejectionReason::Qualified);
    }

    #[test]
    fn dns_timeout_before_dns_error_ordering_is_per_field() {
        let mut d = base();
        d.dns_status = DnsStatus::Timeout;
        assert_eq!(classify_rejection(&d), RejectionReason::DnsTimeout);
    }

    #[test]
    fn dns_error_takes_precedence_over_http_fields() {
        let mut d = base();
        d.dns_status = DnsStatus::Error;
        d.http_status = HttpStatus::Timeout;
        assert_eq!(classify_rejection(&d), RejectionReason::DnsError);
    }

    #[test]
    fn http_timeout_then_http_error() {
        let mut d = base();
        d.http_status = HttpStatus::Timeout;
        assert_eq!(classify_rejection(&d), RejectionReason::HttpTimeout);

        let mut d = base();
        d.http_status = HttpStatus::Error;
        assert_eq!(classify_rejection(&d), RejectionReason::HttpError);
    }

    #[test]
    fn parked_before_keyword_checks() {
        let mut d = base();
        d.is_parked = true;
        d.keywords = Some(vec!["buy".into()]);
        d.keyword_score = Some(0.1);
        assert_eq!(classify_rejection(&d), RejectionReason::Parked);
    }

    #[test]
    fn low_score_requires_both_keywords_and_below_threshold() {
        let mut d = base();
        d.keywords = Some(vec!["buy".into()]);
        d.keyword_score = Some(0.1);
        assert_eq!(classify_rejection(&d), RejectionReason::LowScore);
    }

    #[test]
    fn low_score_is_reachable_before_no_keywords_when_both_could_apply() {
        // A domain with keywords, a low score, AND a no_match verdict must
        // resolve to low_score: the predicate order in makes
        // low_score unreachable if no_keywords were checked first.
        let mut d = base();
        d.keywords = Some(vec!["free".into(), "trial".into()]);
        d.keyword_score = Some(0.2);
        d.lead_status = LeadStatus::NoMatch;
        assert_eq!(classify_rejection(&d), RejectionReason::LowScore);
    }

    #[test]
    fn no_keywords_when_no_match_and_not_low_score() {
        let mut d = base();
        d.lead_status = LeadStatus::NoMatch;
        assert_eq!(classify_rejection(&d), RejectionReason::NoKeywords);
    }

    #[test]
    fn pending_when_nothing_else_matches() {
        let d = base();
        assert_eq!(classify_rejection(&d), RejectionReason::Pending);
    }
}
