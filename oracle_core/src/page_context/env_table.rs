//! # NDOC
//! component: `page_context::env_table`
//! purpose: Host-pattern -> `site_env` table, verbatim from spec §6.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteEnv {
    Stg,
    Qa,
    Dev,
    Beta,
    Local,
    Prd,
}

impl SiteEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteEnv::Stg => "STG",
            SiteEnv::Qa => "QA",
            SiteEnv::Dev => "DEV",
            SiteEnv::Beta => "BETA",
            SiteEnv::Local => "LOCAL",
            SiteEnv::Prd => "PRD",
        }
    }
}

static RULES: Lazy<Vec<(Regex, SiteEnv)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)^stg\d*[-.]|[-.]stg\d*[-.]|staging").unwrap(),
            SiteEnv::Stg,
        ),
        (
            Regex::new(r"(?i)^qa\d*[-.]|[-.]qa\d*[-.]").unwrap(),
            SiteEnv::Qa,
        ),
        (
            Regex::new(r"(?i)^dev\d*[-.]|[-.]dev\d*[-.]|develop").unwrap(),
            SiteEnv::Dev,
        ),
        (
            Regex::new(r"(?i)^beta\d*[-.]|[-.]beta\d*[-.]").unwrap(),
            SiteEnv::Beta,
        ),
        (
            Regex::new(r"(?i)^localhost|127\.0\.0\.1|^local[-.]").unwrap(),
            SiteEnv::Local,
        ),
    ]
});

/// Classifies a hostname into a `site_env`, falling through to `PRD` when
/// nothing matches.
pub fn classify_host(hostname: &str) -> SiteEnv {
    for (pattern, env) in RULES.iter() {
        if pattern.is_match(hostname) {
            return *env;
        }
    }
    SiteEnv::Prd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_prefix_is_stg() {
        assert_eq!(classify_host("stg1-shop.example.com").as_str(), "STG");
        assert_eq!(classify_host("shop-staging.example.com").as_str(), "STG");
    }

    #[test]
    fn qa_and_dev_and_beta() {
        assert_eq!(classify_host("qa2-shop.example.com").as_str(), "QA");
        assert_eq!(classify_host("dev-shop.example.com").as_str(), "DEV");
        assert_eq!(classify_host("beta-shop.example.com").as_str(), "BETA");
    }

    #[test]
    fn localhost_and_loopback() {
        assert_eq!(classify_host("localhost").as_str(), "LOCAL");
        assert_eq!(classify_host("127.0.0.1").as_str(), "LOCAL");
    }

    #[test]
    fn unmatched_host_is_prd() {
        assert_eq!(classify_host("www.example.com").as_str(), "PRD");
    }
}
