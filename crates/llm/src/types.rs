//! Provider roles and endpoint defaults.

use sage_core::config::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a provider in the fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderRole {
    Primary,
    Secondary,
}

impl ProviderRole {
    /// Parse a role from its configuration key.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for ProviderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default OpenAI-compatible base URL for a provider kind.
pub fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAI => "https://api.openai.com/v1",
        ProviderKind::Groq => "https://api.groq.com/openai/v1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(ProviderRole::parse("primary"), Some(ProviderRole::Primary));
        assert_eq!(ProviderRole::parse("Secondary"), Some(ProviderRole::Secondary));
        assert_eq!(ProviderRole::parse("tertiary"), None);
    }

    #[test]
    fn test_roles_order() {
        assert!(ProviderRole::Primary < ProviderRole::Secondary);
        assert_eq!(ProviderRole::Secondary.to_string(), "secondary");
    }

    #[test]
    fn test_default_base_urls() {
        assert!(default_base_url(ProviderKind::OpenAI).contains("api.openai.com"));
        assert!(default_base_url(ProviderKind::Groq).contains("api.groq.com"));
    }
}
