//! Host capability negotiation
//!
//! Probed once at startup; the result is threaded through the runtime.

use lazyact_dom::Document;

/// Crawler tokens matched against the user agent ("Googlebot", "Bingbot")
const CRAWLER_TOKENS: [&str; 2] = ["glebot", "ingbot"];

/// What the host environment offers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    pub user_agent: String,
    /// The window exposes scroll events
    pub has_scroll_events: bool,
    /// A native viewport-intersection primitive exists
    pub has_intersection_observer: bool,
    /// A native DOM mutation feed exists
    pub has_mutation_observer: bool,
    /// Idle-callback scheduling exists
    pub has_idle_callback: bool,
    /// The root element is flagged as a legacy browser
    pub legacy_document: bool,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self {
            user_agent: format!("Mozilla/5.0 (X11; Linux x86_64) lazyact/{}", crate::VERSION),
            has_scroll_events: true,
            has_intersection_observer: true,
            has_mutation_observer: true,
            has_idle_callback: true,
            legacy_document: false,
        }
    }
}

impl HostEnvironment {
    /// Environment of a crawler with the given user agent
    pub fn crawler(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            ..Self::default()
        }
    }

    /// Environment without any observation primitives
    pub fn legacy() -> Self {
        Self {
            has_scroll_events: false,
            has_intersection_observer: false,
            has_mutation_observer: false,
            has_idle_callback: false,
            ..Self::default()
        }
    }

    fn is_crawler(&self) -> bool {
        CRAWLER_TOKENS.iter().any(|t| self.user_agent.contains(t))
    }
}

/// Negotiated capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_viewport_observation: bool,
    pub supports_mutation_observation: bool,
    pub supports_idle_callback: bool,
}

impl Capabilities {
    /// Probe an environment
    pub fn probe(env: &HostEnvironment) -> Self {
        let supports_viewport_observation = env.has_scroll_events
            && env.has_intersection_observer
            && !env.is_crawler()
            && !env.legacy_document;

        let caps = Self {
            supports_viewport_observation,
            supports_mutation_observation: env.has_mutation_observer,
            supports_idle_callback: env.has_idle_callback,
        };
        tracing::debug!("Host capabilities: {:?}", caps);
        caps
    }

    /// Probe an environment, reading the legacy flag from the document
    pub fn probe_document(env: &HostEnvironment, document: &Document) -> Self {
        let env = HostEnvironment {
            legacy_document: env.legacy_document || document.is_legacy(),
            ..env.clone()
        };
        Self::probe(&env)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::probe(&HostEnvironment::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_browser() {
        let caps = Capabilities::probe(&HostEnvironment::default());
        assert!(caps.supports_viewport_observation);
        assert!(caps.supports_mutation_observation);
    }

    #[test]
    fn test_crawlers_bypass_viewport() {
        for ua in [
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
            "Mozilla/5.0 (compatible; bingbot/2.0)",
        ] {
            let caps = Capabilities::probe(&HostEnvironment::crawler(ua));
            assert!(!caps.supports_viewport_observation, "{ua}");
        }
    }

    #[test]
    fn test_legacy_document_class() {
        let mut doc = Document::default();
        let html = doc.document_element();
        doc.tree_mut().add_class(html, "legacy");

        let caps = Capabilities::probe_document(&HostEnvironment::default(), &doc);
        assert!(!caps.supports_viewport_observation);
        assert!(caps.supports_mutation_observation);
    }

    #[test]
    fn test_legacy_environment() {
        let caps = Capabilities::probe(&HostEnvironment::legacy());
        assert!(!caps.supports_viewport_observation);
        assert!(!caps.supports_mutation_observation);
        assert!(!caps.supports_idle_callback);
    }
}
