use super::http::SourceContext;
use super::{LrclibSource, LyricSource, NeteaseSource};
use crate::config::defaults::USER_AGENT;
use crate::config::SourcesConfig;
use crate::error::{Error, Result};
use std::sync::Arc;

type Constructor = fn(&SourceContext) -> Result<Arc<dyn LyricSource>>;

/// A source this build knows how to construct.
pub struct SourceEntry {
    pub id: &'static str,
    pub name: &'static str,
    build: Constructor,
}

/// Static table of every available source.
pub struct SourceRegistry {
    entries: &'static [SourceEntry],
}

static ENTRIES: &[SourceEntry] = &[
    SourceEntry {
        id: LrclibSource::ID,
        name: LrclibSource::NAME,
        build: build_lrclib,
    },
    SourceEntry {
        id: NeteaseSource::ID,
        name: NeteaseSource::NAME,
        build: build_netease,
    },
    SourceEntry {
        id: NeteaseSource::TRANSLATED_ID,
        name: NeteaseSource::TRANSLATED_NAME,
        build: build_netease_tr,
    },
];

fn build_lrclib(ctx: &SourceContext) -> Result<Arc<dyn LyricSource>> {
    Ok(Arc::new(LrclibSource::new(ctx)?))
}

fn build_netease(ctx: &SourceContext) -> Result<Arc<dyn LyricSource>> {
    Ok(Arc::new(NeteaseSource::new(ctx)?))
}

fn build_netease_tr(ctx: &SourceContext) -> Result<Arc<dyn LyricSource>> {
    Ok(Arc::new(NeteaseSource::translated(ctx)?))
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self { entries: ENTRIES }
    }
}

impl SourceRegistry {
    pub fn entries(&self) -> &[SourceEntry] {
        self.entries
    }

    pub fn get(&self, id: &str) -> Option<&SourceEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Build one source with its own context.
    pub fn build(&self, id: &str, ctx: &SourceContext) -> Result<Arc<dyn LyricSource>> {
        let entry = self
            .get(id)
            .ok_or_else(|| Error::UnknownSource(id.to_string()))?;
        (entry.build)(ctx)
    }

    /// Build the enabled sources in configuration order.
    ///
    /// Duplicate ids are built once; unknown ids are an error so a typo in
    /// the config is not silently ignored.
    pub fn build_enabled(&self, cfg: &SourcesConfig) -> Result<Vec<Arc<dyn LyricSource>>> {
        let mut seen = Vec::new();
        let mut sources = Vec::new();
        for id in &cfg.enabled {
            if seen.contains(&id.as_str()) {
                continue;
            }
            seen.push(id.as_str());

            let ctx = SourceContext {
                proxy: cfg.proxy_for(id).clone(),
                timeout: cfg.timeout(),
                user_agent: USER_AGENT.to_string(),
            };
            sources.push(self.build(id, &ctx)?);
        }
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_match_source_ids() {
        let registry = SourceRegistry::default();
        let ctx = SourceContext::default();
        for entry in registry.entries() {
            let source = registry.build(entry.id, &ctx).unwrap();
            assert_eq!(source.id(), entry.id);
            assert_eq!(source.name(), entry.name);
        }
    }

    #[test]
    fn test_build_enabled_keeps_order() {
        let cfg = SourcesConfig {
            enabled: vec![
                "netease_tr".into(),
                "lrclib".into(),
                "netease_tr".into(),
            ],
            ..SourcesConfig::default()
        };
        let sources = SourceRegistry::default().build_enabled(&cfg).unwrap();
        let ids: Vec<_> = sources.iter().map(|s| s.id().to_string()).collect();
        assert_eq!(ids, vec!["netease_tr", "lrclib"]);
    }

    #[test]
    fn test_unknown_source() {
        let cfg = SourcesConfig {
            enabled: vec!["viewlyrics".into()],
            ..SourcesConfig::default()
        };
        assert!(matches!(
            SourceRegistry::default().build_enabled(&cfg),
            Err(Error::UnknownSource(id)) if id == "viewlyrics"
        ));
    }
}
