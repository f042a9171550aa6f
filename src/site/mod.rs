//! Site tree - the page hierarchy and language variants pages are served in.
//!
//! Stands in for the CMS page tree: it knows each page's slug and parent, which
//! languages the site has, and which page/language combinations exist.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AppError, Result};

/// `l18n_cfg` bit: the page is hidden in the default language.
pub const L18N_HIDE_DEFAULT: u8 = 1;
/// `l18n_cfg` bit: the page is hidden in languages it has no translation for.
pub const L18N_HIDE_UNTRANSLATED: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteLanguage {
    pub id: i64,
    /// Path prefix such as "/" or "/de/".
    #[serde(default = "default_language_base")]
    pub base: String,
    #[serde(default)]
    pub title: String,
}

fn default_language_base() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitePage {
    pub id: i64,
    #[serde(default)]
    pub parent: i64,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub l18n_cfg: u8,
    /// Language ids this page has a translation for.
    #[serde(default)]
    pub translations: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host, e.g. "https://example.com". A bare "/" leaves routes relative.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_languages")]
    pub languages: Vec<SiteLanguage>,
    #[serde(default)]
    pub pages: Vec<SitePage>,
}

fn default_base_url() -> String {
    "/".to_string()
}

fn default_languages() -> Vec<SiteLanguage> {
    vec![SiteLanguage {
        id: 0,
        base: "/".to_string(),
        title: "Default".to_string(),
    }]
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            languages: default_languages(),
            pages: Vec::new(),
        }
    }
}

/// Indexed, read-only view of a [`SiteConfig`].
#[derive(Debug, Clone)]
pub struct SiteTree {
    base_url: String,
    languages: Vec<SiteLanguage>,
    pages: HashMap<i64, SitePage>,
    children: HashMap<i64, Vec<i64>>,
}

impl SiteTree {
    pub fn new(config: SiteConfig) -> Self {
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for page in &config.pages {
            children.entry(page.parent).or_default().push(page.id);
        }
        for ids in children.values_mut() {
            ids.sort_unstable();
        }

        let mut languages = config.languages;
        languages.sort_by_key(|l| l.id);

        Self {
            base_url: config.base_url,
            languages,
            pages: config.pages.into_iter().map(|p| (p.id, p)).collect(),
            children,
        }
    }

    pub fn languages(&self) -> &[SiteLanguage] {
        &self.languages
    }

    pub fn language(&self, language_id: i64) -> Option<&SiteLanguage> {
        self.languages.iter().find(|l| l.id == language_id)
    }

    pub fn page(&self, page_id: i64) -> Option<&SitePage> {
        self.pages.get(&page_id)
    }

    pub fn keyword(&self, page_id: i64) -> Option<&str> {
        self.page(page_id)
            .and_then(|p| p.keyword.as_deref())
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Whether `page_id` is served in `language_id` at all.
    pub fn is_available_in_language(&self, page_id: i64, language_id: i64) -> bool {
        let Some(page) = self.page(page_id) else {
            return false;
        };
        if self.language(language_id).is_none() {
            return false;
        }
        if language_id == 0 {
            return page.l18n_cfg & L18N_HIDE_DEFAULT == 0;
        }
        page.translations.contains(&language_id) && page.l18n_cfg & L18N_HIDE_UNTRANSLATED == 0
    }

    /// `root` plus its descendants down to `depth` levels, in tree order.
    pub fn page_ids_recursive(&self, root: i64, depth: u32) -> Vec<i64> {
        let mut ids = vec![root];
        if depth == 0 {
            return ids;
        }
        if let Some(children) = self.children.get(&root) {
            for child in children {
                if *child != root {
                    ids.extend(self.page_ids_recursive(*child, depth - 1));
                }
            }
        }
        ids
    }

    /// Public route of a page in a language. Absolute only when `base_url` is.
    pub fn route(&self, page_id: i64, language_id: i64) -> Result<String> {
        if self.page(page_id).is_none() {
            return Err(AppError::url_resolution(format!(
                "Could not build absolute URL for page ID {}. (Page does not exist)",
                page_id
            )));
        }
        let language = self.language(language_id).ok_or_else(|| {
            AppError::url_resolution(format!(
                "Could not build absolute URL for page ID {}. (Language {} is not configured)",
                page_id, language_id
            ))
        })?;

        let mut slugs = Vec::new();
        let mut current = self.page(page_id);
        let mut hops = 0;
        while let Some(page) = current {
            let slug = page.slug.trim_matches('/');
            if !slug.is_empty() {
                slugs.push(slug);
            }
            hops += 1;
            if page.parent == 0 || page.parent == page.id || hops > self.pages.len() {
                break;
            }
            current = self.page(page.parent);
        }
        slugs.reverse();

        let mut path = format!("/{}", language.base.trim_matches('/'));
        if !path.ends_with('/') {
            path.push('/');
        }
        if !slugs.is_empty() {
            path.push_str(&slugs.join("/"));
            path.push('/');
        }

        Ok(format!("{}{}", self.base_url.trim_end_matches('/'), path))
    }
}
