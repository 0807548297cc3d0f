// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Turn rendered feed items into normalized posts.
//!
//! Each field is an ordered chain of [`FieldSource`]s compiled once per
//! run; the first source yielding a non-empty value wins. A source that
//! fails to read is logged and skipped, so a bad field never costs the item
//! and a bad item never costs its siblings.

use crate::attachments::AttachmentResolver;
use crate::config::{ExtractionConfig, FieldSource, OverlayConfig};
use crate::error::HarvestError;
use crate::session::{BrowserSession, PageElement};
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One feed entry, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPost {
    pub teacher: String,
    pub datetime: String,
    /// May contain simple markup.
    pub content: String,
    /// In card encounter order.
    pub attachments: Vec<String>,
}

/// Output of one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub posts: Vec<NormalizedPost>,
    /// Items dropped by the category filter.
    pub skipped: usize,
    /// Attachment cards that produced no URL.
    pub attachments_missed: usize,
}

#[derive(Debug)]
enum Step {
    Text {
        locator: String,
        stop_if_present: bool,
    },
    Markup {
        locator: String,
        stop_if_present: bool,
    },
    DetailLine {
        locator: String,
        index: usize,
        prefix: Option<Regex>,
    },
}

impl Step {
    fn compile(source: &FieldSource) -> Result<Self, HarvestError> {
        Ok(match source {
            FieldSource::Text {
                locator,
                stop_if_present,
            } => Step::Text {
                locator: locator.clone(),
                stop_if_present: *stop_if_present,
            },
            FieldSource::Markup {
                locator,
                stop_if_present,
            } => Step::Markup {
                locator: locator.clone(),
                stop_if_present: *stop_if_present,
            },
            FieldSource::DetailLine {
                locator,
                index,
                strip_prefix,
            } => {
                let prefix = strip_prefix
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .map(|p| Regex::new(&format!(r"(?i)^{}\s*", regex::escape(p.trim()))))
                    .transpose()
                    .map_err(|e| HarvestError::Config(format!("bad strip_prefix: {e}")))?;
                Step::DetailLine {
                    locator: locator.clone(),
                    index: *index,
                    prefix,
                }
            }
        })
    }

    /// Whether an existing but empty element ends the chain.
    fn stops_if_present(&self) -> bool {
        match self {
            Step::Text {
                stop_if_present, ..
            }
            | Step::Markup {
                stop_if_present, ..
            } => *stop_if_present,
            Step::DetailLine { .. } => false,
        }
    }

    /// The trimmed value, or `None` when the source element is absent.
    async fn read(&self, item: &dyn PageElement) -> Result<Option<String>> {
        match self {
            Step::Text { locator, .. } => match item.find(locator).await? {
                Some(el) => Ok(Some(el.text().await?.trim().to_string())),
                None => Ok(None),
            },
            Step::Markup { locator, .. } => match item.find(locator).await? {
                Some(el) => Ok(Some(el.markup().await?.trim().to_string())),
                None => Ok(None),
            },
            Step::DetailLine {
                locator,
                index,
                prefix,
            } => {
                let lines = item.find_all(locator).await?;
                let Some(line) = lines.get(*index) else {
                    return Ok(None);
                };
                let text = line.text().await?;
                Ok(Some(clean_detail_line(&text, prefix.as_ref())))
            }
        }
    }
}

fn clean_detail_line(text: &str, prefix: Option<&Regex>) -> String {
    let text = text.trim();
    match prefix {
        Some(re) => re.replace(text, "").trim().to_string(),
        None => text.to_string(),
    }
}

/// An ordered list of extraction steps for one field.
#[derive(Debug)]
struct FieldChain {
    field: &'static str,
    steps: Vec<Step>,
}

impl FieldChain {
    fn compile(field: &'static str, sources: &[FieldSource]) -> Result<Self, HarvestError> {
        let steps = sources.iter().map(Step::compile).collect::<Result<_, _>>()?;
        Ok(Self { field, steps })
    }

    async fn extract(&self, item: &dyn PageElement) -> String {
        for (position, step) in self.steps.iter().enumerate() {
            match step.read(item).await {
                Ok(Some(value)) if !value.is_empty() || step.stops_if_present() => return value,
                Ok(_) => {}
                Err(e) => {
                    warn!(field = self.field, step = position, error = %e, "field source failed")
                }
            }
        }
        String::new()
    }
}

/// Category filter, field chains and attachment resolution in one pass.
pub struct ExtractionPipeline {
    category_locator: String,
    excluded: Vec<String>,
    teacher: FieldChain,
    datetime: FieldChain,
    content: FieldChain,
    attachments: AttachmentResolver,
}

impl ExtractionPipeline {
    pub fn new(config: &ExtractionConfig, overlay: &OverlayConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            category_locator: config.category_locator.clone(),
            excluded: config
                .excluded_categories
                .iter()
                .map(|c| normalize_category(c))
                .collect(),
            teacher: FieldChain::compile("teacher", &config.teacher)?,
            datetime: FieldChain::compile("datetime", &config.datetime)?,
            content: FieldChain::compile("content", &config.content)?,
            attachments: AttachmentResolver::new(config, overlay),
        })
    }

    /// Extract every item, preserving input order.
    pub async fn extract(
        &self,
        session: &dyn BrowserSession,
        items: &[Box<dyn PageElement>],
    ) -> Extraction {
        let mut extraction = Extraction::default();

        for (index, item) in items.iter().enumerate() {
            let item = item.as_ref();
            if let Some(category) = self.excluded_category(item).await {
                debug!(item = index, %category, "skipping excluded category");
                extraction.skipped += 1;
                continue;
            }

            let teacher = self.teacher.extract(item).await;
            let datetime = self.datetime.extract(item).await;
            let content = self.content.extract(item).await;
            if teacher.is_empty() || datetime.is_empty() {
                debug!(item = index, "author or timestamp missing after all fallbacks");
            }

            let attachments = self.attachments.resolve(session, item).await;
            extraction.attachments_missed += attachments.missed;

            debug!(item = index, attachments = attachments.urls.len(), "item extracted");
            extraction.posts.push(NormalizedPost {
                teacher,
                datetime,
                content,
                attachments: attachments.urls,
            });
        }

        extraction
    }

    /// The item's category, if it is one of the excluded ones.
    async fn excluded_category(&self, item: &dyn PageElement) -> Option<String> {
        let title = match item.find(&self.category_locator).await {
            Ok(Some(title)) => title,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "could not read category title");
                return None;
            }
        };
        let category = match title.text().await {
            Ok(text) => normalize_category(&text),
            Err(e) => {
                warn!(error = %e, "could not read category title");
                return None;
            }
        };
        self.excluded.contains(&category).then_some(category)
    }
}

fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_prefix() -> Regex {
        match Step::compile(&FieldSource::DetailLine {
            locator: "li".into(),
            index: 0,
            strip_prefix: Some("By".into()),
        })
        .unwrap()
        {
            Step::DetailLine { prefix, .. } => prefix.unwrap(),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_strip_by_prefix_case_insensitive() {
        let re = by_prefix();
        assert_eq!(clean_detail_line("By Jane Doe", Some(&re)), "Jane Doe");
        assert_eq!(clean_detail_line("  by   Jane Doe ", Some(&re)), "Jane Doe");
        assert_eq!(clean_detail_line("BYJane", Some(&re)), "Jane");
        assert_eq!(clean_detail_line("Jane Byrne", Some(&re)), "Jane Byrne");
        assert_eq!(clean_detail_line(" 2024-01-01 10:00 ", None), "2024-01-01 10:00");
    }

    #[test]
    fn test_prefix_is_literal() {
        let step = Step::compile(&FieldSource::DetailLine {
            locator: "li".into(),
            index: 0,
            strip_prefix: Some("(a)".into()),
        })
        .unwrap();
        let Step::DetailLine { prefix, .. } = step else {
            panic!("expected detail line");
        };
        assert_eq!(clean_detail_line("(a) value", prefix.as_ref()), "value");
        assert_eq!(clean_detail_line("a value", prefix.as_ref()), "a value");
    }

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category("  Resource \n"), "resource");
        assert_eq!(normalize_category("RESOURCE"), "resource");
    }
}
