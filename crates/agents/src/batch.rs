//! Turns scheduler firings into kits: the multi-language long batch and the
//! single-language short job.

use std::sync::Arc;

use {
    async_trait::async_trait,
    bytes::Bytes,
    tracing::{error, info, warn},
    vigil_common::{JobType, Language},
    vigil_config::AgentConfig,
    vigil_cron::{InFlightSet, JobRunner},
    vigil_generation::{AspectRatio, GenerationGateway, VisualPromptSource},
    vigil_kit::{KitAssembler, KitRequest, MarketingHistoryItem},
};

use crate::error::{Error, Result};

/// Outcome of a completed long batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub theme: String,
    /// History ids, in batch language order.
    pub item_ids: Vec<String>,
}

pub struct BatchCoordinator {
    gateway: Arc<dyn GenerationGateway>,
    assembler: KitAssembler,
    in_flight: InFlightSet,
    primary_language: Language,
    languages: Vec<Language>,
    long_duration_minutes: u32,
}

impl BatchCoordinator {
    pub fn new(
        gateway: Arc<dyn GenerationGateway>,
        assembler: KitAssembler,
        in_flight: InFlightSet,
        agent: &AgentConfig,
    ) -> Self {
        Self {
            gateway,
            assembler,
            in_flight,
            primary_language: agent.primary_language,
            languages: agent.languages.clone(),
            long_duration_minutes: agent.long_duration_minutes,
        }
    }

    /// One long kit per configured language, all sharing a single image.
    ///
    /// Research and the shared image are produced once, in the primary
    /// language. Kits are assembled in order; the first failure stops the
    /// batch and earlier kits keep their records.
    pub async fn run_long_batch(&self) -> Result<BatchReport> {
        let _guard = self
            .in_flight
            .begin(self.languages.iter().map(|l| JobType::Long.tag(*l)));
        let primary = self.primary_language;
        info!(primary = %primary, languages = ?self.languages, "long batch started");

        let topic = self
            .gateway
            .research_topic(primary, JobType::Long)
            .await
            .map_err(Error::research)?;
        let shared_image = self
            .shared_image(&topic.theme)
            .await
            .map_err(Error::shared_asset)?;

        let mut item_ids = Vec::with_capacity(self.languages.len());
        for &language in &self.languages {
            let request = KitRequest {
                language,
                job_type: JobType::Long,
                theme: topic.theme.clone(),
                subthemes: topic.subthemes.clone(),
                shared_image: Some(shared_image.clone()),
            };
            let item = self.assembler.assemble_kit(request).await.inspect_err(|e| {
                warn!(
                    lang = %language,
                    completed = item_ids.len(),
                    error = %e,
                    "long kit failed, abandoning remaining languages"
                );
            })?;
            item_ids.push(item.id);
        }

        info!(theme = %topic.theme, items = item_ids.len(), "long batch finished");
        Ok(BatchReport {
            theme: topic.theme,
            item_ids,
        })
    }

    /// Research and assemble one short kit.
    pub async fn run_short_job(&self, language: Language) -> Result<MarketingHistoryItem> {
        let _guard = self.in_flight.begin([JobType::Short.tag(language)]);
        info!(lang = %language, "short job started");

        let topic = self
            .gateway
            .research_topic(language, JobType::Short)
            .await
            .map_err(Error::research)?;
        let item = self
            .assembler
            .assemble_kit(KitRequest {
                language,
                job_type: JobType::Short,
                theme: topic.theme,
                subthemes: topic.subthemes,
                shared_image: None,
            })
            .await?;

        info!(lang = %language, id = %item.id, "short job finished");
        Ok(item)
    }

    /// Landscape image from a throwaway primary-language script.
    async fn shared_image(&self, theme: &str) -> vigil_generation::Result<Bytes> {
        let script = self
            .gateway
            .generate_long_script(theme, self.primary_language, self.long_duration_minutes)
            .await?;
        let prompt = self
            .gateway
            .build_visual_prompt(VisualPromptSource::Prayer { text: &script })
            .await?;
        self.gateway
            .synthesize_image(&prompt, AspectRatio::Landscape)
            .await
    }
}

#[async_trait]
impl JobRunner for BatchCoordinator {
    async fn run_long_batch(&self) {
        if let Err(e) = Self::run_long_batch(self).await {
            error!(error = %e, "long batch failed");
        }
    }

    async fn run_short_job(&self, language: Language) {
        if let Err(e) = Self::run_short_job(self, language).await {
            error!(lang = %language, error = %e, "short job failed");
        }
    }
}
