//! Assembles one kit: text assets, then media, then blobs and a history record.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    bytes::Bytes,
    tracing::{debug, info},
    vigil_common::JobType,
    vigil_config::VoicesConfig,
    vigil_generation::{
        AspectRatio, GenerationGateway, MetadataRequest, PostMetadata, VisualPromptSource,
        VoiceAssignment, collect_speech, encode_wav, speech_spec,
    },
};

use crate::{
    blob::BlobStore,
    error::{Error, Result},
    history::HistoryStore,
    types::{KitRequest, MarketingHistoryItem, audio_blob_key, history_id, image_blob_key},
};

pub struct KitAssembler {
    gateway: Arc<dyn GenerationGateway>,
    blobs: Arc<dyn BlobStore>,
    history: Arc<dyn HistoryStore>,
    voices: VoicesConfig,
    long_duration_minutes: u32,
}

impl KitAssembler {
    pub fn new(
        gateway: Arc<dyn GenerationGateway>,
        blobs: Arc<dyn BlobStore>,
        history: Arc<dyn HistoryStore>,
        voices: VoicesConfig,
        long_duration_minutes: u32,
    ) -> Self {
        Self {
            gateway,
            blobs,
            history,
            voices,
            long_duration_minutes,
        }
    }

    /// Produce a kit and append it to history.
    ///
    /// Nothing is written unless both text and media assets succeed.
    pub async fn assemble_kit(&self, request: KitRequest) -> Result<MarketingHistoryItem> {
        let lang = request.language;
        let job_type = request.job_type;
        debug!(lang = %lang, job_type = %job_type, theme = %request.theme, "assembling kit");

        let (script, metadata) = self.text_assets(&request).await.map_err(Error::asset)?;
        let (audio, image) = self
            .media_assets(&request, &script, &metadata)
            .await
            .map_err(Error::media)?;

        let timestamp = now_ms();
        let id = history_id(timestamp, lang, job_type);
        let audio_key = audio_blob_key(&id);
        let image_key = image_blob_key(&id);
        tokio::try_join!(
            self.blobs.set(&audio_key, audio),
            self.blobs.set(&image_key, image)
        )?;

        let (social_post, long_post) = metadata.into_parts();
        let item = MarketingHistoryItem {
            id,
            timestamp,
            job_type,
            language: lang,
            theme: request.theme,
            subthemes: request.subthemes,
            prayer_text: script,
            social_post,
            long_post,
            audio_blob_key: audio_key,
            image_blob_key: image_key,
            is_downloaded: false,
        };
        self.history.insert(item.clone()).await?;

        info!(id = %item.id, lang = %lang, job_type = %job_type, "kit recorded");
        Ok(item)
    }

    async fn text_assets(
        &self,
        request: &KitRequest,
    ) -> vigil_generation::Result<(String, PostMetadata)> {
        let metadata_request = MetadataRequest {
            prayer_text: None,
            language: request.language,
            job_type: request.job_type,
            theme: &request.theme,
            subthemes: &request.subthemes,
            duration_minutes: self.long_duration_minutes,
        };

        let (script, metadata) = match request.job_type {
            JobType::Long => {
                tokio::try_join!(
                    self.gateway.generate_long_script(
                        &request.theme,
                        request.language,
                        self.long_duration_minutes
                    ),
                    self.gateway.generate_metadata(metadata_request)
                )?
            },
            JobType::Short => {
                let script = self
                    .gateway
                    .generate_short_script(&request.theme, request.language)
                    .await?;
                let metadata = self
                    .gateway
                    .generate_metadata(MetadataRequest {
                        prayer_text: Some(&script),
                        ..metadata_request
                    })
                    .await?;
                (script, metadata)
            },
        };

        if script.trim().is_empty() {
            return Err(vigil_generation::Error::generation("script was empty"));
        }
        Ok((script, metadata))
    }

    async fn media_assets(
        &self,
        request: &KitRequest,
        script: &str,
        metadata: &PostMetadata,
    ) -> vigil_generation::Result<(Bytes, Bytes)> {
        let voices = match request.job_type {
            JobType::Long => Some(VoiceAssignment::new(self.voices.long_speakers.clone())),
            JobType::Short => self.voices.short_voice.clone().map(VoiceAssignment::single),
        };

        let audio = async {
            let pcm = collect_speech(self.gateway.synthesize_speech(script.to_string(), voices)).await?;
            encode_wav(&pcm, speech_spec())
        };

        let image = async {
            if let Some(shared) = &request.shared_image {
                return Ok(shared.clone());
            }
            let prompt = self
                .gateway
                .build_visual_prompt(VisualPromptSource::Post {
                    title: metadata.title(),
                    description: metadata.description(),
                    script,
                    language: request.language,
                })
                .await?;
            self.gateway
                .synthesize_image(&prompt, AspectRatio::for_job(request.job_type))
                .await
        };

        tokio::try_join!(audio, image)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{blob::InMemoryBlobStore, history::InMemoryHistoryStore},
        vigil_common::Language,
        vigil_generation::testing::{StubGateway, StubOp},
    };

    struct Harness {
        gateway: Arc<StubGateway>,
        blobs: Arc<InMemoryBlobStore>,
        history: Arc<InMemoryHistoryStore>,
        assembler: KitAssembler,
    }

    fn harness() -> Harness {
        let gateway = Arc::new(StubGateway::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let history = Arc::new(InMemoryHistoryStore::new());
        let assembler = KitAssembler::new(
            gateway.clone(),
            blobs.clone(),
            history.clone(),
            VoicesConfig::default(),
            10,
        );
        Harness {
            gateway,
            blobs,
            history,
            assembler,
        }
    }

    fn short(language: Language) -> KitRequest {
        KitRequest {
            language,
            job_type: JobType::Short,
            theme: "peace".into(),
            subthemes: vec![],
            shared_image: None,
        }
    }

    #[tokio::test]
    async fn short_kit_writes_blobs_then_record() {
        let h = harness();
        let item = h.assembler.assemble_kit(short(Language::Es)).await.unwrap();

        assert_eq!(item.job_type, JobType::Short);
        assert!(item.social_post.is_some());
        assert!(item.long_post.is_none());
        assert_eq!(item.prayer_text, "Lord, grant me peace.\nAmen.");
        assert!(!item.is_downloaded);

        let audio = h.blobs.get(&item.audio_blob_key).await.unwrap().unwrap();
        assert_eq!(&audio[..4], b"RIFF");
        let image = h.blobs.get(&item.image_blob_key).await.unwrap().unwrap();
        assert_eq!(image, Bytes::from_static(b"png-1-9:16"));

        assert_eq!(h.gateway.count(StubOp::VisualPrompt), 1);
        assert_eq!(h.history.list().await.unwrap(), vec![item]);
    }

    #[tokio::test]
    async fn shared_image_skips_image_generation() {
        let h = harness();
        let shared = Bytes::from_static(b"shared-png");
        let item = h
            .assembler
            .assemble_kit(KitRequest {
                language: Language::En,
                job_type: JobType::Long,
                theme: "hope".into(),
                subthemes: vec!["a".into(), "b".into(), "c".into()],
                shared_image: Some(shared.clone()),
            })
            .await
            .unwrap();

        assert_eq!(h.gateway.count(StubOp::Image), 0);
        assert_eq!(h.gateway.count(StubOp::VisualPrompt), 0);
        assert_eq!(h.gateway.count(StubOp::LongScript), 1);
        assert_eq!(h.blobs.get(&item.image_blob_key).await.unwrap().unwrap(), shared);

        let post = item.long_post.unwrap();
        assert_eq!(post.timestamps, "Intro\na\nb\nc\nOutro");
        assert_eq!(item.subthemes.len(), 3);
    }

    #[tokio::test]
    async fn silent_speech_is_media_error_without_record() {
        let h = harness();
        h.gateway.silence_speech();

        let err = h.assembler.assemble_kit(short(Language::Pt)).await.unwrap_err();
        assert!(matches!(err, Error::Media { .. }));
        assert!(h.history.list().await.unwrap().is_empty());
        assert!(h.blobs.is_empty());
    }

    #[tokio::test]
    async fn script_failure_is_asset_error() {
        let h = harness();
        h.gateway.fail(StubOp::ShortScript);

        let err = h.assembler.assemble_kit(short(Language::Pt)).await.unwrap_err();
        assert!(matches!(err, Error::Asset { .. }));
        assert_eq!(h.gateway.count(StubOp::Metadata), 0);
        assert!(h.history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_failure_is_media_error() {
        let h = harness();
        h.gateway.fail(StubOp::Image);

        let err = h.assembler.assemble_kit(short(Language::En)).await.unwrap_err();
        assert!(matches!(err, Error::Media { .. }));
        assert!(h.blobs.is_empty());
    }
}
