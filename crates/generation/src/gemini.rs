//! Generative Language REST API implementation of [`GenerationGateway`].

use std::time::Duration;

use {
    async_trait::async_trait,
    base64::{Engine, engine::general_purpose::STANDARD as BASE64},
    bytes::Bytes,
    secrecy::{ExposeSecret, Secret},
    serde_json::{Value, json},
    tracing::{debug, info, trace, warn},
    vigil_common::{JobType, Language},
    vigil_config::GeminiConfig,
};

use crate::{
    error::{Error, Result},
    gateway::GenerationGateway,
    prompts,
    speech::{LineSynthesizer, SpeechStream, stream_speech},
    types::{
        AspectRatio, LongFormPost, MetadataRequest, PostMetadata, SocialPost, Topic,
        VisualPromptSource, VoiceAssignment,
    },
};

pub struct GeminiGateway {
    api_key: Secret<String>,
    base_url: String,
    text_model: String,
    speech_model: String,
    image_model: String,
    video_model: String,
    video_poll_interval: Duration,
    video_max_polls: Option<u32>,
    client: reqwest::Client,
}

impl GeminiGateway {
    pub fn new(api_key: Secret<String>, config: &GeminiConfig) -> Self {
        Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            speech_model: config.speech_model.clone(),
            image_model: config.image_model.clone(),
            video_model: config.video_model.clone(),
            video_poll_interval: Duration::from_secs(config.video_poll_interval_secs),
            video_max_polls: config.video_max_polls,
            client: reqwest::Client::new(),
        }
    }

    /// Build a gateway, resolving the API key from the environment or config.
    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().map_err(Error::config)?;
        Ok(Self::new(api_key, config))
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{model}:{method}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let http_resp = request
            .header("x-goog-api-key", self.api_key.expose_secret())
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body = http_resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "gemini API error");
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let resp = http_resp.json::<Value>().await?;
        trace!(response = %resp, "gemini raw response");
        Ok(resp)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        trace!(body = %body, "gemini request body");
        self.send(
            self.client
                .post(url)
                .header("content-type", "application/json")
                .json(body),
        )
        .await
    }

    /// One `generateContent` call on the text model; returns the joined text parts.
    async fn generate_text(
        &self,
        prompt: &str,
        generation_config: Option<Value>,
        search_grounded: bool,
    ) -> Result<String> {
        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        if let Some(config) = generation_config {
            body["generationConfig"] = config;
        }
        if search_grounded {
            body["tools"] = json!([{ "googleSearch": {} }]);
        }

        debug!(model = %self.text_model, search_grounded, "gemini text request");
        let url = self.model_url(&self.text_model, "generateContent");
        let resp = self.post(&url, &body).await?;

        let parts = resp["candidates"][0]["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok(extract_text(&parts).unwrap_or_default())
    }

    async fn poll_operation(&self, name: &str) -> Result<Value> {
        let url = format!("{}/v1beta/{name}", self.base_url);
        self.send(self.client.get(&url)).await
    }
}

/// Join the text parts of a candidate.
fn extract_text(parts: &[Value]) -> Option<String> {
    let texts: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join(""))
    }
}

/// Parse a research response into a [`Topic`].
fn parse_topic(raw: &str) -> Result<Topic> {
    let value: Value = serde_json::from_str(prompts::strip_code_fences(raw))
        .map_err(|e| Error::research(format!("invalid JSON: {e}")))?;

    let theme = value["theme"]
        .as_str()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::research("response has no theme"))?
        .to_string();

    // Exactly three string subthemes, or none.
    let subthemes: Vec<String> = value["subthemes"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let subthemes = if subthemes.len() == 3 {
        subthemes
    } else {
        Vec::new()
    };

    Ok(Topic { theme, subthemes })
}

fn non_empty(text: String, what: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::generation(format!("{what} was empty")));
    }
    Ok(trimmed.to_string())
}

fn video_error(e: Error) -> Error {
    match e {
        Error::Api { status: 404, .. } => Error::video("API key is invalid or expired"),
        other => other,
    }
}

#[async_trait]
impl LineSynthesizer for GeminiGateway {
    async fn synthesize_line(&self, text: &str, voice: Option<&str>) -> Result<Option<Bytes>> {
        let mut generation_config = json!({ "responseModalities": ["AUDIO"] });
        if let Some(voice) = voice {
            generation_config["speechConfig"] = json!({
                "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
            });
        }
        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": generation_config,
        });

        let url = self.model_url(&self.speech_model, "generateContent");
        let resp = self.post(&url, &body).await?;

        let Some(data) = resp["candidates"][0]["content"]["parts"][0]["inlineData"]["data"].as_str()
        else {
            return Ok(None);
        };
        let pcm = BASE64
            .decode(data)
            .map_err(|e| Error::speech(format!("invalid audio payload: {e}")))?;
        Ok(Some(Bytes::from(pcm)))
    }
}

#[async_trait]
impl GenerationGateway for GeminiGateway {
    async fn research_topic(&self, language: Language, job_type: JobType) -> Result<Topic> {
        let prompt = prompts::research(language, job_type);
        let raw = self
            .generate_text(&prompt, None, true)
            .await
            .map_err(Error::research)?;
        let topic = parse_topic(&raw)?;
        info!(lang = %language, job_type = %job_type, theme = %topic.theme, "researched topic");
        Ok(topic)
    }

    async fn generate_long_script(
        &self,
        theme: &str,
        language: Language,
        duration_minutes: u32,
    ) -> Result<String> {
        let theme = prompts::theme_or_random(theme, language);
        let (_, max_tokens) = prompts::token_budget(duration_minutes);
        let prompt = prompts::long_script(&theme, language, duration_minutes);
        let config = json!({ "temperature": 0.9, "maxOutputTokens": max_tokens });

        let script = self
            .generate_text(&prompt, Some(config), false)
            .await
            .map_err(Error::generation)?;
        non_empty(script, "long script")
    }

    async fn generate_short_script(&self, theme: &str, language: Language) -> Result<String> {
        let theme = prompts::theme_or_random(theme, language);
        let prompt = prompts::short_script(&theme, language);
        let script = self
            .generate_text(&prompt, None, false)
            .await
            .map_err(Error::generation)?;
        non_empty(script, "short script")
    }

    async fn generate_metadata(&self, request: MetadataRequest<'_>) -> Result<PostMetadata> {
        let prompt = match request.job_type {
            JobType::Short => {
                let prayer = request
                    .prayer_text
                    .ok_or_else(|| Error::generation("social post requires prayer text"))?;
                prompts::social_post(prayer, request.language)
            },
            JobType::Long => prompts::long_post(
                request.theme,
                request.subthemes,
                request.language,
                request.duration_minutes,
            ),
        };
        let config = json!({ "responseMimeType": "application/json" });
        let raw = self
            .generate_text(&prompt, Some(config), false)
            .await
            .map_err(Error::generation)?;
        let json = prompts::strip_code_fences(&raw);

        let metadata = match request.job_type {
            JobType::Short => serde_json::from_str::<SocialPost>(json).map(PostMetadata::Social),
            JobType::Long => serde_json::from_str::<LongFormPost>(json).map(PostMetadata::LongForm),
        }
        .map_err(|e| Error::generation(format!("invalid post metadata: {e}")))?;
        Ok(metadata)
    }

    fn synthesize_speech(&self, text: String, voices: Option<VoiceAssignment>) -> SpeechStream<'_> {
        stream_speech(self, text, voices)
    }

    async fn synthesize_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<Bytes> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": 1,
                "outputMimeType": "image/png",
                "aspectRatio": aspect_ratio.as_str(),
            },
        });
        let url = self.model_url(&self.image_model, "predict");
        let resp = self.post(&url, &body).await?;

        let data = resp["predictions"][0]["bytesBase64Encoded"]
            .as_str()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| Error::image("no image was generated"))?;
        let png = BASE64
            .decode(data)
            .map_err(|e| Error::image(format!("invalid image payload: {e}")))?;
        if png.is_empty() {
            return Err(Error::image("no image was generated"));
        }
        debug!(bytes = png.len(), aspect_ratio = aspect_ratio.as_str(), "image generated");
        Ok(Bytes::from(png))
    }

    async fn build_visual_prompt(&self, source: VisualPromptSource<'_>) -> Result<String> {
        let (prompt, strip_quotes) = match source {
            VisualPromptSource::Prayer { text } => (prompts::visual_from_prayer(text), true),
            VisualPromptSource::Post {
                title,
                description,
                script,
                language,
            } => (
                prompts::visual_from_post(title, description, script, language),
                false,
            ),
        };
        let raw = self
            .generate_text(&prompt, None, false)
            .await
            .map_err(Error::generation)?;
        let cleaned = if strip_quotes {
            raw.replace('"', "")
        } else {
            raw
        };
        non_empty(cleaned, "visual prompt")
    }

    async fn generate_video(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<String> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": 1,
                "resolution": "720p",
                "aspectRatio": aspect_ratio.as_str(),
            },
        });
        let url = self.model_url(&self.video_model, "predictLongRunning");
        let mut operation = self.post(&url, &body).await.map_err(video_error)?;
        let name = operation["name"]
            .as_str()
            .ok_or_else(|| Error::video("operation has no name"))?
            .to_string();
        info!(operation = %name, "video generation started");

        let mut polls = 0u32;
        while !operation["done"].as_bool().unwrap_or(false) {
            if self.video_max_polls.is_some_and(|max| polls >= max) {
                return Err(Error::video(format!(
                    "operation {name} not finished after {polls} polls"
                )));
            }
            tokio::time::sleep(self.video_poll_interval).await;
            operation = self.poll_operation(&name).await.map_err(video_error)?;
            polls += 1;
            debug!(operation = %name, polls, "polled video operation");
        }

        if operation["error"]["status"].as_str() == Some("NOT_FOUND") {
            return Err(Error::video("API key is invalid or expired"));
        }
        if let Some(message) = operation["error"]["message"].as_str() {
            return Err(Error::video(message));
        }

        operation["response"]["generateVideoResponse"]["generatedSamples"][0]["video"]["uri"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                Error::video("video generation completed, but no download link was found")
            })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::speech::collect_speech,
        rstest::rstest,
        wiremock::{
            Mock, MockServer, ResponseTemplate,
            matchers::{body_partial_json, header, method, path, path_regex},
        },
    };

    fn gateway(server: &MockServer) -> GeminiGateway {
        let config = GeminiConfig {
            base_url: server.uri(),
            video_poll_interval_secs: 0,
            ..Default::default()
        };
        GeminiGateway::new(Secret::new("test-key".into()), &config)
    }

    fn text_response(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
    }

    #[test]
    fn parse_topic_normalizes_subthemes() {
        let topic =
            parse_topic("```json\n{\"theme\": \"Hope\", \"subthemes\": [\"a\", 1, \"b\", \"c\"]}\n```")
                .unwrap();
        assert_eq!(topic.theme, "Hope");
        assert_eq!(topic.subthemes, vec!["a", "b", "c"]);

        let topic = parse_topic("{\"theme\": \"Peace\", \"subthemes\": \"none\"}").unwrap();
        assert!(topic.subthemes.is_empty());
    }

    #[rstest]
    #[case("[\"a\"]")]
    #[case("[\"a\", \"b\"]")]
    #[case("[\"a\", \"b\", 3]")]
    #[case("[\"a\", \"b\", \"c\", \"d\"]")]
    fn parse_topic_drops_subthemes_unless_exactly_three(#[case] subthemes: &str) {
        let raw = format!("{{\"theme\": \"Grace\", \"subthemes\": {subthemes}}}");
        let topic = parse_topic(&raw).unwrap();
        assert_eq!(topic.theme, "Grace");
        assert!(topic.subthemes.is_empty());
    }

    #[test]
    fn parse_topic_requires_theme() {
        assert!(matches!(
            parse_topic("{\"subthemes\": []}"),
            Err(Error::Research { .. })
        ));
        assert!(matches!(parse_topic("not json"), Err(Error::Research { .. })));
    }

    #[tokio::test]
    async fn research_sends_grounded_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({ "tools": [{ "googleSearch": {} }] })))
            .respond_with(text_response(
                "{\"theme\": \"Fé\", \"subthemes\": [\"x\", \"y\", \"z\"]}",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let topic = gateway(&server)
            .research_topic(Language::Pt, JobType::Long)
            .await
            .unwrap();
        assert_eq!(topic.theme, "Fé");
        assert_eq!(topic.subthemes.len(), 3);
    }

    #[tokio::test]
    async fn research_remote_failure_is_research_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .research_topic(Language::En, JobType::Short)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Research { .. }));
    }

    #[tokio::test]
    async fn long_script_uses_token_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "generationConfig": { "temperature": 0.9, "maxOutputTokens": 12200 }
            })))
            .respond_with(text_response("Roberta Erickson: Welcome.\nMilton Dilts: Breathe."))
            .expect(1)
            .mount(&server)
            .await;

        let script = gateway(&server)
            .generate_long_script("hope", Language::En, 15)
            .await
            .unwrap();
        assert!(script.starts_with("Roberta Erickson:"));
    }

    #[tokio::test]
    async fn blank_script_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_response("   \n"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .generate_short_script("peace", Language::Es)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
    }

    #[tokio::test]
    async fn metadata_parses_by_job_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .respond_with(text_response(
                r#"{"title": "Hope", "description": "Watch now.", "hashtags": ["faith"]}"#,
            ))
            .mount(&server)
            .await;

        let gw = gateway(&server);
        let meta = gw
            .generate_metadata(MetadataRequest {
                prayer_text: Some("Lord, give me hope."),
                language: Language::En,
                job_type: JobType::Short,
                theme: "hope",
                subthemes: &[],
                duration_minutes: 10,
            })
            .await
            .unwrap();
        assert_eq!(meta.title(), "Hope");
        assert!(matches!(meta, PostMetadata::Social(_)));

        let err = gw
            .generate_metadata(MetadataRequest {
                prayer_text: None,
                language: Language::En,
                job_type: JobType::Short,
                theme: "hope",
                subthemes: &[],
                duration_minutes: 10,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
    }

    #[tokio::test]
    async fn long_metadata_missing_title_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_response(r#"{"description": "no title"}"#))
            .mount(&server)
            .await;

        let subthemes = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let err = gateway(&server)
            .generate_metadata(MetadataRequest {
                prayer_text: None,
                language: Language::Pt,
                job_type: JobType::Long,
                theme: "fé",
                subthemes: &subthemes,
                duration_minutes: 10,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
    }

    #[tokio::test]
    async fn speech_decodes_inline_audio_per_line() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"))
            .and(body_partial_json(json!({
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": { "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Kore" } } }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{
                    "inlineData": { "mimeType": "audio/L16", "data": BASE64.encode([1u8, 0]) }
                }] } }]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let gw = gateway(&server);
        let pcm = collect_speech(
            gw.synthesize_speech("Line one.\nLine two.".into(), Some(VoiceAssignment::single("Kore"))),
        )
        .await
        .unwrap();
        assert_eq!(&pcm[..], &[1, 0, 1, 0]);
    }

    #[tokio::test]
    async fn image_returns_png_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/imagen-4.0-generate-001:predict"))
            .and(body_partial_json(json!({ "parameters": { "aspectRatio": "9:16" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{ "bytesBase64Encoded": BASE64.encode(b"\x89PNG") }]
            })))
            .mount(&server)
            .await;

        let png = gateway(&server)
            .synthesize_image("a candle", AspectRatio::Portrait)
            .await
            .unwrap();
        assert_eq!(&png[..], b"\x89PNG");
    }

    #[tokio::test]
    async fn empty_image_response_is_image_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "predictions": [] })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .synthesize_image("a candle", AspectRatio::Landscape)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Image { .. }));
    }

    #[tokio::test]
    async fn prayer_visual_prompt_strips_quotes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_response("  \"A lighthouse at dawn\"  "))
            .mount(&server)
            .await;

        let prompt = gateway(&server)
            .build_visual_prompt(VisualPromptSource::Prayer { text: "Lord..." })
            .await
            .unwrap();
        assert_eq!(prompt, "A lighthouse at dawn");
    }

    #[tokio::test]
    async fn video_polls_until_done() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":predictLongRunning$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/op-1", "done": false
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1beta/operations/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/op-1",
                "done": true,
                "response": { "generateVideoResponse": { "generatedSamples": [
                    { "video": { "uri": "https://example.test/video.mp4" } }
                ] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let uri = gateway(&server)
            .generate_video("sunrise", AspectRatio::Portrait)
            .await
            .unwrap();
        assert_eq!(uri, "https://example.test/video.mp4");
    }

    #[tokio::test]
    async fn video_poll_cap_and_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/slow", "done": false
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operations/slow", "done": false
            })))
            .mount(&server)
            .await;

        let config = GeminiConfig {
            base_url: server.uri(),
            video_poll_interval_secs: 0,
            video_max_polls: Some(2),
            ..Default::default()
        };
        let gw = GeminiGateway::new(Secret::new("k".into()), &config);
        let err = gw.generate_video("x", AspectRatio::Landscape).await.unwrap_err();
        assert!(err.to_string().contains("after 2 polls"));

        let missing = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("NOT_FOUND"))
            .mount(&missing)
            .await;
        let err = gateway(&missing)
            .generate_video("x", AspectRatio::Landscape)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "video generation failed: API key is invalid or expired"
        );
    }
}
