//! Prompt builders and response cleanup for the text model.

use {
    rand::seq::IndexedRandom,
    vigil_common::{JobType, Language},
};

const THEMES_EN: &[&str] = &[
    "hope",
    "gratitude",
    "strength",
    "peace",
    "clarity",
    "healing",
    "forgiveness",
];
const THEMES_PT: &[&str] = &[
    "esperança",
    "gratidão",
    "força",
    "paz",
    "clareza",
    "cura",
    "perdão",
];
const THEMES_ES: &[&str] = &[
    "esperanza",
    "gratitud",
    "fuerza",
    "paz",
    "claridad",
    "sanación",
    "perdón",
];

/// Built-in themes for a language.
#[must_use]
pub fn builtin_themes(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => THEMES_EN,
        Language::Pt => THEMES_PT,
        Language::Es => THEMES_ES,
    }
}

/// `theme` trimmed, or a random built-in theme when it is blank.
#[must_use]
pub fn theme_or_random(theme: &str, language: Language) -> String {
    let theme = theme.trim();
    if !theme.is_empty() {
        return theme.to_string();
    }
    builtin_themes(language)
        .choose(&mut rand::rng())
        .map_or_else(|| "hope".to_string(), |t| (*t).to_string())
}

/// Output token window `(min, max)` for a long script of the given length.
#[must_use]
pub fn token_budget(duration_minutes: u32) -> (u32, u32) {
    match duration_minutes {
        5 => (4000, 4200),
        15 => (12000, 12200),
        20 => (16000, 16200),
        _ => (8000, 8200),
    }
}

/// Strip a surrounding markdown code fence (with or without a language tag).
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[must_use]
pub fn research(language: Language, job_type: JobType) -> String {
    match language {
        Language::Pt => {
            let scope = match job_type {
                JobType::Long => {
                    "Identifique um tema principal e três subtemas relacionados que possam ser explorados como capítulos em um vídeo de 10 minutos."
                },
                JobType::Short => {
                    "Responda com um único tema conciso, ideal para um vídeo de 30 segundos no TikTok."
                },
            };
            format!(
                "Pesquise no Google por um tópico ou sentimento de alta relevância e engajamento para o público cristão no Brasil *hoje*. \
                 Foque em temas de esperança, superação, fé ou passagens bíblicas que estão sendo muito comentadas.\n\
                 {scope}\n\
                 Sua resposta DEVE ser um único objeto JSON, sem texto ou formatação markdown antes ou depois.\n\
                 O JSON deve ter a chave \"theme\" (string) e a chave \"subthemes\": um array de exatamente 3 strings para vídeos longos, ou vazio para vídeos curtos."
            )
        },
        Language::Es => {
            let scope = match job_type {
                JobType::Long => {
                    "Identifica un tema principal y tres subtemas relacionados que puedan ser explorados como capítulos en un video de 10 minutos."
                },
                JobType::Short => {
                    "Responde con un único tema conciso, ideal para un video de 30 segundos en TikTok."
                },
            };
            format!(
                "Busca en Google un tema o sentimiento de alta relevancia y engagement para el público cristiano en España y Latinoamérica *hoy*. \
                 Céntrate en temas de esperanza, superación, fe o pasajes bíblicos que estén siendo muy comentados.\n\
                 {scope}\n\
                 Tu respuesta DEBE ser un único objeto JSON, sin texto ni formato markdown antes o después.\n\
                 El JSON debe tener la clave \"theme\" (string) y la clave \"subthemes\": un array de exactamente 3 strings para videos largos, o vacío para videos cortos."
            )
        },
        Language::En => {
            let scope = match job_type {
                JobType::Long => {
                    "Identify a main theme and three related sub-themes that can be explored as chapters in a 10-minute video."
                },
                JobType::Short => {
                    "Respond with a single, concise theme, ideal for a 30-second TikTok video."
                },
            };
            format!(
                "Search Google for a high-relevance and engaging topic or sentiment for the Christian audience in the United States *today*. \
                 Focus on themes of hope, overcoming challenges, faith, or biblical passages that are being widely discussed.\n\
                 {scope}\n\
                 Your response MUST be a single JSON object with no text or markdown formatting before or after it.\n\
                 The JSON must have the key \"theme\" (string) and the key \"subthemes\": an array of exactly 3 strings for long videos, or empty for short videos."
            )
        },
    }
}

#[must_use]
pub fn long_script(theme: &str, language: Language, duration_minutes: u32) -> String {
    let (min_tokens, max_tokens) = token_budget(duration_minutes);
    format!(
        r#"You are two Master Guides of faith in Prayer: "Roberta Erickson" and "Milton Dilts". Both of you are trained in advanced Neuro-Linguistic Programming and are masters of Ericksonian Hypnosis through Metaphors.
You specialize in modeling the wisdom of Jesus Christ, Solomon, and David.
Your response must be a DIALOGUE between the two speakers, written in this language: {language}.
Each line MUST be prefixed with the speaker's name, like "Roberta Erickson:" or "Milton Dilts:".

TONE AND STYLE: therapeutic, deeply empathetic, and spiritually profound, rich in allegories, metaphors, and symbols, and accessible to a broad mainstream audience.

CORE TECHNIQUES:
1. Weave biblical stories into metaphors that resonate with everyday life.
2. Create psychological anchors, for example connecting peace to a deep breath.
3. Mirror the way Solomon, David, and Jesus think and make it practical for modern challenges.
4. Use vivid sensory language to guide internal visualizations.
5. Seamlessly invite listeners to subscribe to "Fé em 10 Minutos" and "Faith in 10 Minutes".

LENGTH: the dialogue is a {duration_minutes}-minute guided prayer. The response MUST contain between {min_tokens} and {max_tokens} tokens and MUST reach a complete, natural ending.

The central theme for this prayer is: "{theme}".

Begin the dialogue now."#
    )
}

#[must_use]
pub fn short_script(theme: &str, language: Language) -> String {
    format!(
        r#"You are a Master of Guided Prayer, modeling your wisdom on Jesus Christ, King Solomon, and King David.
Your response must be in the language: {language}.

Create a short, powerful prayer (a "prayer pill") of about 3-5 sentences.
The theme is: "{theme}".
The prayer should be concise, heartfelt, and offer a moment of connection or encouragement.
You may include a very short, relevant biblical quote if it fits naturally."#
    )
}

#[must_use]
pub fn social_post(prayer: &str, language: Language) -> String {
    format!(
        r#"Analyze the following prayer written in {language}.
Create a social media post for platforms like Instagram Reels or TikTok.
The response must be a single, valid JSON object with three keys:
1. "title": a very short, catchy, intriguing title (max 10 words).
2. "description": 2-3 sentences expanding on the title with a call to action to watch the video.
3. "hashtags": an array of 5-7 relevant, high-traffic hashtags in the same language, without the '#' symbol.

Prayer:
"""
{prayer}
""""#
    )
}

#[must_use]
pub fn long_post(theme: &str, subthemes: &[String], language: Language, duration_minutes: u32) -> String {
    let chapters = subthemes
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}) {s}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"You are an expert in YouTube SEO and content strategy for a Christian audience.
The main theme of the video is "{theme}". The video is structured with these sub-themes: {chapters}.
The video will be approximately {duration_minutes} minutes long.
Generate the metadata for the upload, in this language: {language}.
The response must be a single, valid JSON object with five keys:
1. "title": a compelling, SEO-optimized title.
2. "description": a detailed description that starts with a hook, includes the three hashtags, and ends with a call to subscribe to "Fé em 10 Minutos" and "Faith in 10 Minutes".
3. "hashtags": an array of exactly 3 hashtags without the '#' symbol.
4. "timestamps": a multiline string of chapter titles: "Intro", the sub-themes, then "Outro". No time codes.
5. "tags": an array of 10-15 keywords and phrases."#
    )
}

#[must_use]
pub fn visual_from_prayer(prayer: &str) -> String {
    format!(
        r#"Based on the following prayer, create a concise, visually descriptive prompt for an AI image generator. Capture the core emotion and symbolism of the prayer in a single sentence. Focus on a powerful, artistic, metaphorical image. Do not include any text in the prompt.

Prayer:
"""
{prayer}
"""

Prompt:"#
    )
}

#[must_use]
pub fn visual_from_post(title: &str, description: &str, script: &str, language: Language) -> String {
    format!(
        r#"You are an expert AI art director. Based on the following post content, create a single, powerful, concise prompt for an AI image generator to create a compelling thumbnail.
The prompt should be visually descriptive, capture the core emotion, and be highly symbolic.
It MUST include the post's title as text rendered prominently in the image.
The entire prompt must be in this language: {language}.

Title: {title}
Description: {description}
Full Script: {script}

Generate one single-sentence prompt, for example: 'An epic cinematic photo of [main subject], with the title "{title}" in bold, dramatic font, [style details].'"#
    )
}
