use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use regex::Regex;
use reqwest::{
    header::{REFERER, USER_AGENT},
    Client as HttpClient,
};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{SynthesisClient, SynthesisConfig, DEFAULT_TIMEOUT_SECS};

const RPC_ID: &str = "jQ1olc";
// The translate endpoint refuses longer inputs.
const MAX_CHUNK_CHARS: usize = 100;
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/47.0.2526.106 Safari/537.36";
const DELIMITERS: &[char] = &[
    '?', '!', '？', '！', '.', ',', '¡', '(', ')', '[', ']', '¿', '…', '‥', '،', ';', ':', '—',
    '。', '，', '、', '：', '\n',
];

pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("af", "Afrikaans"),
    ("am", "Amharic"),
    ("ar", "Arabic"),
    ("bg", "Bulgarian"),
    ("bn", "Bengali"),
    ("bs", "Bosnian"),
    ("ca", "Catalan"),
    ("cs", "Czech"),
    ("cy", "Welsh"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("et", "Estonian"),
    ("eu", "Basque"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("fr-CA", "French (Canada)"),
    ("gl", "Galician"),
    ("gu", "Gujarati"),
    ("ha", "Hausa"),
    ("hi", "Hindi"),
    ("hr", "Croatian"),
    ("hu", "Hungarian"),
    ("id", "Indonesian"),
    ("is", "Icelandic"),
    ("it", "Italian"),
    ("iw", "Hebrew"),
    ("ja", "Japanese"),
    ("jw", "Javanese"),
    ("km", "Khmer"),
    ("kn", "Kannada"),
    ("ko", "Korean"),
    ("la", "Latin"),
    ("lt", "Lithuanian"),
    ("lv", "Latvian"),
    ("ml", "Malayalam"),
    ("mr", "Marathi"),
    ("ms", "Malay"),
    ("my", "Myanmar (Burmese)"),
    ("ne", "Nepali"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pa", "Punjabi (Gurmukhi)"),
    ("pl", "Polish"),
    ("pt", "Portuguese (Brazil)"),
    ("pt-PT", "Portuguese (Portugal)"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("si", "Sinhala"),
    ("sk", "Slovak"),
    ("sq", "Albanian"),
    ("sr", "Serbian"),
    ("su", "Sundanese"),
    ("sv", "Swedish"),
    ("sw", "Swahili"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("th", "Thai"),
    ("tl", "Filipino"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("ur", "Urdu"),
    ("vi", "Vietnamese"),
    ("yue", "Cantonese"),
    ("zh-CN", "Chinese (Simplified)"),
    ("zh-TW", "Chinese (Mandarin/Taiwan)"),
    ("zh", "Chinese (Mandarin)"),
];

/// Maps a requested language onto a supported code.
///
/// Matching is case-insensitive. A regional code such as `en-US` that is not
/// listed itself falls back to its base language.
pub fn resolve_language(lang: &str) -> Result<&'static str> {
    let wanted = lang.trim();
    let lookup = |code: &str| {
        SUPPORTED_LANGUAGES
            .iter()
            .find(|(supported, _)| supported.eq_ignore_ascii_case(code))
            .map(|(supported, _)| *supported)
    };
    lookup(wanted)
        .or_else(|| {
            wanted
                .split_once('-')
                .and_then(|(base, _)| lookup(base))
        })
        .ok_or_else(|| anyhow!("Language not supported: {}", lang))
}

fn is_delimiter(c: char) -> bool {
    DELIMITERS.contains(&c)
}

fn is_blank(piece: &str) -> bool {
    piece.chars().all(|c| c.is_whitespace() || is_delimiter(c))
}

/// Greedily joins parts with single spaces while staying within `max_chars`.
fn pack(parts: impl IntoIterator<Item = String>, max_chars: usize) -> Vec<String> {
    let mut packed = Vec::new();
    let mut current = String::new();
    for part in parts {
        if current.is_empty() {
            current = part;
        } else if current.chars().count() + 1 + part.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&part);
        } else {
            packed.push(std::mem::replace(&mut current, part));
        }
    }
    if !current.is_empty() {
        packed.push(current);
    }
    packed
}

fn fit_to_length(piece: &str, max_chars: usize) -> Vec<String> {
    if piece.chars().count() <= max_chars {
        return vec![piece.to_string()];
    }
    let segments = piece.split_whitespace().flat_map(|word| {
        let chars: Vec<char> = word.chars().collect();
        chars
            .chunks(max_chars)
            .map(|segment| segment.iter().collect::<String>())
            .collect::<Vec<_>>()
    });
    pack(segments, max_chars)
}

/// Splits text into chunks the endpoint accepts, preferring punctuation boundaries.
pub(crate) fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let pieces = text
        .split_inclusive(is_delimiter)
        .map(|piece| piece.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|piece| !is_blank(piece))
        .flat_map(|piece| fit_to_length(&piece, max_chars));
    pack(pieces, max_chars)
}

/// Builds the batchexecute `f.req` payload for one chunk.
pub(crate) fn rpc_envelope(text: &str, lang: &str, slow: bool) -> String {
    let speed = if slow { Value::Bool(true) } else { Value::Null };
    let parameter = json!([text, lang, speed, "null"]).to_string();
    json!([[[RPC_ID, parameter, Value::Null, "generic"]]]).to_string()
}

/// Text-to-speech through the Google Translate web endpoint.
#[derive(Debug)]
pub struct GoogleTtsClient {
    http_client: HttpClient,
    endpoint: String,
    slow: bool,
    audio_pattern: Regex,
}

impl GoogleTtsClient {
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        let tld = config.tld.as_deref().unwrap_or("com");
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            endpoint: format!(
                "https://translate.google.{}/_/TranslateWebserverUi/data/batchexecute",
                tld
            ),
            slow: config.slow.unwrap_or(false),
            audio_pattern: Regex::new(r#"jQ1olc","\[\\"(.*)\\"]"#)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn extract_audio(&self, body: &str) -> Result<Vec<u8>> {
        let payload = body
            .lines()
            .filter(|line| line.contains(RPC_ID))
            .find_map(|line| self.audio_pattern.captures(line))
            .and_then(|captures| captures.get(1))
            .ok_or_else(|| anyhow!("No audio stream in response"))?;
        BASE64_STANDARD
            .decode(payload.as_str())
            .context("invalid audio payload in response")
    }
}

#[async_trait]
impl SynthesisClient for GoogleTtsClient {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>> {
        if text.is_empty() {
            return Err(anyhow!("No text to speak"));
        }
        let lang = resolve_language(lang)?;
        // Punctuation and whitespace alone tokenize to nothing.
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(anyhow!("No text to speak"));
        }

        let mut audio = Vec::new();
        for (index, chunk) in chunks.iter().enumerate() {
            debug!(lang, chunk = index, chars = chunk.chars().count(), "requesting speech chunk");
            let response = self
                .http_client
                .post(&self.endpoint)
                .header(REFERER, "http://translate.google.com/")
                .header(USER_AGENT, BROWSER_USER_AGENT)
                .form(&[("f.req", rpc_envelope(chunk, lang, self.slow))])
                .send()
                .await
                .with_context(|| format!("request to {} failed", self.endpoint))?;

            let status = response.status();
            if !status.is_success() {
                return Err(anyhow!("{} from TTS API", status));
            }
            let body = response.text().await?;
            audio.extend(self.extract_audio(&body)?);
        }
        Ok(audio)
    }
}
