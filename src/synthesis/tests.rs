use super::google::{rpc_envelope, split_text};
use super::*;
use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;

#[tokio::test]
async fn test_mock_synthesis_client() {
    let mut mock_client = MockSynthesisClient::new();
    mock_client
        .expect_synthesize()
        .withf(|text, lang| text == "Hello world" && lang == "en")
        .times(1)
        .returning(|text, _lang| Ok(vec![1u8; text.len() * 100]));

    let client: Arc<dyn SynthesisClient> = Arc::new(mock_client);
    let audio = client.synthesize("Hello world", "en").await.unwrap();
    assert_eq!(audio.len(), "Hello world".len() * 100);
}

#[test]
fn test_resolve_language() {
    assert_eq!(resolve_language("en").unwrap(), "en");
    assert_eq!(resolve_language("EN").unwrap(), "en");
    assert_eq!(resolve_language("zh-cn").unwrap(), "zh-CN");
    assert_eq!(resolve_language("en-US").unwrap(), "en");
    assert_eq!(resolve_language("pt-PT").unwrap(), "pt-PT");

    let err = resolve_language("xx").unwrap_err();
    assert_eq!(err.to_string(), "Language not supported: xx");
    assert!(resolve_language("").is_err());
}

#[test]
fn test_split_text_short_input() {
    assert_eq!(split_text("Hello world", 100), vec!["Hello world"]);
    assert_eq!(
        split_text("  Hello,\n   world.  ", 100),
        vec!["Hello, world."]
    );
}

#[test]
fn test_split_text_nothing_to_speak() {
    assert!(split_text("", 100).is_empty());
    assert!(split_text("   \n\t ", 100).is_empty());
    assert!(split_text("...!?", 100).is_empty());
}

#[test]
fn test_split_text_respects_limit() {
    let sentence = "The quick brown fox jumps over the lazy dog. ";
    let text = sentence.repeat(10);
    let chunks = split_text(&text, 100);
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 100, "chunk too long: {chunk}");
    }
    let rejoined = chunks.join(" ");
    assert_eq!(rejoined, text.trim());
}

#[test]
fn test_split_text_long_word_is_hard_split() {
    let word = "a".repeat(250);
    let chunks = split_text(&word, 100);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].len(), 100);
    assert_eq!(chunks[2].len(), 50);
}

#[test]
fn test_split_text_multibyte() {
    let text = "测".repeat(150);
    let chunks = split_text(&text, 100);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].chars().count(), 100);
    assert_eq!(chunks[1].chars().count(), 50);
}

#[test]
fn test_rpc_envelope() {
    let envelope: Value = serde_json::from_str(&rpc_envelope("Hello", "en", false)).unwrap();
    let rpc = &envelope[0][0];
    assert_eq!(rpc[0], "jQ1olc");
    assert_eq!(rpc[2], Value::Null);
    assert_eq!(rpc[3], "generic");

    let parameter: Value = serde_json::from_str(rpc[1].as_str().unwrap()).unwrap();
    assert_eq!(parameter, serde_json::json!(["Hello", "en", null, "null"]));

    let slow: Value = serde_json::from_str(&rpc_envelope("Hi", "fr", true)).unwrap();
    let parameter: Value = serde_json::from_str(slow[0][0][1].as_str().unwrap()).unwrap();
    assert_eq!(parameter, serde_json::json!(["Hi", "fr", true, "null"]));
}

#[test]
fn test_google_extract_audio() {
    let client = GoogleTtsClient::new(&SynthesisConfig::default()).unwrap();
    assert_eq!(
        client.endpoint(),
        "https://translate.google.com/_/TranslateWebserverUi/data/batchexecute"
    );

    let body = ")]}'\n\n104\n[[\"wrb.fr\",\"jQ1olc\",\"[\\\"SUQz\\\"]\",null,null,null,\"generic\"]]\n25\n[[\"e\",4,null,null,140]]\n";
    assert_eq!(client.extract_audio(body).unwrap(), b"ID3".to_vec());

    let empty = ")]}'\n\n25\n[[\"e\",4,null,null,140]]\n";
    let err = client.extract_audio(empty).unwrap_err();
    assert_eq!(err.to_string(), "No audio stream in response");
}

#[test]
fn test_google_client_custom_tld() {
    let config = SynthesisConfig {
        tld: Some("co.uk".to_string()),
        ..Default::default()
    };
    let client = GoogleTtsClient::new(&config).unwrap();
    assert!(client.endpoint().starts_with("https://translate.google.co.uk/"));
}

#[tokio::test]
async fn test_google_rejects_before_network() {
    // An unreachable endpoint proves validation happens before any request.
    let client = GoogleTtsClient::new(&SynthesisConfig {
        tld: Some("invalid.localhost".to_string()),
        ..Default::default()
    })
    .unwrap();

    let err = client.synthesize("", "en").await.unwrap_err();
    assert_eq!(err.to_string(), "No text to speak");

    let err = client.synthesize("Hello", "xx").await.unwrap_err();
    assert_eq!(err.to_string(), "Language not supported: xx");
}

#[tokio::test]
async fn test_google_checks_language_before_tokenizing() {
    let client = GoogleTtsClient::new(&SynthesisConfig {
        tld: Some("invalid.localhost".to_string()),
        ..Default::default()
    })
    .unwrap();

    let err = client.synthesize("...", "xx").await.unwrap_err();
    assert_eq!(err.to_string(), "Language not supported: xx");

    let err = client.synthesize(" ... ", "en").await.unwrap_err();
    assert_eq!(err.to_string(), "No text to speak");
}

#[test]
fn test_provider_parsing() {
    assert_eq!("google".parse::<SynthesisType>().unwrap(), SynthesisType::Google);
    assert_eq!("HTTP".parse::<SynthesisType>().unwrap(), SynthesisType::Http);
    assert!("polly".parse::<SynthesisType>().is_err());
}

#[test]
fn test_create_client_requires_url_for_http() {
    let config = SynthesisConfig {
        provider: SynthesisType::Http,
        ..Default::default()
    };
    assert!(create_synthesis_client(&config).is_err());

    let config = SynthesisConfig {
        provider: SynthesisType::Http,
        url: Some("http://127.0.0.1:5050/tts".to_string()),
        ..Default::default()
    };
    assert!(create_synthesis_client(&config).is_ok());
    assert!(create_synthesis_client(&SynthesisConfig::default()).is_ok());
}

async fn spawn_upstream() -> String {
    let app = Router::new().route(
        "/tts",
        post(|Json(body): Json<Value>| async move {
            if body["lang"] == "en" {
                let text = body["text"].as_str().unwrap_or_default().to_string();
                (StatusCode::OK, format!("ID3{}", text).into_bytes())
            } else {
                (StatusCode::BAD_REQUEST, b"unsupported language".to_vec())
            }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}/tts", addr)
}

#[tokio::test]
async fn test_http_client_against_upstream() {
    let url = spawn_upstream().await;
    let client = HttpTtsClient::new(&url, &SynthesisConfig::default()).unwrap();

    let audio = client.synthesize("hello", "en").await.unwrap();
    assert_eq!(audio, b"ID3hello".to_vec());

    let err = client.synthesize("hello", "xx").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("400"), "{message}");
    assert!(message.contains("unsupported language"), "{message}");
}
