/// End-to-end tests for one discovery pass
use async_trait::async_trait;
use discovery_service::lexicon::patterns::contains_hangul;
use discovery_service::lexicon::LexiconDocument;
use discovery_service::config::MeaningConfig;
use discovery_service::services::adjudicator::{LlmAdjudicator, LlmProvider};
use discovery_service::services::dictionary::{
    DictionaryCache, DictionaryOracle, DictionaryResponse, DictionaryTransport,
};
use discovery_service::services::meaning::{
    LlmMeaningExtractor, ManualMeanings, MeaningCache, MeaningExtractor, MeaningResolver,
};
use discovery_service::services::moderation::ProfanityFilter;
use discovery_service::services::tokenizer::{
    HangulNounExtractor, NgramBuilder, NounExtractor, BIGRAM_MAX_LEN, BIGRAM_MIN_LEN,
};
use discovery_service::{
    AdjudicationState, Config, DiscoveryError, DiscoveryPipeline, Lexicon, MeaningSource, Result,
    RunReport, SourceIndex,
};
use resilience::{RecordingSleeper, RetryConfig};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const NOT_FOUND: &str = r#"{"searchResultMap":{"searchResultListMap":{"WORD":{"items":[]}}}}"#;
const FOUND: &str = r#"{"searchResultMap":{"searchResultListMap":{"WORD":{"items":[{}]}}}}"#;

// ==================== Fixtures ====================

/// Every whitespace token with a Hangul syllable is a noun
struct HangulTokenExtractor;

impl NounExtractor for HangulTokenExtractor {
    fn extract_nouns(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .filter(|t| contains_hangul(t))
            .map(str::to_string)
            .collect()
    }
}

/// Answers from a fixed set of standard words
struct FixedDictionary {
    standard: HashSet<String>,
}

#[async_trait]
impl DictionaryTransport for FixedDictionary {
    async fn fetch(&self, word: &str) -> Result<DictionaryResponse> {
        let body = if self.standard.contains(word) {
            FOUND
        } else {
            NOT_FOUND
        };
        Ok(DictionaryResponse::new(200, body))
    }
}

struct ScriptedProvider {
    reply: std::result::Result<&'static str, &'static str>,
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        match self.reply {
            Ok(text) => Ok(text.to_string()),
            Err(reason) => Err(DiscoveryError::Transport(reason.to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// `word` repeated `count` times, each in its own distinct text
fn texts(entries: &[(&str, usize)]) -> Vec<String> {
    entries
        .iter()
        .flat_map(|(word, count)| (0..*count).map(move |i| format!("{} {}", word, i)))
        .collect()
}

fn single_source(entries: &[(&str, usize)]) -> SourceIndex {
    let mut index = SourceIndex::new();
    index.insert("RSS", texts(entries));
    index
}

fn config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.paths.history = dir.path().join("counts_prev.json");
    config
}

fn pipeline(config: Config, lexicon: Lexicon, standard: &[&str]) -> DiscoveryPipeline {
    let transport = Arc::new(FixedDictionary {
        standard: standard.iter().map(|w| w.to_string()).collect(),
    });
    let oracle = Arc::new(DictionaryOracle::new(
        &config.dictionary,
        transport,
        DictionaryCache::in_memory(),
    ));
    DiscoveryPipeline::new(config, Arc::new(lexicon), oracle)
        .with_extractor(Arc::new(HangulTokenExtractor))
}

fn empty_lexicon() -> Lexicon {
    Lexicon::from_document(LexiconDocument::default()).unwrap()
}

fn llm(reply: std::result::Result<&'static str, &'static str>) -> Arc<LlmAdjudicator> {
    Arc::new(
        LlmAdjudicator::new(Arc::new(ScriptedProvider { reply }), 120)
            .with_sleeper(Arc::new(RecordingSleeper::new()))
            .with_retry_config(RetryConfig {
                max_attempts: 1,
                base_backoff: Duration::ZERO,
                max_backoff: Duration::ZERO,
                jitter: Duration::ZERO,
            }),
    )
}

fn final_words(report: &RunReport) -> Vec<String> {
    report.words().into_iter().map(str::to_string).collect()
}

/// Three open syllables starting at the `n`-th; distinct `n` never contain each other
fn coined_word(n: u32) -> String {
    (0..3)
        .filter_map(|i| char::from_u32(0xAC00 + 28 * (3 * n + i)))
        .collect()
}

// ==================== Scenario Tests ====================

#[tokio::test]
async fn test_higher_frequency_ranks_first_with_equal_boosts() {
    let dir = TempDir::new().unwrap();
    let index = single_source(&[("갑분싸", 6), ("존맛탱", 4)]);

    let report = pipeline(config(&dir), empty_lexicon(), &[])
        .run(&index)
        .await
        .unwrap();

    assert_eq!(final_words(&report), vec!["갑분싸", "존맛탱"]);
    assert_eq!(report.final_list[0].frequency, 6);
    assert_eq!(report.final_list[1].frequency, 4);
    assert_eq!(report.adjudication, AdjudicationState::Passthrough);

    let top = &report.candidates[0];
    assert_eq!(top.word, "갑분싸");
    assert!(!top.is_standard);
    assert_eq!(top.examples.len(), 3);
    assert!(top.examples.iter().all(|e| e.contains("갑분싸")));
    assert!(top.score > report.candidates[1].score);
}

#[tokio::test]
async fn test_run_saves_snapshot_for_novelty() {
    let dir = TempDir::new().unwrap();
    let index = single_source(&[("갑분싸", 6), ("존맛탱", 4)]);
    let pipeline = pipeline(config(&dir), empty_lexicon(), &[]);

    let first = pipeline.run(&index).await.unwrap();
    assert!(dir.path().join("counts_prev.json").exists());

    // same counts again: no growth, the new-word boost is gone
    let second = pipeline.run(&index).await.unwrap();
    let ratio = second.candidates[0].score / first.candidates[0].score;
    assert!((ratio - 1.0 / 1.35).abs() < 1e-9);
}

#[tokio::test]
async fn test_empty_corpus_is_distinct_from_empty_result() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(config(&dir), empty_lexicon(), &[]);

    let mut empty = SourceIndex::new();
    empty.insert("RSS", Vec::new());
    let result = pipeline.run(&empty).await;
    assert!(matches!(result, Err(DiscoveryError::NoTextCollected)));

    // text present, but nothing reaches the minimum count
    let sparse = single_source(&[("갑분싸", 1), ("존맛탱", 2)]);
    let report = pipeline.run(&sparse).await.unwrap();
    assert!(report.final_list.is_empty());
    assert_eq!(report.stage_counts.texts, 3);
}

#[tokio::test]
async fn test_containment_keeps_shorter_form() {
    let dir = TempDir::new().unwrap();
    let index = single_source(&[("갓생", 10), ("갓생살기", 3)]);

    let report = pipeline(config(&dir), empty_lexicon(), &[])
        .run(&index)
        .await
        .unwrap();

    assert_eq!(final_words(&report), vec!["갓생"]);
    assert_eq!(report.stage_counts.after_containment, 1);
}

#[tokio::test]
async fn test_selection_floor_with_few_strict_survivors() {
    let dir = TempDir::new().unwrap();
    let index = single_source(&[
        ("갑분싸", 9),
        ("존맛탱", 8),
        ("갓생", 7),
        ("킹받네", 6),
        ("점메추", 5),
        ("사과", 12),
        ("회의", 10),
    ]);

    let report = pipeline(config(&dir), empty_lexicon(), &["사과", "회의"])
        .run(&index)
        .await
        .unwrap();

    let words = final_words(&report);
    let distinct: HashSet<&String> = words.iter().collect();
    assert_eq!(distinct.len(), words.len());
    assert!(words.len() >= 5 && words.len() <= 40);
    assert!(!words.contains(&"사과".to_string()));
    assert!(!words.contains(&"회의".to_string()));
}

#[tokio::test]
async fn test_tail_backfills_when_head_is_mostly_standard() {
    let dir = TempDir::new().unwrap();
    let head: Vec<String> = (0..5).map(coined_word).collect();
    let standard: Vec<String> = (5..30).map(coined_word).collect();
    let tail: Vec<String> = (30..42).map(coined_word).collect();

    // head slang outranks every standard word, standard words outrank the tail
    let mut entries: Vec<(&str, usize)> = Vec::new();
    entries.extend(head.iter().enumerate().map(|(i, w)| (w.as_str(), 24 - i)));
    entries.extend(standard.iter().enumerate().map(|(i, w)| (w.as_str(), 30 + i)));
    entries.extend(tail.iter().enumerate().map(|(i, w)| (w.as_str(), 3 + i % 7)));
    let index = single_source(&entries);

    let standard_refs: Vec<&str> = standard.iter().map(String::as_str).collect();
    let report = pipeline(config(&dir), empty_lexicon(), &standard_refs)
        .run(&index)
        .await
        .unwrap();

    assert_eq!(report.candidates.len(), 42);
    let words = final_words(&report);
    assert!(words.len() <= 40);
    assert_eq!(words.len(), head.len() + tail.len());
    let distinct: HashSet<&String> = words.iter().collect();
    assert_eq!(distinct.len(), words.len());

    assert_eq!(words[..5], head[..]);
    let backfilled: HashSet<&String> = words[5..].iter().collect();
    assert_eq!(backfilled, tail.iter().collect::<HashSet<_>>());
    assert!(words.iter().all(|w| !standard.contains(w)));
    assert_eq!(report.stage_counts.selected, words.len());
}

#[tokio::test]
async fn test_scoring_is_deterministic() {
    let index = single_source(&[("갑분싸", 6), ("존맛탱", 6), ("갓생", 4)]);

    let mut runs = Vec::new();
    for _ in 0..3 {
        let dir = TempDir::new().unwrap();
        let report = pipeline(config(&dir), empty_lexicon(), &[])
            .run(&index)
            .await
            .unwrap();
        let scored: Vec<(String, f64)> = report
            .candidates
            .iter()
            .map(|c| (c.word.clone(), c.score))
            .collect();
        runs.push(scored);
    }

    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[1], runs[2]);
    // equal score and frequency fall back to lexical order
    assert_eq!(runs[0][0].0, "갑분싸");
    assert_eq!(runs[0][1].0, "존맛탱");
}

#[tokio::test]
async fn test_block_and_profanity_rules() {
    let dir = TempDir::new().unwrap();
    let document = LexiconDocument {
        profanity: vec!["시발".to_string()],
        allow: vec!["시발점".to_string()],
        block: vec!["존맛탱".to_string()],
        ..Default::default()
    };
    let lexicon = Lexicon::from_document(document).unwrap();
    let index = single_source(&[("갑분싸", 5), ("존맛탱", 5), ("개시발", 5), ("시발점", 5)]);

    let report = pipeline(config(&dir), lexicon, &[])
        .run(&index)
        .await
        .unwrap();

    let mut words = final_words(&report);
    words.sort();
    assert_eq!(words, vec!["갑분싸", "시발점"]);
}

#[tokio::test]
async fn test_multi_source_corroboration_lifts_rank() {
    let dir = TempDir::new().unwrap();
    let mut index = SourceIndex::new();
    index.insert("RSS", texts(&[("갑분싸", 4), ("존맛탱", 2)]));
    index.insert(
        "뽐뿌-유머",
        vec!["존맛탱 !".to_string(), "존맛탱 ?".to_string()],
    );

    let report = pipeline(config(&dir), empty_lexicon(), &[])
        .run(&index)
        .await
        .unwrap();

    // both at frequency 4, 존맛탱 shows up in two sources
    assert_eq!(final_words(&report), vec!["존맛탱", "갑분싸"]);
}

#[tokio::test]
async fn test_profanity_word_file_drops_matching_candidates() {
    let dir = TempDir::new().unwrap();
    let word_file = dir.path().join("profanity.txt");
    fs::write(&word_file, "# extra terms\n\n갓생\n").unwrap();
    let filter = ProfanityFilter::from_file(&word_file, HashSet::new()).unwrap();
    let index = single_source(&[("갑분싸", 6), ("존맛탱", 4), ("갓생", 3)]);

    let report = pipeline(config(&dir), empty_lexicon(), &[])
        .with_profanity(filter)
        .run(&index)
        .await
        .unwrap();

    assert_eq!(final_words(&report), vec!["갑분싸", "존맛탱"]);
    assert_eq!(report.stage_counts.after_profanity, 2);
}

// ==================== Meaning Tests ====================

fn meanings(
    dir: &TempDir,
    reply: std::result::Result<&'static str, &'static str>,
) -> MeaningResolver {
    let manual = ManualMeanings::from_json(
        r#"{"갑분싸": {"meaning": "갑자기 분위기 싸해짐", "examples": ["회의 중 갑분싸"]}}"#,
    )
    .unwrap();
    let extractor: Arc<dyn MeaningExtractor> = Arc::new(
        LlmMeaningExtractor::new(
            Arc::new(ScriptedProvider { reply }),
            &MeaningConfig::default(),
        )
        .with_sleeper(Arc::new(RecordingSleeper::new())),
    );
    MeaningResolver::new(
        manual,
        MeaningCache::open(dir.path().join("meaning_cache.json")),
        Some(extractor),
    )
}

#[tokio::test]
async fn test_meanings_attach_by_priority_and_survive_failures() {
    let dir = TempDir::new().unwrap();
    let index = single_source(&[("갑분싸", 6), ("존맛탱", 4), ("갓생", 3)]);
    let generated = r#"{"results": [{"word": "존맛탱", "meaning": "정말 맛있음"}, {"word": "갑분싸", "meaning": "무시됨"}]}"#;

    let report = pipeline(config(&dir), empty_lexicon(), &[])
        .with_meanings(meanings(&dir, Ok(generated)))
        .run(&index)
        .await
        .unwrap();

    assert_eq!(final_words(&report), vec!["갑분싸", "존맛탱", "갓생"]);
    let manual = report.final_list[0].meaning.as_ref().unwrap();
    assert_eq!(manual.text, "갑자기 분위기 싸해짐");
    assert_eq!(manual.source, MeaningSource::Manual);
    let generated = report.final_list[1].meaning.as_ref().unwrap();
    assert_eq!(generated.text, "정말 맛있음");
    assert_eq!(generated.source, MeaningSource::Generated);
    assert!(report.final_list[2].meaning.is_none());
    assert_eq!(report.stage_counts.with_meaning, 2);

    // manual examples replace corpus examples on the candidate
    assert_eq!(report.candidates[0].examples, vec!["회의 중 갑분싸"]);
    assert_eq!(
        report.candidates[0].meaning.as_ref().map(|m| m.source),
        Some(MeaningSource::Manual)
    );

    // a failing provider keeps the run alive and the cache answers
    let report = pipeline(config(&dir), empty_lexicon(), &[])
        .with_meanings(meanings(&dir, Err("connection reset")))
        .run(&index)
        .await
        .unwrap();

    assert_eq!(
        report.final_list[1].meaning.as_ref().map(|m| m.source),
        Some(MeaningSource::Cached)
    );
    assert!(report.final_list[2].meaning.is_none());
    assert_eq!(report.stage_counts.with_meaning, 2);
}

// ==================== Adjudication Tests ====================

async fn pre_adjudication_list(index: &SourceIndex) -> Vec<String> {
    let dir = TempDir::new().unwrap();
    let report = pipeline(config(&dir), empty_lexicon(), &[])
        .run(index)
        .await
        .unwrap();
    final_words(&report)
}

#[tokio::test]
async fn test_adjudicator_failures_return_pre_adjudication_list() {
    let index = single_source(&[("갑분싸", 6), ("존맛탱", 4), ("갓생", 3)]);
    let expected = pre_adjudication_list(&index).await;

    for (reply, state) in [
        (Err("connection reset"), AdjudicationState::TransportFailed),
        (Ok("잘 모르겠습니다"), AdjudicationState::ParseFailed),
        (Ok(r#"{"words": ["갑분싸"]}"#), AdjudicationState::ParseFailed),
    ] {
        let dir = TempDir::new().unwrap();
        let report = pipeline(config(&dir), empty_lexicon(), &[])
            .with_adjudicator(llm(reply))
            .run(&index)
            .await
            .unwrap();

        assert_eq!(report.adjudication, state);
        assert_eq!(final_words(&report), expected);
    }
}

#[tokio::test]
async fn test_adjudicated_list_is_backfilled_to_min_keep() {
    let index = single_source(&[("갑분싸", 6), ("존맛탱", 4), ("갓생", 3)]);

    let dir = TempDir::new().unwrap();
    let mut floor_two = config(&dir);
    floor_two.selection.min_keep = 2;
    let report = pipeline(floor_two, empty_lexicon(), &[])
        .with_adjudicator(llm(Ok(r#"["갓생"]"#)))
        .run(&index)
        .await
        .unwrap();
    assert_eq!(report.adjudication, AdjudicationState::ParsedOk);
    assert_eq!(final_words(&report), vec!["갓생", "갑분싸"]);

    let dir = TempDir::new().unwrap();
    let mut floor_one = config(&dir);
    floor_one.selection.min_keep = 1;
    let report = pipeline(floor_one, empty_lexicon(), &[])
        .with_adjudicator(llm(Ok(r#"["갓생", "존맛탱"]"#)))
        .run(&index)
        .await
        .unwrap();
    assert_eq!(final_words(&report), vec!["갓생", "존맛탱"]);
}

// ==================== Tokenizer Tests ====================

#[test]
fn test_bigram_length_invariant_on_real_extractor() {
    let lexicon = Arc::new(Lexicon::builtin().unwrap());
    let extractor = HangulNounExtractor::new(lexicon);
    let corpus: Vec<String> = vec![
        "갓생 루틴 공유합니다".into(),
        "오늘 점메추 부탁".into(),
        "가나다라마바사아자차카 타파하가나다라마바사".into(),
        "MZ세대 퇴사각 재다".into(),
    ];

    let stats = NgramBuilder::new(&extractor).build(&corpus);
    for (bigram, _) in stats.bigrams.iter() {
        let len = bigram.chars().count();
        assert!(
            (BIGRAM_MIN_LEN..=BIGRAM_MAX_LEN).contains(&len),
            "bigram {} has length {}",
            bigram,
            len
        );
    }
    let frequencies: HashMap<&str, u64> = stats.combined.iter().collect();
    assert!(frequencies.keys().all(|k| !k.is_empty()));
}
