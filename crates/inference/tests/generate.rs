use charnn_core::{CharModel, ModelConfig};
use inference::sampling::{argmax, logits_to_vec};
use inference::{GenerateError, GenerationConfig, Generator};
use tch::Device;
use tokenizer::{VocabError, Vocabulary};

fn model_for(vocab: &Vocabulary) -> CharModel {
    let config = ModelConfig {
        vocab_size: vocab.len() as i64,
        embed_dim: Some(4),
        hidden_dim: 8,
        n_layers: 2,
    };
    CharModel::new(&config, Device::Cpu).unwrap()
}

#[test]
fn output_is_prime_plus_length() {
    let vocab = Vocabulary::build("abab").unwrap();
    let model = model_for(&vocab);
    let mut generator = Generator::new(&model, &vocab, 42);

    let text = generator.generate("a", 5, 1.0).unwrap();
    assert_eq!(text.chars().count(), 6);
    assert!(text.starts_with('a'));
    assert!(text.chars().all(|c| c == 'a' || c == 'b'));

    let text = generator.generate("abba", 10, 0.5).unwrap();
    assert_eq!(text.chars().count(), 14);
    assert!(text.starts_with("abba"));

    assert_eq!(generator.generate("b", 0, 1.0).unwrap(), "b");
}

#[test]
fn same_seed_same_text() {
    let vocab = Vocabulary::build("hello world").unwrap();
    let model = model_for(&vocab);
    let a = Generator::new(&model, &vocab, 5).generate("he", 40, 1.0).unwrap();
    let b = Generator::new(&model, &vocab, 5).generate("he", 40, 1.0).unwrap();
    assert_eq!(a, b);
}

#[test]
fn near_zero_temperature_is_greedy() {
    let vocab = Vocabulary::build("hello world").unwrap();
    let model = model_for(&vocab);

    let mut expected = String::from("wo");
    let _guard = tch::no_grad_guard();
    let mut hidden = model.init_hidden();
    let (_, next) = model.step(vocab.get_id('w').unwrap() as i64, &hidden).unwrap();
    hidden = next;
    let mut current = vocab.get_id('o').unwrap() as i64;
    for _ in 0..12 {
        let (logits, next) = model.step(current, &hidden).unwrap();
        hidden = next;
        current = argmax(&logits_to_vec(&logits).unwrap()) as i64;
        expected.push(vocab.decode(current as u32).unwrap());
    }

    for seed in [1, 2, 3] {
        let text = Generator::new(&model, &vocab, seed)
            .generate("wo", 12, 1e-8)
            .unwrap();
        assert_eq!(text, expected);
    }
}

#[test]
fn empty_prime_is_rejected() {
    let vocab = Vocabulary::build("abab").unwrap();
    let model = model_for(&vocab);
    let mut generator = Generator::new(&model, &vocab, 0);
    assert!(matches!(
        generator.generate("", 5, 1.0),
        Err(GenerateError::EmptyPrime)
    ));
}

#[test]
fn out_of_vocabulary_prime_is_rejected() {
    let vocab = Vocabulary::build("abab").unwrap();
    let model = model_for(&vocab);
    let mut generator = Generator::new(&model, &vocab, 0);
    match generator.generate("z", 5, 1.0) {
        Err(GenerateError::Vocab(VocabError::UnknownCharacter { ch, position })) => {
            assert_eq!(ch, 'z');
            assert_eq!(position, 0);
        }
        other => panic!("expected UnknownCharacter, got {:?}", other),
    }
}

#[test]
fn non_positive_temperature_is_rejected() {
    let vocab = Vocabulary::build("abab").unwrap();
    let model = model_for(&vocab);
    let mut generator = Generator::new(&model, &vocab, 0);
    for t in [0.0, -0.5] {
        assert!(matches!(
            generator.generate("a", 5, t),
            Err(GenerateError::InvalidTemperature(_))
        ));
    }
}

#[test]
fn generate_with_uses_config() {
    let vocab = Vocabulary::build("abc ").unwrap();
    let model = model_for(&vocab);
    let config = GenerationConfig {
        prime_string: "cab".to_string(),
        generation_length: 7,
        temperature: 0.8,
        seed: 9,
    };
    let text = Generator::new(&model, &vocab, config.seed)
        .generate_with(&config)
        .unwrap();
    assert_eq!(text.chars().count(), 10);
    assert!(text.starts_with("cab"));
}
