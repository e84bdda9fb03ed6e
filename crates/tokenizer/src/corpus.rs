use crate::error::Result;
use crate::vocab::Vocabulary;

/// The corpus as two aligned id arrays: `x` holds the characters and `y`
/// holds, at each position, the character that follows it. The last target
/// wraps around to the first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCorpus {
    x: Vec<u32>,
    y: Vec<u32>,
}

impl EncodedCorpus {
    pub fn new(vocab: &Vocabulary, text: &str) -> Result<Self> {
        Ok(Self::from_ids(vocab.encode(text)?))
    }

    pub fn from_ids(x: Vec<u32>) -> Self {
        let mut y = x.clone();
        if !y.is_empty() {
            y.rotate_left(1);
        }
        Self { x, y }
    }

    pub fn x(&self) -> &[u32] {
        &self.x
    }

    pub fn y(&self) -> &[u32] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abab_targets_are_shifted() {
        let vocab = Vocabulary::build("abab").unwrap();
        let corpus = EncodedCorpus::new(&vocab, "abab").unwrap();
        assert_eq!(corpus.x(), &[0, 1, 0, 1]);
        assert_eq!(corpus.y(), &[1, 0, 1, 0]);
    }

    #[test]
    fn targets_wrap_around() {
        let text = "the cat sat on the mat";
        let vocab = Vocabulary::build(text).unwrap();
        let corpus = EncodedCorpus::new(&vocab, text).unwrap();
        let n = corpus.len();
        assert_eq!(n, text.chars().count());
        assert_eq!(corpus.y().len(), n);
        for i in 0..n {
            assert_eq!(corpus.y()[i], corpus.x()[(i + 1) % n]);
        }
    }

    #[test]
    fn single_character_targets_itself() {
        let corpus = EncodedCorpus::from_ids(vec![3]);
        assert_eq!(corpus.y(), &[3]);
        assert!(EncodedCorpus::from_ids(Vec::new()).is_empty());
    }
}
