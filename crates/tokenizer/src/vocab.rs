use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{Result, VocabError};

const NO_ID: u32 = u32::MAX;

/// Bidirectional character <-> id mapping, frozen once built.
///
/// Ids are dense in `[0, nchars)` and assigned in ascending code point order,
/// so the same corpus always yields the same ids. Lookups in both directions
/// go through flat tables: `id_to_char` is indexed by id, and `char_to_id` is
/// indexed by `code point - base`, covering the span between the smallest and
/// largest character seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<char>", into = "Vec<char>")]
pub struct Vocabulary {
    id_to_char: Vec<char>,
    char_to_id: Vec<u32>,
    base: u32,
}

impl Vocabulary {
    /// Scans `corpus` once and assigns an id to every distinct character.
    pub fn build(corpus: &str) -> Result<Self> {
        let chars: BTreeSet<char> = corpus.chars().collect();
        if chars.is_empty() {
            return Err(VocabError::EmptyCorpus);
        }
        Ok(Self::from_chars(chars.into_iter().collect()))
    }

    fn from_chars(id_to_char: Vec<char>) -> Self {
        let base = id_to_char.iter().map(|&c| c as u32).min().unwrap_or(0);
        let top = id_to_char.iter().map(|&c| c as u32).max().unwrap_or(0);

        let mut char_to_id = vec![NO_ID; (top - base) as usize + 1];
        for (id, &c) in id_to_char.iter().enumerate() {
            char_to_id[(c as u32 - base) as usize] = id as u32;
        }

        Self {
            id_to_char,
            char_to_id,
            base,
        }
    }

    /// Number of distinct characters (`nchars`).
    pub fn len(&self) -> usize {
        self.id_to_char.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_char.is_empty()
    }

    pub fn get_id(&self, c: char) -> Option<u32> {
        let offset = (c as u32).checked_sub(self.base)? as usize;
        match self.char_to_id.get(offset) {
            Some(&id) if id != NO_ID => Some(id),
            _ => None,
        }
    }

    pub fn get_char(&self, id: u32) -> Option<char> {
        self.id_to_char.get(id as usize).copied()
    }

    pub fn encode_char(&self, c: char) -> Result<u32> {
        self.get_id(c)
            .ok_or(VocabError::UnknownCharacter { ch: c, position: 0 })
    }

    /// Maps every character of `text` to its id. The error names the first
    /// offending character and its (character, not byte) position.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        text.chars()
            .enumerate()
            .map(|(position, ch)| {
                self.get_id(ch)
                    .ok_or(VocabError::UnknownCharacter { ch, position })
            })
            .collect()
    }

    pub fn decode(&self, id: u32) -> Result<char> {
        self.get_char(id).ok_or(VocabError::InvalidId {
            id,
            nchars: self.len(),
        })
    }

    pub fn decode_sequence(&self, ids: &[u32]) -> Result<String> {
        ids.iter().map(|&id| self.decode(id)).collect()
    }

    pub fn chars(&self) -> &[char] {
        &self.id_to_char
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl TryFrom<Vec<char>> for Vocabulary {
    type Error = VocabError;

    /// Rebuilds a saved vocabulary. The id of each character is its index,
    /// which need not be sorted.
    fn try_from(id_to_char: Vec<char>) -> Result<Self> {
        if id_to_char.is_empty() {
            return Err(VocabError::EmptyCorpus);
        }
        let mut seen = BTreeSet::new();
        for &ch in &id_to_char {
            if !seen.insert(ch) {
                return Err(VocabError::DuplicateCharacter { ch });
            }
        }
        Ok(Self::from_chars(id_to_char))
    }
}

impl From<Vocabulary> for Vec<char> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.id_to_char
    }
}
