use serde::Serialize;

use crate::{
    Result,
    card::{Card, Value, validate_key},
};

/// The ordered user keywords of a record. Structural keywords (`SIMPLE`, `BITPIX`, `NAXIS`, ...)
/// are owned by the codec and never appear here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|card| card.key.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn card(&self, key: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.card(key).map(|card| &card.value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Sets the value of `key`. An existing card keeps its position and comment, otherwise a new
    /// card is appended.
    ///
    /// # Returns
    /// An error if `key` is not a valid keyword.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        validate_key(key)?;

        match self.position(key) {
            Some(i) => self.cards[i].value = value.into(),
            None => self.cards.push(Card::new(key, value)),
        }

        Ok(())
    }

    /// Same as `set`, also replacing the card's comment.
    pub fn set_with_comment(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        comment: impl Into<String>,
    ) -> Result<()> {
        self.set(key, value)?;

        if let Some(i) = self.position(key) {
            self.cards[i].comment = Some(comment.into());
        }

        Ok(())
    }

    /// Appends a card as is, mainly used by the decoder.
    pub(crate) fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn remove(&mut self, key: &str) -> Option<Card> {
        self.position(key).map(|i| self.cards.remove(i))
    }

    /// Removes every card whose keyword starts with `prefix`.
    ///
    /// # Returns
    /// The amount of removed cards.
    pub fn remove_prefix(&mut self, prefix: &str) -> usize {
        let before = self.cards.len();
        self.cards.retain(|card| !card.key.starts_with(prefix));
        before - self.cards.len()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.cards.iter().position(|card| card.key == key)
    }
}

impl<'a> IntoIterator for &'a Header {
    type Item = &'a Card;
    type IntoIter = std::slice::Iter<'a, Card>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}
