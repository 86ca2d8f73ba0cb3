/// Single-line text input with a byte cursor (ASCII only).
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    cursor: usize,
    max_len: Option<usize>,
    digits_only: bool,
}

impl TextInput {
    /// Input accepting at most `len` ASCII digits.
    pub fn digits(len: usize) -> Self {
        Self {
            max_len: Some(len),
            digits_only: true,
            ..Self::default()
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.value.len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.len();
    }

    pub fn insert(&mut self, ch: char) {
        if self.max_len.is_some_and(|max| self.value.len() >= max) {
            return;
        }
        if self.digits_only && !ch.is_ascii_digit() {
            return;
        }
        if ch.is_ascii() && !ch.is_ascii_control() {
            self.value.insert(self.cursor, ch);
            self.cursor += 1;
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 && self.cursor <= self.value.len() {
            self.cursor -= 1;
            self.value.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_input_ignores_letters_and_overflow() {
        let mut input = TextInput::digits(6);
        for ch in "12a34567".chars() {
            input.insert(ch);
        }
        assert_eq!(input.value(), "123456");
        assert_eq!(input.cursor(), 6);
    }

    #[test]
    fn edits_at_cursor() {
        let mut input = TextInput::default();
        for ch in "frmer".chars() {
            input.insert(ch);
        }
        input.move_home();
        input.move_cursor(1);
        input.insert('a');
        assert_eq!(input.value(), "farmer");

        input.move_end();
        input.backspace();
        input.move_home();
        input.delete();
        assert_eq!(input.value(), "arme");

        input.move_cursor(-5);
        assert_eq!(input.cursor(), 0);
        input.clear();
        assert_eq!(input.value(), "");
    }
}
